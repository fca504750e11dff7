use std::time::SystemTime;

use crate::ErrorKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// One record of the in-memory path table: type, permission bits, modification time and,
/// for files, the content.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    entry_type: EntryType,
    perm: u32,
    modified: SystemTime,
    content: Vec<u8>,
}

impl Entry {
    pub fn new(entry_type: EntryType, perm: u32) -> Entry {
        Entry {
            entry_type,
            perm,
            modified: SystemTime::now(),
            content: Vec::new(),
        }
    }

    /// A file entry holding `content`.
    pub fn file(content: &[u8], perm: u32) -> Entry {
        let mut entry = Entry::new(EntryType::File, perm);
        entry.content = content.to_vec();
        entry
    }

    pub fn dir(perm: u32) -> Entry {
        Entry::new(EntryType::Directory, perm)
    }

    pub(crate) fn with_modified(mut self, modified: SystemTime) -> Entry {
        self.modified = modified;
        self
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn perm(&self) -> u32 {
        self.perm
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Writes `buf` at `offset`, zero-filling any gap past the current end.
    ///
    /// Fails with `InvalidArgument` when the new end can not be addressed or allocated;
    /// the content is left untouched then.
    pub(crate) fn write_at(&mut self, buf: &[u8], offset: usize) -> Result<usize, ErrorKind> {
        let end = offset
            .checked_add(buf.len())
            .ok_or(ErrorKind::InvalidArgument)?;
        self.resize_at_least(end)?;
        self.content[offset..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    /// Grows with zero bytes or cuts the content to `size`.
    pub(crate) fn resize(&mut self, size: usize) -> Result<(), ErrorKind> {
        if size <= self.content.len() {
            self.content.truncate(size);
            return Ok(());
        }
        self.resize_at_least(size)
    }

    pub(crate) fn clear(&mut self) {
        self.content.clear();
    }

    fn resize_at_least(&mut self, size: usize) -> Result<(), ErrorKind> {
        let len = self.content.len();
        if size > len {
            self.content
                .try_reserve_exact(size - len)
                .map_err(|_| ErrorKind::InvalidArgument)?;
            self.content.resize(size, 0);
        }
        Ok(())
    }

    pub fn metadata(&self) -> Metadata {
        Metadata {
            entry_type: self.entry_type,
            len: self.content.len() as u64,
            perm: self.perm,
            modified: self.modified,
        }
    }
}

/// Information about a file or directory, as returned by `stat`.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    entry_type: EntryType,
    len: u64,
    perm: u32,
    modified: SystemTime,
}

impl Metadata {
    pub(crate) fn new(entry_type: EntryType, len: u64, perm: u32, modified: SystemTime) -> Self {
        Self {
            entry_type,
            len,
            perm,
            modified,
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Size in bytes; for directories the host value (in-memory directories report 0).
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Permission bits (`0o777` mask plus setuid/setgid/sticky).
    pub fn perm(&self) -> u32 {
        self.perm
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }
}
