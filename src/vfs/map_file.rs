use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::core::{File, Result};
use crate::{EntryType, Error, ErrorKind, Metadata, OpenFlags};

use super::map_fs::Record;

/// An open file of a [`MapFS`](crate::MapFS).
///
/// Reads are served from a private copy of the content taken at open time. Every write,
/// `write_at` and `truncate` goes to the shared entry and then refreshes the private copy,
/// keeping the cursor where it was. Changes made through *other* handles become visible
/// here only after this handle's next mutation.
#[derive(Debug)]
pub struct MapFile {
    name: PathBuf,
    flags: OpenFlags,
    entry_type: EntryType,
    perm: u32,
    reader: Cursor<Vec<u8>>,
    record: Record,
    closed: bool,
}

impl MapFile {
    pub(crate) fn new<P: AsRef<Path>>(name: P, flags: OpenFlags, record: Record) -> Self {
        let (entry_type, perm, content) = {
            let entry = record.read();
            (entry.entry_type(), entry.perm(), entry.content().to_vec())
        };
        let mut file = Self {
            name: name.as_ref().to_path_buf(),
            flags,
            entry_type,
            perm,
            reader: Cursor::new(content),
            record,
            closed: false,
        };
        if flags.is_truncate() && !file.is_dir() {
            file.record.write().clear();
            file.resync();
        }
        if flags.is_append() {
            let end = file.reader.get_ref().len() as u64;
            file.reader.set_position(end);
        }
        file
    }

    /// Permission bits of the entry when it was opened.
    pub fn perm(&self) -> u32 {
        self.perm
    }

    /// Reads from the cursor, advancing it. Returns `Ok(0)` at the end of the file.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_readable("read")?;
        self.reader
            .read(buf)
            .map_err(|e| Error::from_io("read", &self.name, e))
    }

    /// Moves the cursor. Positions past the end are allowed; negative ones are not.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.ensure_open("seek")?;
        if self.is_dir() {
            return Err(self.error("seek", ErrorKind::IsADirectory));
        }
        self.reader
            .seek(pos)
            .map_err(|e| Error::from_io("seek", &self.name, e))
    }

    /// Writes at the cursor, zero-filling any gap past the end, and advances the cursor.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_writable("write")?;
        let pos = self.reader.position();
        let offset = usize::try_from(pos)
            .map_err(|_| self.error("write", ErrorKind::InvalidArgument))?;
        let written = self.record.write().write_at(buf, offset);
        let n = written.map_err(|kind| self.error("write", kind))?;
        self.resync();
        self.reader.set_position(pos + n as u64);
        trace!(path = %self.name.display(), offset, len = n, "write");
        Ok(n)
    }

    fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    fn error(&self, op: &'static str, kind: ErrorKind) -> Error {
        Error::path(op, &self.name, kind)
    }

    fn ensure_open(&self, op: &'static str) -> Result<()> {
        if self.closed {
            return Err(self.error(op, ErrorKind::Closed));
        }
        Ok(())
    }

    fn ensure_readable(&self, op: &'static str) -> Result<()> {
        self.ensure_open(op)?;
        if self.is_dir() {
            return Err(self.error(op, ErrorKind::IsADirectory));
        }
        if !self.flags.is_readable() {
            return Err(self.error(op, ErrorKind::BadFileAccess));
        }
        Ok(())
    }

    fn ensure_writable(&self, op: &'static str) -> Result<()> {
        self.ensure_open(op)?;
        if self.is_dir() || !self.flags.is_writable() {
            return Err(self.error(op, ErrorKind::BadFileAccess));
        }
        Ok(())
    }

    /// Refreshes the private copy from the shared entry, keeping the cursor position.
    fn resync(&mut self) {
        let pos = self.reader.position();
        self.reader = Cursor::new(self.record.read().content().to_vec());
        self.reader.set_position(pos);
    }
}

impl File for MapFile {
    fn name(&self) -> &Path {
        &self.name
    }

    fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        self.ensure_readable("read")?;
        let data = self.reader.get_ref();
        let start = usize::try_from(offset)
            .ok()
            .filter(|&start| start <= data.len())
            .ok_or_else(|| self.error("read", ErrorKind::InvalidArgument))?;
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize> {
        self.ensure_open("writeat")?;
        if self.flags.is_append() {
            return Err(self.error("writeat", ErrorKind::InvalidArgument));
        }
        self.ensure_writable("write")?;
        let offset =
            usize::try_from(offset).map_err(|_| self.error("writeat", ErrorKind::InvalidArgument))?;
        let written = self.record.write().write_at(buf, offset);
        let n = written.map_err(|kind| self.error("writeat", kind))?;
        self.resync();
        trace!(path = %self.name.display(), offset, len = n, "write_at");
        Ok(n)
    }

    /// Negative sizes are ignored.
    fn truncate(&mut self, size: i64) -> Result<()> {
        self.ensure_open("truncate")?;
        if self.is_dir() || !self.flags.is_writable() {
            return Err(self.error("truncate", ErrorKind::InvalidArgument));
        }
        let Ok(size) = usize::try_from(size) else {
            return Ok(());
        };
        let resized = self.record.write().resize(size);
        resized.map_err(|kind| self.error("truncate", kind))?;
        self.resync();
        trace!(path = %self.name.display(), size, "truncate");
        Ok(())
    }

    fn stat(&self) -> Result<Metadata> {
        self.ensure_open("stat")?;
        Ok(self.record.read().metadata())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open("close")?;
        self.closed = true;
        trace!(path = %self.name.display(), "close");
        Ok(())
    }
}

impl Read for MapFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        MapFile::read(self, buf).map_err(Into::into)
    }
}

impl Write for MapFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        MapFile::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ensure_open("flush").map_err(Into::into)
    }
}

impl Seek for MapFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        MapFile::seek(self, pos).map_err(Into::into)
    }
}
