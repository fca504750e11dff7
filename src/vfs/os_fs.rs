//! This module provides a writable file system that forwards to the host operating system.
//!
//! ### Key Features:
//! - **Isolated root**: every path is resolved below a designated host directory (`root`).
//! - **Path normalization**: `.` and `..` are resolved lexically and can not climb above root.
//! - **Host semantics**: apart from the checks listed on each method, behavior and errors
//!   are those of the host.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::{debug, trace};

use crate::core::{File, FileSystem, Result, utils};
use crate::{EntryType, Error, ErrorKind, Metadata, OpenFlags};

/// A writable file system (VFS) implementation that maps to a directory on the host system.
///
/// With the default root `/` inner paths are host paths, so `OsFS` is a plain passthrough.
///
/// ### Example:
/// ```no_run
/// use wfs_kit::{FileSystem, OsFS};
///
/// let root = std::env::temp_dir().join("my_wfs");
/// std::fs::create_dir_all(&root).unwrap();
///
/// let fs = OsFS::with_root(&root).unwrap();
/// fs.mkdir("/docs", 0o755).unwrap();
/// wfs_kit::write_file(&fs, "/docs/note.txt", b"Hello", 0o644).unwrap();
/// assert!(fs.stat("/docs/note.txt").unwrap().is_file());
///
/// fs.remove_all("/docs").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct OsFS {
    root: PathBuf, // host-related absolute normalized path
}

impl OsFS {
    /// Creates an `OsFS` rooted at the host `/`.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }

    /// Creates an `OsFS` rooted at `root`.
    /// * `root` must be an absolute host path of an existing directory.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() || root.is_relative() {
            return Err(Error::path("root", root, ErrorKind::InvalidArgument));
        }
        let meta = fs::metadata(root).map_err(|e| Error::from_io("root", root, e))?;
        if !meta.is_dir() {
            return Err(Error::path("root", root, ErrorKind::NotADirectory));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns root path related to the host file system.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Returns the path on the host system that matches the specified inner path.
    pub fn to_host<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let inner = utils::normalize(path);
        match inner.strip_prefix("/") {
            Ok(relative) => self.root.join(relative),
            Err(_) => self.root.join(inner),
        }
    }
}

impl Default for OsFS {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for OsFS {
    type File = OsFile;

    fn open_file<P: AsRef<Path>>(&self, path: P, flags: OpenFlags, perm: u32) -> Result<OsFile> {
        let name = path.as_ref();
        let host = self.to_host(name);

        let mut options = flags.to_open_options();
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(perm);
        }
        #[cfg(not(unix))]
        let _ = perm;

        let file = options
            .open(&host)
            .map_err(|e| Error::from_io("open", name, e))?;
        trace!(path = %host.display(), flags = ?flags, "open");
        Ok(OsFile {
            name: name.to_path_buf(),
            flags,
            inner: Some(file),
        })
    }

    fn stat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let host = self.to_host(&path);
        let meta = fs::metadata(&host).map_err(|e| Error::from_io("stat", &path, e))?;
        Ok(to_metadata(&meta))
    }

    /// Renames on the host. An existing directory at `new` is refused with `AlreadyExists`
    /// even where the host would replace an empty one.
    fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, old: P, new: Q) -> Result<()> {
        let (old_name, new_name) = (old.as_ref(), new.as_ref());
        let (old_host, new_host) = (self.to_host(old_name), self.to_host(new_name));

        if let Ok(meta) = fs::metadata(&new_host) {
            if meta.is_dir() && old_host != new_host {
                return Err(Error::link("rename", old_name, new_name, ErrorKind::AlreadyExists));
            }
        }
        fs::rename(&old_host, &new_host)
            .map_err(|e| Error::link_from_io("rename", old_name, new_name, e))?;

        debug!(old = %old_host.display(), new = %new_host.display(), "renamed");
        Ok(())
    }

    fn remove<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let name = path.as_ref();
        let host = self.to_host(name);
        let meta = fs::symlink_metadata(&host).map_err(|e| Error::from_io("remove", name, e))?;
        if meta.is_dir() {
            fs::remove_dir(&host)
        } else {
            fs::remove_file(&host)
        }
        .map_err(|e| Error::from_io("remove", name, e))?;

        debug!(path = %host.display(), "removed");
        Ok(())
    }

    fn remove_all<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let name = path.as_ref();
        let host = self.to_host(name);
        let meta = match fs::symlink_metadata(&host) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::from_io("removeall", name, e)),
        };
        if meta.is_dir() {
            fs::remove_dir_all(&host)
        } else {
            fs::remove_file(&host)
        }
        .map_err(|e| Error::from_io("removeall", name, e))?;

        debug!(path = %host.display(), "removed all");
        Ok(())
    }

    fn mkdir<P: AsRef<Path>>(&self, path: P, perm: u32) -> Result<()> {
        let name = path.as_ref();
        let host = self.to_host(name);
        dir_builder(perm, false)
            .create(&host)
            .map_err(|e| Error::from_io("mkdir", name, e))?;

        debug!(path = %host.display(), perm = format_args!("{perm:o}"), "created directory");
        Ok(())
    }

    fn mkdir_all<P: AsRef<Path>>(&self, path: P, perm: u32) -> Result<()> {
        let name = path.as_ref();
        let host = self.to_host(name);
        if let Ok(meta) = fs::metadata(&host) {
            if meta.is_dir() {
                return Ok(());
            }
            return Err(Error::path("mkdir", name, ErrorKind::NotADirectory));
        }
        dir_builder(perm, true)
            .create(&host)
            .map_err(|e| Error::from_io("mkdir", name, e))?;

        debug!(path = %host.display(), perm = format_args!("{perm:o}"), "created directories");
        Ok(())
    }
}

fn dir_builder(perm: u32, recursive: bool) -> fs::DirBuilder {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(perm);
    }
    #[cfg(not(unix))]
    let _ = perm;
    builder
}

fn to_metadata(meta: &fs::Metadata) -> Metadata {
    let entry_type = if meta.is_dir() {
        EntryType::Directory
    } else {
        EntryType::File
    };
    #[cfg(unix)]
    let perm = {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o7777
    };
    #[cfg(not(unix))]
    let perm = if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    };
    let modified = meta.modified().unwrap_or(UNIX_EPOCH);
    Metadata::new(entry_type, meta.len(), perm, modified)
}

/// An open host file.
#[derive(Debug)]
pub struct OsFile {
    name: PathBuf,
    flags: OpenFlags,
    inner: Option<fs::File>, // None once closed
}

impl OsFile {
    fn file(&self, op: &'static str) -> Result<&fs::File> {
        self.inner
            .as_ref()
            .ok_or_else(|| Error::path(op, &self.name, ErrorKind::Closed))
    }

    fn io_error(&self, op: &'static str, err: io::Error) -> io::Error {
        Error::from_io(op, &self.name, err).into()
    }
}

impl File for OsFile {
    fn name(&self) -> &Path {
        &self.name
    }

    /// Reads until `buf` is full or the end of the file is reached.
    fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize> {
        let file = self.file("read")?;
        let offset = u64::try_from(offset)
            .map_err(|_| Error::path("read", &self.name, ErrorKind::InvalidArgument))?;
        let mut n = 0;
        while n < buf.len() {
            match positioned::read_at(file, &mut buf[n..], offset + n as u64) {
                Ok(0) => break,
                Ok(k) => n += k,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::from_io("read", &self.name, e)),
            }
        }
        Ok(n)
    }

    fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize> {
        let file = self.file("writeat")?;
        if self.flags.is_append() {
            return Err(Error::path("writeat", &self.name, ErrorKind::InvalidArgument));
        }
        let offset = u64::try_from(offset)
            .map_err(|_| Error::path("writeat", &self.name, ErrorKind::InvalidArgument))?;
        positioned::write_all_at(file, buf, offset)
            .map_err(|e| Error::from_io("write", &self.name, e))?;
        Ok(buf.len())
    }

    /// Negative sizes are rejected by the host with `InvalidArgument`.
    fn truncate(&mut self, size: i64) -> Result<()> {
        let file = self.file("truncate")?;
        let size = u64::try_from(size)
            .map_err(|_| Error::path("truncate", &self.name, ErrorKind::InvalidArgument))?;
        file.set_len(size)
            .map_err(|e| Error::from_io("truncate", &self.name, e))
    }

    fn stat(&self) -> Result<Metadata> {
        let meta = self
            .file("stat")?
            .metadata()
            .map_err(|e| Error::from_io("stat", &self.name, e))?;
        Ok(to_metadata(&meta))
    }

    fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(_) => {
                trace!(path = %self.name.display(), "close");
                Ok(())
            }
            None => Err(Error::path("close", &self.name, ErrorKind::Closed)),
        }
    }
}

impl Read for OsFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = self.file("read")?;
        file.read(buf).map_err(|e| self.io_error("read", e))
    }
}

impl Write for OsFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.file("write")?;
        file.write(buf).map_err(|e| self.io_error("write", e))
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self.file("flush")?;
        file.flush().map_err(|e| self.io_error("flush", e))
    }
}

impl Seek for OsFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let mut file = self.file("seek")?;
        file.seek(pos).map_err(|e| self.io_error("seek", e))
    }
}

#[cfg(unix)]
mod positioned {
    use std::fs::File;
    use std::io;
    use std::os::unix::fs::FileExt;

    pub fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        file.read_at(buf, offset)
    }

    pub fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
        file.write_all_at(buf, offset)
    }
}

#[cfg(windows)]
mod positioned {
    use std::fs::File;
    use std::io;
    use std::os::windows::fs::FileExt;

    pub fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        file.seek_read(buf, offset)
    }

    pub fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
        while !buf.is_empty() {
            match file.seek_write(buf, offset) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    buf = &buf[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
