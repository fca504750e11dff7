use std::io::{self, Read, Write};
use std::path::Path;

use crate::{Error, Metadata, OpenFlags};

pub type Result<T> = std::result::Result<T, Error>;

/// Permission bits used by [`create`].
pub const DEFAULT_FILE_PERM: u32 = 0o666;

/// The operation surface shared by all backends.
///
/// Paths are interpreted relative to the backend root; `.` and `..` are resolved lexically
/// and can not escape it.
pub trait FileSystem {
    type File: File;

    /// Generalized open call. If the file does not exist and `OpenFlags::CREAT` is passed,
    /// it is created with `perm`; the containing directory must exist.
    /// `perm` is ignored when the file already exists.
    fn open_file<P: AsRef<Path>>(&self, path: P, flags: OpenFlags, perm: u32)
    -> Result<Self::File>;

    /// Opens the file for reading.
    fn open<P: AsRef<Path>>(&self, path: P) -> Result<Self::File> {
        self.open_file(path, OpenFlags::RDONLY, 0)
    }

    fn stat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata>;

    /// Renames (moves) `old` to `new`.
    /// An existing file at `new` is replaced, an existing directory is an error.
    fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, old: P, new: Q) -> Result<()>;

    /// Removes a file or an empty directory.
    fn remove<P: AsRef<Path>>(&self, path: P) -> Result<()>;

    /// Removes `path` and everything it contains. A missing `path` is not an error.
    fn remove_all<P: AsRef<Path>>(&self, path: P) -> Result<()>;

    /// Creates a single directory; its parent must already exist.
    fn mkdir<P: AsRef<Path>>(&self, path: P, perm: u32) -> Result<()>;

    /// Creates a directory along with any missing parents.
    /// Does nothing if `path` is already a directory.
    fn mkdir_all<P: AsRef<Path>>(&self, path: P, perm: u32) -> Result<()>;
}

/// An open file handle.
///
/// Sequential I/O goes through the `std::io` traits; failures there are `io::Error`s that
/// wrap a crate [`Error`].
pub trait File: Read + Write + io::Seek {
    /// Returns the path as presented to `open_file`. Still valid after [`File::close`].
    fn name(&self) -> &Path;

    /// Reads from `offset` without moving the cursor.
    /// A count shorter than `buf` means the end of the file was reached.
    fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize>;

    /// Writes at `offset` without moving the cursor, growing the file if needed.
    fn write_at(&mut self, buf: &[u8], offset: i64) -> Result<usize>;

    /// Changes the size of the file. Does not move the cursor.
    fn truncate(&mut self, size: i64) -> Result<()>;

    fn stat(&self) -> Result<Metadata>;

    /// Closes the handle. Any later I/O fails with `ErrorKind::Closed`.
    fn close(&mut self) -> Result<()>;
}

/// Creates or truncates the file at `path` and opens it read-write.
/// A new file gets [`DEFAULT_FILE_PERM`]. The containing directory must exist.
pub fn create<F: FileSystem, P: AsRef<Path>>(fs: &F, path: P) -> Result<F::File> {
    fs.open_file(
        path,
        OpenFlags::RDWR | OpenFlags::CREAT | OpenFlags::TRUNC,
        DEFAULT_FILE_PERM,
    )
}

/// Writes `data` to the file at `path`, creating it with `perm` if necessary.
/// An existing file is truncated first and keeps its permissions.
///
/// A failure mid-write can leave the file partially written.
pub fn write_file<F: FileSystem, P: AsRef<Path>>(
    fs: &F,
    path: P,
    data: &[u8],
    perm: u32,
) -> Result<()> {
    let path = path.as_ref();
    let mut file = fs.open_file(
        path,
        OpenFlags::WRONLY | OpenFlags::CREAT | OpenFlags::TRUNC,
        perm,
    )?;
    let written = file
        .write_all(data)
        .map_err(|e| utils::unwrap_io("write", path, e));
    let closed = file.close();
    written.and(closed)
}

/// Reads the whole file at `path`.
pub fn read_file<F: FileSystem, P: AsRef<Path>>(fs: &F, path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let mut file = fs.open(path)?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| utils::unwrap_io("read", path, e))?;
    file.close()?;
    Ok(content)
}

pub(crate) mod utils {
    use std::io;
    use std::path::{Component, Path, PathBuf};

    use crate::Error;

    /// Lexically normalizes `path` into an inner absolute path.
    ///
    /// Relative paths are anchored at `/`, `.` is dropped, `..` pops a component but never
    /// climbs above `/`, redundant and trailing separators disappear.
    pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
        let mut normalized = PathBuf::from("/");
        for component in path.as_ref().components() {
            match component {
                Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                Component::Normal(name) => normalized.push(name),
            }
        }
        normalized
    }

    pub fn is_virtual_root<P: AsRef<Path>>(path: P) -> bool {
        normalize(path) == Path::new("/")
    }

    /// `true` when `path` lies strictly inside `dir`, compared segment by segment.
    pub fn is_inside(path: &Path, dir: &Path) -> bool {
        path != dir && path.starts_with(dir)
    }

    /// Recovers the crate error carried by an `io::Error`, or wraps a foreign one.
    pub fn unwrap_io(op: &'static str, path: &Path, err: io::Error) -> Error {
        match err.downcast::<Error>() {
            Ok(inner) => inner,
            Err(err) => Error::from_io(op, path, err),
        }
    }
}
