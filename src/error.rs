//! Error types shared by every backend.
//!
//! Errors follow the host convention: each one names the failed operation and the path(s)
//! involved, plus an [`ErrorKind`] the caller can match on without parsing messages.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Classification of a failed filesystem call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    IsADirectory,
    NotADirectory,
    NotEmpty,
    InvalidArgument,
    /// The handle was opened with flags that do not permit the operation.
    BadFileAccess,
    /// The handle has already been closed.
    Closed,
    /// A host error with no closer classification.
    Other,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "no such file or directory",
            ErrorKind::AlreadyExists => "file exists",
            ErrorKind::IsADirectory => "is a directory",
            ErrorKind::NotADirectory => "not a directory",
            ErrorKind::NotEmpty => "directory not empty",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::BadFileAccess => "bad file descriptor",
            ErrorKind::Closed => "file already closed",
            ErrorKind::Other => "i/o error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ErrorKind> for io::ErrorKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            ErrorKind::IsADirectory => io::ErrorKind::IsADirectory,
            ErrorKind::NotADirectory => io::ErrorKind::NotADirectory,
            ErrorKind::NotEmpty => io::ErrorKind::DirectoryNotEmpty,
            ErrorKind::InvalidArgument => io::ErrorKind::InvalidInput,
            ErrorKind::BadFileAccess => io::ErrorKind::PermissionDenied,
            ErrorKind::Closed | ErrorKind::Other => io::ErrorKind::Other,
        }
    }
}

/// A failed filesystem call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation on a single path.
    #[error("{op} {}: {kind}", path.display())]
    Path {
        op: &'static str,
        path: PathBuf,
        kind: ErrorKind,
        #[source]
        source: Option<io::Error>,
    },

    /// An operation on two paths, e.g. `rename`.
    #[error("{op} {} {}: {kind}", old.display(), new.display())]
    Link {
        op: &'static str,
        old: PathBuf,
        new: PathBuf,
        kind: ErrorKind,
        #[source]
        source: Option<io::Error>,
    },
}

impl Error {
    pub(crate) fn path<P: AsRef<Path>>(op: &'static str, path: P, kind: ErrorKind) -> Self {
        Error::Path {
            op,
            path: path.as_ref().to_path_buf(),
            kind,
            source: None,
        }
    }

    pub(crate) fn link<P: AsRef<Path>, Q: AsRef<Path>>(
        op: &'static str,
        old: P,
        new: Q,
        kind: ErrorKind,
    ) -> Self {
        Error::Link {
            op,
            old: old.as_ref().to_path_buf(),
            new: new.as_ref().to_path_buf(),
            kind,
            source: None,
        }
    }

    /// Wraps a host error, classifying it by its `io::ErrorKind` and raw OS code.
    pub(crate) fn from_io<P: AsRef<Path>>(op: &'static str, path: P, err: io::Error) -> Self {
        Error::Path {
            op,
            path: path.as_ref().to_path_buf(),
            kind: classify(&err),
            source: Some(err),
        }
    }

    pub(crate) fn link_from_io<P: AsRef<Path>, Q: AsRef<Path>>(
        op: &'static str,
        old: P,
        new: Q,
        err: io::Error,
    ) -> Self {
        Error::Link {
            op,
            old: old.as_ref().to_path_buf(),
            new: new.as_ref().to_path_buf(),
            kind: classify(&err),
            source: Some(err),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Path { kind, .. } | Error::Link { kind, .. } => *kind,
        }
    }

    /// Returns the name of the failed operation (`open`, `rename`, `write`, ...).
    pub fn op(&self) -> &'static str {
        match self {
            Error::Path { op, .. } | Error::Link { op, .. } => op,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        io::Error::new(err.kind().into(), err)
    }
}

fn classify(err: &io::Error) -> ErrorKind {
    #[cfg(unix)]
    {
        // EBADF and EISDIR come back from the host without a stable io::ErrorKind mapping
        // on every toolchain.
        match err.raw_os_error() {
            Some(9) => return ErrorKind::BadFileAccess,
            Some(21) => return ErrorKind::IsADirectory,
            _ => {}
        }
    }
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
        io::ErrorKind::IsADirectory => ErrorKind::IsADirectory,
        io::ErrorKind::NotADirectory => ErrorKind::NotADirectory,
        io::ErrorKind::DirectoryNotEmpty => ErrorKind::NotEmpty,
        io::ErrorKind::InvalidInput => ErrorKind::InvalidArgument,
        io::ErrorKind::PermissionDenied => ErrorKind::BadFileAccess,
        _ => ErrorKind::Other,
    }
}
