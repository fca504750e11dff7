//! A small, extensible set of writable file systems for Rust.
//! Provides one API over the host file system and over an in-memory emulation of it.
//! Ideal for testing code that creates, rewrites, moves and deletes files.
//!
//! ### Overview
//!
//! `wfs-kit` defines the generic [`FileSystem`] and [`File`] traits and provides two
//! implementations:
//! - [`OsFS`] forwards every call to the host, optionally confined to a root directory.
//! - [`MapFS`] keeps everything in a shared [`PathTable`] in process memory.
//!
//! **Key ideas**:
//! - **Interchangeability**: code written against `FileSystem` runs on both backends.
//! - **Host semantics**: open flags, cursors, offset I/O, truncation, rename and recursive
//!   removal behave in `MapFS` the way they do on a POSIX host.
//! - **Testability**: `MapFS` is fast, isolated and deterministic.
//! - **Typed errors**: every error names the operation and path and carries an
//!   [`ErrorKind`] to match on.
//!
//! ```
//! use std::io::{Read, Seek, SeekFrom};
//! use wfs_kit::{FileSystem, MapFS};
//!
//! let fs = MapFS::new();
//! wfs_kit::write_file(&fs, "/greeting.txt", b"Hello, World!", 0o644).unwrap();
//!
//! let mut file = fs.open("/greeting.txt").unwrap();
//! file.seek(SeekFrom::Start(7)).unwrap();
//! let mut rest = String::new();
//! file.read_to_string(&mut rest).unwrap();
//! assert_eq!(rest, "World!");
//! ```

mod core;
mod error;
mod flags;
mod vfs;

pub use core::{DEFAULT_FILE_PERM, File, FileSystem, Result, create, read_file, write_file};
pub use error::{Error, ErrorKind};
pub use flags::OpenFlags;
pub use vfs::{
    Entry, EntryType, IMPLICIT_DIR_PERM, MapFS, MapFile, Metadata, OsFS, OsFile, PathTable,
};
