//! This module provides a writable file system that lives entirely in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::UNIX_EPOCH;

use tracing::debug;

use crate::core::{FileSystem, Result, utils};
use crate::{Entry, EntryType, Error, ErrorKind, Metadata, OpenFlags};

use super::map_file::MapFile;

/// Permission bits reported for directories that exist only because something lives inside
/// them.
pub const IMPLICIT_DIR_PERM: u32 = 0o555;

/// A shared, live reference to one entry of the table.
///
/// Open handles keep one of these, so they keep writing to the same entry after it is
/// renamed or removed from the table.
#[derive(Debug, Clone)]
pub(crate) struct Record(Arc<RwLock<Entry>>);

impl Record {
    pub(crate) fn new(entry: Entry) -> Self {
        Self(Arc::new(RwLock::new(entry)))
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Entry> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Entry> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_dir(&self) -> bool {
        self.read().is_dir()
    }
}

type Entries = BTreeMap<PathBuf, Record>;

/// The mapping from inner absolute normalized paths to entries.
///
/// `PathTable` is a cheap, cloneable handle: every clone observes the same entries. Pass
/// one to [`MapFS::with_table`] to share or pre-seed the storage.
///
/// ### Invariants
///
/// 1. **Root existence**: `/` is always present and is a directory.
/// 2. **Path normalization**: all keys are normalized (no `.`, `..`, `//` or trailing `/`).
/// 3. **Implicit parents**: parents are *not* required to have entries. A path without an
///    entry but with entries below it behaves as a directory.
#[derive(Debug, Clone)]
pub struct PathTable {
    entries: Arc<RwLock<Entries>>,
}

impl PathTable {
    /// Creates a table holding only the root directory.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("/"), Record::new(Entry::dir(0o755)));
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Inserts (or replaces) an entry. The root can only be replaced by a directory.
    pub fn insert<P: AsRef<Path>>(&self, path: P, entry: Entry) {
        let inner = utils::normalize(path);
        if utils::is_virtual_root(&inner) && !entry.is_dir() {
            return;
        }
        self.write().insert(inner, Record::new(entry));
    }

    /// Returns a snapshot of the entry stored at `path`.
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<Entry> {
        let inner = utils::normalize(path);
        self.read().get(&inner).map(|record| record.read().clone())
    }

    /// Number of stored entries, the root included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// `true` when only the root is left.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// All stored paths in order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.read().keys().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PathTable {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: AsRef<Path>> FromIterator<(P, Entry)> for PathTable {
    fn from_iter<I: IntoIterator<Item = (P, Entry)>>(iter: I) -> Self {
        let table = PathTable::new();
        for (path, entry) in iter {
            table.insert(path, entry);
        }
        table
    }
}

/// Looks up `path`, synthesizing a directory when only descendants are stored.
fn resolve(entries: &Entries, path: &Path) -> Option<Record> {
    if let Some(record) = entries.get(path) {
        return Some(record.clone());
    }
    if has_children(entries, path) {
        let implicit = Entry::dir(IMPLICIT_DIR_PERM).with_modified(UNIX_EPOCH);
        return Some(Record::new(implicit));
    }
    None
}

fn has_children(entries: &Entries, path: &Path) -> bool {
    entries.keys().any(|key| utils::is_inside(key, path))
}

/// Checks that the parent of `path` exists and is a directory.
fn check_parent(entries: &Entries, path: &Path) -> std::result::Result<(), ErrorKind> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    match resolve(entries, parent) {
        Some(record) if record.is_dir() => Ok(()),
        Some(_) => Err(ErrorKind::NotADirectory),
        None => Err(ErrorKind::NotFound),
    }
}

/// A writable file system (VFS) implementation that stores file and directory entries in
/// memory.
///
/// `MapFS` mirrors the host file system closely enough to stand in for it in tests: open
/// flags, cursors, offset I/O, truncation, rename, recursive removal and directory
/// creation behave as they do on a POSIX host. Nothing touches the disk.
///
/// ### Internal state
///
/// * `table`: the [`PathTable`] holding all entries. Keys are **inner absolute normalized
///   paths**: relative input paths are anchored at `/` and `..` never climbs above it.
///
/// ### Thread Safety
///
/// The table and each entry sit behind a `RwLock`, so `MapFS` and its handles are
/// `Send + Sync`. Concurrent writers to the same path are not coordinated.
///
/// ### Example
///
/// ```
/// use wfs_kit::{FileSystem, MapFS};
///
/// let fs = MapFS::new();
/// fs.mkdir("/docs", 0o755).unwrap();
/// wfs_kit::write_file(&fs, "/docs/note.txt", b"Hello", 0o644).unwrap();
///
/// assert_eq!(wfs_kit::read_file(&fs, "/docs/note.txt").unwrap(), b"Hello");
/// fs.remove_all("/docs").unwrap();
/// assert!(fs.stat("/docs").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapFS {
    table: PathTable,
}

impl MapFS {
    /// Creates new MapFS instance holding only the root directory.
    pub fn new() -> Self {
        Self::with_table(PathTable::new())
    }

    /// Creates a MapFS backed by an existing (possibly shared or pre-seeded) table.
    pub fn with_table(table: PathTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PathTable {
        &self.table
    }

    fn to_inner<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        utils::normalize(path)
    }
}

impl FileSystem for MapFS {
    type File = MapFile;

    /// Opens the file at `path`.
    ///
    /// * Missing file: created (empty, with `perm`) only when `OpenFlags::CREAT` is set.
    /// * `CREAT | EXCL` on an existing path fails with `AlreadyExists`.
    /// * Directories can only be opened read-only.
    /// * `TRUNC` empties the file, `APPEND` moves the cursor to the end.
    fn open_file<P: AsRef<Path>>(&self, path: P, flags: OpenFlags, perm: u32) -> Result<MapFile> {
        let name = path.as_ref();
        let inner = self.to_inner(name);

        let record = {
            let mut entries = self.table.write();
            match resolve(&entries, &inner) {
                Some(_) if flags.is_exclusive() => {
                    return Err(Error::path("open", name, ErrorKind::AlreadyExists));
                }
                Some(record) => record,
                None if flags.is_create() => {
                    check_parent(&entries, &inner)
                        .map_err(|kind| Error::path("open", name, kind))?;
                    let record = Record::new(Entry::new(EntryType::File, perm));
                    entries.insert(inner.clone(), record.clone());
                    debug!(
                        path = %inner.display(),
                        perm = format_args!("{perm:o}"),
                        "created file"
                    );
                    record
                }
                None => return Err(Error::path("open", name, ErrorKind::NotFound)),
            }
        };

        if record.is_dir() && flags.is_writable() {
            return Err(Error::path("open", name, ErrorKind::IsADirectory));
        }

        Ok(MapFile::new(name, flags, record))
    }

    fn stat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let inner = self.to_inner(&path);
        let entries = self.table.read();
        match resolve(&entries, &inner) {
            Some(record) => Ok(record.read().metadata()),
            None => Err(Error::path("stat", path, ErrorKind::NotFound)),
        }
    }

    /// Moves `old` to `new`.
    ///
    /// A directory is moved together with everything stored below it. An existing file at
    /// `new` is replaced; an existing directory is an error, as is moving a directory into
    /// itself. The parent of `new` must exist.
    fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, old: P, new: Q) -> Result<()> {
        let (old_name, new_name) = (old.as_ref(), new.as_ref());
        let fail = |kind| Error::link("rename", old_name, new_name, kind);

        let old = self.to_inner(old_name);
        let new = self.to_inner(new_name);
        if utils::is_virtual_root(&old) {
            return Err(fail(ErrorKind::InvalidArgument));
        }

        let mut entries = self.table.write();
        let Some(old_record) = resolve(&entries, &old) else {
            return Err(fail(ErrorKind::NotFound));
        };
        if old == new {
            return Err(fail(ErrorKind::AlreadyExists));
        }
        if resolve(&entries, &new).is_some_and(|record| record.is_dir()) {
            return Err(fail(ErrorKind::AlreadyExists));
        }
        check_parent(&entries, &new).map_err(fail)?;
        let is_dir = old_record.is_dir();
        if is_dir && utils::is_inside(&new, &old) {
            return Err(fail(ErrorKind::InvalidArgument));
        }

        // the file being replaced, if any
        entries.remove(&new);

        if is_dir {
            let moved: Vec<PathBuf> = entries
                .keys()
                .filter(|&key| key.starts_with(&old))
                .cloned()
                .collect();
            for key in &moved {
                let (Some(record), Ok(rest)) = (entries.remove(key), key.strip_prefix(&old)) else {
                    continue;
                };
                // joining an empty rest would leave a trailing separator
                let target = if rest.as_os_str().is_empty() {
                    new.clone()
                } else {
                    new.join(rest)
                };
                entries.insert(target, record);
            }
            debug!(
                old = %old.display(),
                new = %new.display(),
                entries = moved.len(),
                "renamed directory"
            );
        } else if let Some(record) = entries.remove(&old) {
            entries.insert(new.clone(), record);
            debug!(old = %old.display(), new = %new.display(), "renamed file");
        }

        Ok(())
    }

    /// Removes a file or an empty directory.
    fn remove<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let name = path.as_ref();
        let inner = self.to_inner(name);
        if utils::is_virtual_root(&inner) {
            return Err(Error::path("remove", name, ErrorKind::InvalidArgument));
        }

        let mut entries = self.table.write();
        if has_children(&entries, &inner) {
            return Err(Error::path("remove", name, ErrorKind::NotEmpty));
        }
        if entries.remove(&inner).is_none() {
            return Err(Error::path("remove", name, ErrorKind::NotFound));
        }

        debug!(path = %inner.display(), "removed");
        Ok(())
    }

    /// Removes `path` and everything below it. Never fails; the root itself is kept.
    fn remove_all<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let inner = self.to_inner(path);
        let mut entries = self.table.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&inner) || utils::is_virtual_root(key));

        debug!(path = %inner.display(), removed = before - entries.len(), "removed all");
        Ok(())
    }

    /// Creates a directory. The parent must already exist and be a directory.
    fn mkdir<P: AsRef<Path>>(&self, path: P, perm: u32) -> Result<()> {
        let name = path.as_ref();
        let inner = self.to_inner(name);

        let mut entries = self.table.write();
        if resolve(&entries, &inner).is_some() {
            return Err(Error::path("mkdir", name, ErrorKind::AlreadyExists));
        }
        check_parent(&entries, &inner).map_err(|kind| Error::path("mkdir", name, kind))?;
        entries.insert(inner.clone(), Record::new(Entry::dir(perm)));

        debug!(path = %inner.display(), perm = format_args!("{perm:o}"), "created directory");
        Ok(())
    }

    /// Creates a directory and every missing parent, all with `perm`.
    ///
    /// Fails with `NotADirectory` when any existing component is a file.
    fn mkdir_all<P: AsRef<Path>>(&self, path: P, perm: u32) -> Result<()> {
        let name = path.as_ref();
        let inner = self.to_inner(name);

        let mut entries = self.table.write();
        let mut built = PathBuf::from("/");
        let mut created = 0;
        for component in inner.components().skip(1) {
            built.push(component);
            match resolve(&entries, &built) {
                Some(record) if record.is_dir() => {}
                Some(_) => return Err(Error::path("mkdir", name, ErrorKind::NotADirectory)),
                None => {
                    entries.insert(built.clone(), Record::new(Entry::dir(perm)));
                    created += 1;
                }
            }
        }

        debug!(path = %inner.display(), created, "created directories");
        Ok(())
    }
}
