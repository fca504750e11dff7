mod entry;
mod map_file;
mod map_fs;
mod os_fs;

pub use entry::{Entry, EntryType, Metadata};
pub use map_file::MapFile;
pub use map_fs::{IMPLICIT_DIR_PERM, MapFS, PathTable};
pub use os_fs::{OsFS, OsFile};
