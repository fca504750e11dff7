//! Behaviour both backends must agree on.
//!
//! Every check is written once against `FileSystem` and run on a `MapFS` and on an `OsFS`
//! rooted in a temporary directory, both seeded with the same tree:
//!
//! ```text
//! /testfile     "Hello, World!"
//! /dir/file     "inside"
//! ```

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{Result, anyhow};
use tempdir::TempDir;
use wfs_kit::{
    Error, ErrorKind, File, FileSystem, MapFS, OpenFlags, OsFS, create, read_file, write_file,
};

fn seed<F: FileSystem>(fs: &F) -> Result<()> {
    write_file(fs, "/testfile", b"Hello, World!", 0o644)?;
    fs.mkdir("/dir", 0o755)?;
    write_file(fs, "/dir/file", b"inside", 0o644)?;
    Ok(())
}

fn with_map_fs(check: impl FnOnce(&MapFS) -> Result<()>) -> Result<()> {
    let fs = MapFS::new();
    seed(&fs)?;
    check(&fs)
}

fn with_os_fs(check: impl FnOnce(&OsFS) -> Result<()>) -> Result<()> {
    let temp_dir = TempDir::new("wfs_contract")?;
    let fs = OsFS::with_root(temp_dir.path())?;
    seed(&fs)?;
    check(&fs)
}

/// Extracts the crate error kind carried by an error from the `std::io` traits.
fn io_kind(err: io::Error) -> Result<ErrorKind> {
    err.downcast::<Error>()
        .map(|err| err.kind())
        .map_err(|err| anyhow!("foreign io error: {err}"))
}

macro_rules! contract {
    ($($name:ident),* $(,)?) => {
        mod map_fs {
            $(
                #[test]
                fn $name() -> anyhow::Result<()> {
                    super::with_map_fs(super::$name::<wfs_kit::MapFS>)
                }
            )*
        }

        mod os_fs {
            $(
                #[test]
                fn $name() -> anyhow::Result<()> {
                    super::with_os_fs(super::$name::<wfs_kit::OsFS>)
                }
            )*
        }
    };
}

contract!(
    read_at_does_not_move_cursor,
    write_at_overwrites_in_place,
    seek_then_read,
    truncate_shrinks,
    name_is_path_as_opened,
    open_missing_without_create,
    open_create_needs_parent,
    open_exclusive_on_existing,
    open_dir_for_writing,
    write_on_read_only_handle,
    read_on_directory,
    append_writes_at_end,
    trunc_on_open_empties,
    handle_survives_rename,
    close_twice,
    rename_file,
    rename_replaces_file,
    rename_dir_moves_contents,
    rename_onto_dir,
    rename_missing,
    remove_file_and_empty_dir,
    remove_non_empty_dir,
    remove_missing,
    remove_all_tree,
    remove_all_missing,
    mkdir_single,
    mkdir_errors,
    mkdir_all_nested,
    mkdir_all_through_file,
    create_truncates_existing,
    write_file_replaces_content,
);

fn read_at_does_not_move_cursor<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = fs.open("/testfile")?;
    let mut buf = [0; 5];
    assert_eq!(file.read_at(&mut buf, 7)?, 5);
    assert_eq!(&buf, b"World");

    let mut head = [0; 5];
    file.read_exact(&mut head)?;
    assert_eq!(&head, b"Hello");
    Ok(())
}

fn write_at_overwrites_in_place<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = fs.open_file("/testfile", OpenFlags::RDWR, 0)?;
    assert_eq!(file.write_at(b"There", 7)?, 5);
    file.close()?;

    assert_eq!(read_file(fs, "/testfile")?, b"Hello, There!");
    Ok(())
}

fn seek_then_read<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = fs.open("/testfile")?;
    assert_eq!(file.seek(SeekFrom::Start(7))?, 7);

    let mut rest = String::new();
    file.read_to_string(&mut rest)?;
    assert_eq!(rest, "World!");

    assert_eq!(file.seek(SeekFrom::End(-6))?, 7);
    assert_eq!(file.seek(SeekFrom::Current(-2))?, 5);
    Ok(())
}

fn truncate_shrinks<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = fs.open_file("/testfile", OpenFlags::RDWR, 0)?;
    file.truncate(5)?;
    assert_eq!(file.stat()?.len(), 5);
    file.close()?;

    assert_eq!(read_file(fs, "/testfile")?, b"Hello");
    assert_eq!(fs.stat("/testfile")?.len(), 5);
    Ok(())
}

fn name_is_path_as_opened<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = fs.open("/testfile")?;
    assert_eq!(file.name(), Path::new("/testfile"));
    file.close()?;
    assert_eq!(file.name(), Path::new("/testfile"));
    Ok(())
}

fn open_missing_without_create<F: FileSystem>(fs: &F) -> Result<()> {
    let err = fs.open("/missing").err().ok_or_else(|| anyhow!("opened a missing file"))?;
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = fs
        .open_file("/missing", OpenFlags::RDWR, 0o644)
        .err()
        .ok_or_else(|| anyhow!("opened a missing file"))?;
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

fn open_create_needs_parent<F: FileSystem>(fs: &F) -> Result<()> {
    let flags = OpenFlags::WRONLY | OpenFlags::CREAT;
    let err = fs
        .open_file("/nowhere/file", flags, 0o644)
        .err()
        .ok_or_else(|| anyhow!("created a file in a missing directory"))?;
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let mut file = fs.open_file("/dir/new", flags, 0o644)?;
    file.close()?;
    assert!(fs.stat("/dir/new")?.is_file());
    assert_eq!(fs.stat("/dir/new")?.len(), 0);
    Ok(())
}

fn open_exclusive_on_existing<F: FileSystem>(fs: &F) -> Result<()> {
    let flags = OpenFlags::WRONLY | OpenFlags::CREAT | OpenFlags::EXCL;
    let err = fs
        .open_file("/testfile", flags, 0o644)
        .err()
        .ok_or_else(|| anyhow!("exclusive open of an existing file"))?;
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let mut file = fs.open_file("/fresh", flags, 0o644)?;
    file.close()?;
    Ok(())
}

fn open_dir_for_writing<F: FileSystem>(fs: &F) -> Result<()> {
    let err = fs
        .open_file("/dir", OpenFlags::WRONLY, 0)
        .err()
        .ok_or_else(|| anyhow!("opened a directory for writing"))?;
    assert_eq!(err.kind(), ErrorKind::IsADirectory);

    let mut dir = fs.open("/dir")?;
    assert!(dir.stat()?.is_dir());
    dir.close()?;
    Ok(())
}

fn write_on_read_only_handle<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = fs.open("/testfile")?;
    let err = file
        .write(b"nope")
        .err()
        .ok_or_else(|| anyhow!("wrote through a read-only handle"))?;
    assert_eq!(io_kind(err)?, ErrorKind::BadFileAccess);
    assert_eq!(read_file(fs, "/testfile")?, b"Hello, World!");
    Ok(())
}

fn read_on_directory<F: FileSystem>(fs: &F) -> Result<()> {
    let mut dir = fs.open("/dir")?;
    let mut buf = [0; 8];
    let err = dir
        .read(&mut buf)
        .err()
        .ok_or_else(|| anyhow!("read from a directory"))?;
    assert_eq!(io_kind(err)?, ErrorKind::IsADirectory);
    Ok(())
}

fn append_writes_at_end<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = fs.open_file("/testfile", OpenFlags::WRONLY | OpenFlags::APPEND, 0)?;
    file.write_all(b"!!")?;
    file.write_all(b"?")?;

    let err = file
        .write_at(b"x", 0)
        .err()
        .ok_or_else(|| anyhow!("positioned write in append mode"))?;
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    file.close()?;

    assert_eq!(read_file(fs, "/testfile")?, b"Hello, World!!!?");
    Ok(())
}

fn trunc_on_open_empties<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = fs.open_file("/testfile", OpenFlags::RDWR | OpenFlags::TRUNC, 0)?;
    assert_eq!(file.stat()?.len(), 0);
    file.write_all(b"new")?;
    file.close()?;

    assert_eq!(read_file(fs, "/testfile")?, b"new");
    Ok(())
}

fn handle_survives_rename<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = fs.open_file("/testfile", OpenFlags::RDWR, 0)?;
    fs.rename("/testfile", "/moved")?;

    file.write_at(b"J", 0)?;
    file.close()?;

    assert_eq!(read_file(fs, "/moved")?, b"Jello, World!");
    Ok(())
}

fn close_twice<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = fs.open("/testfile")?;
    file.close()?;

    let err = file.close().err().ok_or_else(|| anyhow!("closed twice"))?;
    assert_eq!(err.kind(), ErrorKind::Closed);

    let mut buf = [0; 1];
    let err = file.read_at(&mut buf, 0).err().ok_or_else(|| anyhow!("read after close"))?;
    assert_eq!(err.kind(), ErrorKind::Closed);

    let err = file.read(&mut buf).err().ok_or_else(|| anyhow!("read after close"))?;
    assert_eq!(io_kind(err)?, ErrorKind::Closed);
    Ok(())
}

fn rename_file<F: FileSystem>(fs: &F) -> Result<()> {
    fs.rename("/testfile", "/dir/renamed")?;

    assert_eq!(
        fs.stat("/testfile").map_err(|e| e.kind()).err(),
        Some(ErrorKind::NotFound)
    );
    assert_eq!(read_file(fs, "/dir/renamed")?, b"Hello, World!");
    Ok(())
}

fn rename_replaces_file<F: FileSystem>(fs: &F) -> Result<()> {
    fs.rename("/testfile", "/dir/file")?;

    assert_eq!(read_file(fs, "/dir/file")?, b"Hello, World!");
    assert!(fs.stat("/testfile").is_err());
    Ok(())
}

fn rename_dir_moves_contents<F: FileSystem>(fs: &F) -> Result<()> {
    fs.mkdir("/dir/sub", 0o755)?;
    write_file(fs, "/dir/sub/leaf", b"leaf", 0o644)?;

    fs.rename("/dir", "/other")?;

    assert!(fs.stat("/dir").is_err());
    assert!(fs.stat("/other")?.is_dir());
    assert!(fs.stat("/other/sub")?.is_dir());
    assert_eq!(read_file(fs, "/other/file")?, b"inside");
    assert_eq!(read_file(fs, "/other/sub/leaf")?, b"leaf");
    Ok(())
}

fn rename_onto_dir<F: FileSystem>(fs: &F) -> Result<()> {
    fs.mkdir("/target", 0o755)?;

    let err = fs
        .rename("/testfile", "/target")
        .err()
        .ok_or_else(|| anyhow!("renamed a file onto a directory"))?;
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(matches!(err, Error::Link { .. }));
    assert_eq!(read_file(fs, "/testfile")?, b"Hello, World!");
    Ok(())
}

fn rename_missing<F: FileSystem>(fs: &F) -> Result<()> {
    let err = fs
        .rename("/missing", "/elsewhere")
        .err()
        .ok_or_else(|| anyhow!("renamed a missing file"))?;
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.op(), "rename");
    Ok(())
}

fn remove_file_and_empty_dir<F: FileSystem>(fs: &F) -> Result<()> {
    fs.remove("/testfile")?;
    assert!(fs.stat("/testfile").is_err());

    fs.mkdir("/empty", 0o755)?;
    fs.remove("/empty")?;
    assert!(fs.stat("/empty").is_err());
    Ok(())
}

fn remove_non_empty_dir<F: FileSystem>(fs: &F) -> Result<()> {
    let err = fs
        .remove("/dir")
        .err()
        .ok_or_else(|| anyhow!("removed a non-empty directory"))?;
    assert_eq!(err.kind(), ErrorKind::NotEmpty);
    assert_eq!(read_file(fs, "/dir/file")?, b"inside");
    Ok(())
}

fn remove_missing<F: FileSystem>(fs: &F) -> Result<()> {
    let err = fs
        .remove("/missing")
        .err()
        .ok_or_else(|| anyhow!("removed a missing file"))?;
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

fn remove_all_tree<F: FileSystem>(fs: &F) -> Result<()> {
    fs.mkdir_all("/dir/a/b", 0o755)?;
    write_file(fs, "/dir/a/b/c", b"c", 0o644)?;
    fs.mkdir("/dir2", 0o755)?;

    fs.remove_all("/dir")?;

    assert!(fs.stat("/dir").is_err());
    assert!(fs.stat("/dir/a/b/c").is_err());
    assert!(fs.stat("/dir2")?.is_dir());
    assert!(fs.stat("/testfile")?.is_file());
    Ok(())
}

fn remove_all_missing<F: FileSystem>(fs: &F) -> Result<()> {
    fs.remove_all("/missing")?;
    fs.remove_all("/testfile")?;
    assert!(fs.stat("/testfile").is_err());
    Ok(())
}

fn mkdir_single<F: FileSystem>(fs: &F) -> Result<()> {
    fs.mkdir("/dir/new", 0o750)?;

    let meta = fs.stat("/dir/new")?;
    assert!(meta.is_dir());
    Ok(())
}

fn mkdir_errors<F: FileSystem>(fs: &F) -> Result<()> {
    let err = fs
        .mkdir("/dir", 0o755)
        .err()
        .ok_or_else(|| anyhow!("created an existing directory"))?;
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = fs
        .mkdir("/missing/child", 0o755)
        .err()
        .ok_or_else(|| anyhow!("created a directory in a missing parent"))?;
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

fn mkdir_all_nested<F: FileSystem>(fs: &F) -> Result<()> {
    fs.mkdir_all("/a/b/c", 0o755)?;
    assert!(fs.stat("/a")?.is_dir());
    assert!(fs.stat("/a/b")?.is_dir());
    assert!(fs.stat("/a/b/c")?.is_dir());

    fs.mkdir_all("/a/b/c", 0o755)?;
    fs.mkdir_all("/dir", 0o755)?;
    Ok(())
}

fn mkdir_all_through_file<F: FileSystem>(fs: &F) -> Result<()> {
    let err = fs
        .mkdir_all("/testfile", 0o755)
        .err()
        .ok_or_else(|| anyhow!("mkdir_all over a file"))?;
    assert_eq!(err.kind(), ErrorKind::NotADirectory);

    let err = fs
        .mkdir_all("/testfile/sub", 0o755)
        .err()
        .ok_or_else(|| anyhow!("mkdir_all below a file"))?;
    assert_eq!(err.kind(), ErrorKind::NotADirectory);
    Ok(())
}

fn create_truncates_existing<F: FileSystem>(fs: &F) -> Result<()> {
    let mut file = create(fs, "/testfile")?;
    assert_eq!(file.stat()?.len(), 0);
    file.write_all(b"fresh")?;
    file.seek(SeekFrom::Start(0))?;

    let mut back = String::new();
    file.read_to_string(&mut back)?;
    assert_eq!(back, "fresh");
    file.close()?;

    let mut file = create(fs, "/dir/created")?;
    file.close()?;
    assert!(fs.stat("/dir/created")?.is_file());
    Ok(())
}

fn write_file_replaces_content<F: FileSystem>(fs: &F) -> Result<()> {
    write_file(fs, "/testfile", b"short", 0o600)?;
    assert_eq!(read_file(fs, "/testfile")?, b"short");

    write_file(fs, "/dir/another", b"another", 0o600)?;
    assert_eq!(read_file(fs, "/dir/another")?, b"another");

    let err = write_file(fs, "/missing/file", b"x", 0o600)
        .err()
        .ok_or_else(|| anyhow!("wrote into a missing directory"))?;
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}
