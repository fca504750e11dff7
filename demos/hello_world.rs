use std::io::{Read, Seek, SeekFrom, Write};

use tracing_subscriber::EnvFilter;
use wfs_kit::{File, FileSystem, MapFS, OpenFlags, OsFS};

/// Writes a couple of files, edits one in place, moves the folder around and reads it all
/// back. Works the same on any backend.
fn greet<F: FileSystem>(fs: &F) -> anyhow::Result<String> {
    // creates `/docs` and everything needed above it
    fs.mkdir_all("/docs/drafts", 0o755)?;

    wfs_kit::write_file(fs, "/docs/drafts/first.txt", b"Hello", 0o644)?;
    wfs_kit::write_file(fs, "/docs/second.txt", b"Earth", 0o644)?;

    // overwrite in place without touching the cursor
    let mut second = fs.open_file("/docs/second.txt", OpenFlags::RDWR, 0)?;
    second.write_at(b"World", 0)?;
    second.seek(SeekFrom::End(0))?;
    second.write_all(b"!")?;
    second.close()?;

    // moves the whole directory, contents included
    fs.rename("/docs", "/archive")?;

    let first = wfs_kit::read_file(fs, "/archive/drafts/first.txt")?;
    let mut second = fs.open("/archive/second.txt")?;
    let mut tail = String::new();
    second.read_to_string(&mut tail)?;
    second.close()?;

    fs.remove_all("/archive")?;
    assert!(fs.stat("/archive").is_err());

    Ok(format!("{}, {}", String::from_utf8(first)?, tail))
}

fn main() -> anyhow::Result<()> {
    // RUST_LOG=wfs_kit=debug shows every mutation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("{}", greet(&MapFS::new())?);

    let root = std::env::temp_dir().join("wfs_kit_hello");
    std::fs::create_dir_all(&root)?;
    println!("{}", greet(&OsFS::with_root(&root)?)?);
    std::fs::remove_dir_all(&root)?;

    Ok(())
}
