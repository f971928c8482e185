//! Durable filesystem writes for the output tree.
//!
//! Everything the builder and stager put into the output directory goes
//! through these helpers so that a file is on stable storage before the
//! next phase is allowed to look at it.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Write `contents` to `path`, creating parent directories, and fsync the file.
pub fn write_durable(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Copy `src` over `dst` and fsync the destination. Returns bytes copied.
pub fn copy_durable(src: &Path, dst: &Path) -> io::Result<u64> {
    let bytes = fs::copy(src, dst)?;
    File::open(dst)?.sync_all()?;
    Ok(bytes)
}

/// Flush a directory's entry table so newly created names survive a crash.
#[cfg(unix)]
pub fn sync_dir(path: &Path) -> io::Result<()> {
    File::open(path)?.sync_all()
}

/// Directory handles cannot be fsynced portably off Unix.
#[cfg(not(unix))]
pub fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Remove every entry inside `dir`, keeping `dir` itself. Returns the number removed.
pub fn clear_dir(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }

    Ok(removed)
}
