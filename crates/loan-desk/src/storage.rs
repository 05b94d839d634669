use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use tempfile::NamedTempFile;

fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Sidecar file `<target>.lock` guarding read-modify-write cycles on `target`.
pub(crate) fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("store"));
    name.push(".lock");
    parent_dir(target).join(name)
}

/// Run `operation` while holding an exclusive advisory lock on the sidecar of `target`.
///
/// The lock is taken on a fresh file descriptor each call, so it serializes callers across
/// threads, store instances, and processes alike.
pub(crate) fn with_exclusive_lock<T>(
    target: &Path,
    operation: impl FnOnce() -> T,
) -> io::Result<T> {
    fs::create_dir_all(parent_dir(target))?;
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path(target))?;
    let mut lock = RwLock::new(file);
    let _guard = lock.write()?;
    Ok(operation())
}

/// Replace `target` with `content` so readers never observe a partially written file.
///
/// The payload goes to a uniquely named sibling temp file which is fsynced and persisted over
/// the target; the parent directory is fsynced afterwards so the rename itself survives a crash.
pub(crate) fn atomic_write(target: &Path, content: &[u8]) -> io::Result<()> {
    let parent = parent_dir(target);
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(target)?;

    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Read a file, mapping "not found" to `None`.
pub(crate) fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
