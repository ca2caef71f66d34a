//! Filesystem helpers for database files and their sidecars

use anyhow::{anyhow, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffixes SQLite may create next to a database file
const SIDECAR_SUFFIXES: &[&str] = &["-journal", "-wal", "-shm"];

fn sidecar_paths(path: &Path) -> Vec<PathBuf> {
    SIDECAR_SUFFIXES
        .iter()
        .map(|suffix| {
            let mut name = path.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        })
        .collect()
}

/// Remove a database file and its journal/WAL sidecars
///
/// Missing files are not an error. Returns `false` when something that
/// existed could not be removed.
pub fn remove_database_files(path: &Path) -> bool {
    let mut removed_all = true;
    for p in std::iter::once(path.to_path_buf()).chain(sidecar_paths(path)) {
        match fs::remove_file(&p) {
            Ok(()) => debug!("removed {}", p.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to remove {}: {}", p.display(), e);
                removed_all = false;
            }
        }
    }
    removed_all
}

/// Ensure the parent directory of `path` exists
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| anyhow!("Failed to create directory '{}': {}", parent.display(), e)),
        _ => Ok(()),
    }
}

/// Keep a file out of Time Machine / iCloud backups
#[cfg(target_vendor = "apple")]
pub fn exclude_from_backup(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    const ATTR_NAME: &[u8] = b"com.apple.metadata:com_apple_backup_excludeItem\0";
    const ATTR_VALUE: &[u8] = b"com.apple.backupd";

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };

    // SAFETY: both pointers reference NUL-terminated / length-delimited
    // buffers that outlive the call.
    let rc = unsafe {
        libc::setxattr(
            c_path.as_ptr(),
            ATTR_NAME.as_ptr().cast(),
            ATTR_VALUE.as_ptr().cast(),
            ATTR_VALUE.len(),
            0,
            0,
        )
    };
    if rc != 0 {
        warn!(
            "Failed to exclude {} from backup: {}",
            path.display(),
            io::Error::last_os_error()
        );
    }
    rc == 0
}

/// Keep a file out of backups. Nothing to do outside Apple platforms.
#[cfg(not(target_vendor = "apple"))]
pub fn exclude_from_backup(path: &Path) -> bool {
    debug!("no backup exclusion mechanism for {}", path.display());
    true
}
