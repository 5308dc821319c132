//! Owner-only filesystem preparation for credential storage.
//!
//! Tokens are one-way digests, but the set of valid digests still lets an
//! attacker confirm guesses offline, so store files stay private to the
//! service user.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::StoreError;

/// Create `path` (and parents) and tighten it to 0o700 when we own it.
pub(crate) fn ensure_secure_dir(path: &Path) -> Result<(), StoreError> {
    std::fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let metadata = std::fs::metadata(path).map_err(|e| StoreError::io(path, e))?;

        let our_uid = unsafe { libc::getuid() };
        if metadata.uid() != our_uid {
            return Ok(());
        }

        let current_mode = metadata.permissions().mode() & 0o777;
        if current_mode & 0o077 != 0 {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::io(path, e))?;
        }
    }
    Ok(())
}

/// Ensure the parent directory of a store file exists with secure permissions.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_secure_dir(parent),
        _ => Ok(()),
    }
}

/// Create a SQLite database file (and tighten its WAL/SHM sidecars) with
/// owner-only permissions.
pub(crate) fn prepare_db_path(path: &Path) -> Result<(), StoreError> {
    ensure_parent_dir(path)?;

    if !path.exists() {
        let mut open = OpenOptions::new();
        open.create(true).truncate(false).read(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            open.mode(0o600);
        }
        let _file = open.open(path).map_err(|e| StoreError::io(path, e))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| StoreError::io(path, e))?;
        for suffix in ["-wal", "-shm"] {
            let sidecar = sqlite_sidecar_path(path, suffix);
            if sidecar.exists() {
                let _ = std::fs::set_permissions(&sidecar, std::fs::Permissions::from_mode(0o600));
            }
        }
    }

    Ok(())
}

fn sqlite_sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path.file_name().map(|name| name.to_string_lossy());
    match file_name {
        Some(name) => path.with_file_name(format!("{name}{suffix}")),
        None => PathBuf::from(format!("{}{suffix}", path.display())),
    }
}
