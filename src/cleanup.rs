//! Best-effort removal of scratch directories
//!
//! Git object files are created read-only, and on some platforms that is
//! enough to make a recursive delete fail. Removal is retried once after
//! granting the owner write permission on everything under the directory;
//! whatever still fails after that is logged and ignored.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Remove `path` recursively without ever failing the caller.
///
/// Returns `true` when the directory is gone afterwards.
pub fn remove_dir_best_effort(path: &Path) -> bool {
    match fs::remove_dir_all(path) {
        Ok(()) => return true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return true,
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!(
                "Permission denied removing {}, granting write access and retrying",
                path.display()
            );
        }
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            return !path.exists();
        }
    }

    make_owner_writable(path);

    if let Err(e) = fs::remove_dir_all(path) {
        warn!("Leaving residue at {}: {}", path.display(), e);
    }

    !path.exists()
}

/// Recursively add owner write permission, ignoring individual failures
fn make_owner_writable(path: &Path) {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return;
    };
    if metadata.file_type().is_symlink() {
        return;
    }

    let mut permissions = metadata.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
    }
    let _ = fs::set_permissions(path, permissions);

    if metadata.is_dir() {
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                make_owner_writable(&entry.path());
            }
        }
    }
}
