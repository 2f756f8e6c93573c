// ABOUTME: Scoped cleanup for an artifact installed by an unfinished deploy.
// ABOUTME: Removes the directory under the ledger lock, and only if no slot references it.

use std::path::{Path, PathBuf};

use crate::ledger::{CorruptLedgerPolicy, Ledger, LedgerLock, LockInfo};
use crate::store::Installation;

/// Owns an artifact directory until the ledger records it.
///
/// Only directories this deploy created are candidates for removal, and only
/// while the ledger lock is held and the ledger does not reference them: an
/// identical upload may have recorded the same directory in the meantime.
/// When the lock is busy the directory is left for `prune`.
#[derive(Debug)]
pub(crate) struct ArtifactGuard {
    path: PathBuf,
    armed: bool,
}

impl ArtifactGuard {
    pub(crate) fn new(installation: &Installation) -> Self {
        Self {
            path: installation.path.clone(),
            armed: installation.created,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Hand the directory over; it is kept from now on.
    pub(crate) fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Clean up while the caller already holds the ledger lock.
    pub(crate) fn discard(mut self, lock: &LedgerLock) {
        self.reclaim(Some(lock));
    }

    fn reclaim(&mut self, held: Option<&LedgerLock>) {
        if !std::mem::take(&mut self.armed) {
            return;
        }
        let (Some(root), Some(name)) = (self.path.parent(), self.path.file_name()) else {
            return;
        };
        let name = name.to_string_lossy();

        let _acquired = match held {
            Some(_) => None,
            None => match LedgerLock::try_acquire(&LockInfo::lock_path(root), None) {
                Ok(Some(lock)) => Some(lock),
                Ok(None) => {
                    tracing::info!(
                        "ledger busy, leaving unrecorded artifact {} for prune",
                        self.path.display()
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        "cannot lock ledger to remove {}: {}",
                        self.path.display(),
                        e
                    );
                    return;
                }
            },
        };

        match Ledger::in_dir(root, CorruptLedgerPolicy::FailClosed).load() {
            Ok(document) if document.is_referenced(&name) => {
                tracing::debug!("artifact {} recorded by another slot, keeping", name);
            }
            Ok(_) => remove(&self.path),
            // A ledger that does not load references nothing.
            Err(e) => {
                tracing::debug!("ledger unreadable ({}), removing {}", e, name);
                remove(&self.path);
            }
        }
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        self.reclaim(None);
    }
}

fn remove(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => tracing::info!("removed unrecorded artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            "failed to remove unrecorded artifact {}: {}",
            path.display(),
            e
        ),
    }
}
