// ABOUTME: Cross-process ledger lock guarding the ledger file and its git working tree.
// ABOUTME: Advisory file lock with bounded wait; holder info is written into the lock file.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::LockError;

/// Lock file name inside the gitops directory.
pub const LOCK_FILENAME: &str = "bitswan_git.lock";

/// How often a waiting process retries the lock.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Information about who holds the ledger lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Deployment slot being updated, if known.
    #[serde(default)]
    pub deployment: Option<String>,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(deployment: Option<&str>) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            deployment: deployment.map(str::to_string),
        }
    }

    /// Path to the lock file for a gitops directory.
    pub fn lock_path(gitops_dir: &Path) -> PathBuf {
        gitops_dir.join(LOCK_FILENAME)
    }

    /// Read holder info from a lock file, if it has any.
    pub fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(content.trim()).ok()
    }
}

/// A held ledger lock. Released when dropped.
///
/// The lock file itself is left in place: deleting it would let a waiter lock an
/// unlinked inode while a newcomer locks a fresh file at the same path.
pub struct LedgerLock {
    file: File,
    path: PathBuf,
}

impl std::fmt::Debug for LedgerLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerLock")
            .field("path", &self.path)
            .finish()
    }
}

impl LedgerLock {
    /// Acquire the lock at `path`, waiting at most `timeout`.
    ///
    /// Returns `LockError::Timeout` with the current holder's info when the lock
    /// stays held for the whole wait.
    pub async fn acquire(
        path: &Path,
        timeout: Duration,
        deployment: Option<&str>,
    ) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(lock) = Self::try_acquire(path, deployment)? {
                return Ok(lock);
            }

            let now = Instant::now();
            if now >= deadline {
                let holder = LockInfo::read(path);
                tracing::warn!(
                    "gave up on ledger lock {} after {:?}",
                    path.display(),
                    timeout
                );
                return Err(LockError::Timeout { timeout, holder });
            }

            tracing::debug!("ledger lock {} busy, retrying", path.display());
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Try to take the lock without waiting. `Ok(None)` means another holder has it.
    pub fn try_acquire(path: &Path, deployment: Option<&str>) -> Result<Option<Self>, LockError> {
        let io_err = |source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        // No truncate on open: the current holder's info must stay readable.
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(io_err)?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if is_contended(&e) => return Ok(None),
            Err(e) => return Err(io_err(e)),
        }

        let mut lock = Self {
            file,
            path: path.to_path_buf(),
        };
        if let Err(e) = lock.write_info(&LockInfo::new(deployment)) {
            // Holder info is diagnostic only.
            tracing::debug!("could not record lock holder: {}", e);
        }
        tracing::debug!("acquired ledger lock {}", path.display());
        Ok(Some(lock))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly.
    pub fn release(self) {
        drop(self);
    }

    fn write_info(&mut self, info: &LockInfo) -> io::Result<()> {
        let json = serde_json::to_string(info).map_err(io::Error::other)?;
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        writeln!(self.file, "{json}")?;
        self.file.flush()
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("failed to unlock {}: {}", self.path.display(), e);
        } else {
            tracing::debug!("released ledger lock {}", self.path.display());
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
