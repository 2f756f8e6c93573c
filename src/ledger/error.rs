// ABOUTME: Error types for the ledger and its lock.
// ABOUTME: Distinguishes unreadable, corrupt and unwritable ledgers from lock timeouts.

use std::path::PathBuf;
use std::time::Duration;

use super::lock::LockInfo;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read ledger {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The ledger exists but does not parse, and the policy is to fail closed.
    #[error("ledger {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("failed to serialize ledger: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("failed to write ledger {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another process kept the lock for the whole wait.
    #[error("{}", timeout_message(.timeout, .holder.as_ref()))]
    Timeout {
        timeout: Duration,
        holder: Option<LockInfo>,
    },

    #[error("failed to lock {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn timeout_message(timeout: &Duration, holder: Option<&LockInfo>) -> String {
    match holder {
        Some(info) => format!(
            "timed out after {:?} waiting for ledger lock held by {} (pid {}) since {}",
            timeout, info.holder, info.pid, info.started_at
        ),
        None => format!("timed out after {timeout:?} waiting for ledger lock"),
    }
}
