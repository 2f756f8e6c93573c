// ABOUTME: Error types for deployment operations.
// ABOUTME: Groups input, storage, locking, ledger and git failures into caller-facing kinds.

use crate::ledger::{LedgerError, LockError, LockInfo};
use crate::store::StoreError;
use crate::types::DeploymentIdError;
use crate::vcs::SyncError;

/// Errors that can occur during deployment state transitions.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The upload is not a ZIP archive.
    #[error("File must be a ZIP archive")]
    InvalidArchive,

    #[error("invalid deployment id: {0}")]
    InvalidDeploymentId(#[from] DeploymentIdError),

    /// The upload could not be buffered to a temporary file.
    #[error("failed to receive upload: {0}")]
    Upload(std::io::Error),

    #[error("failed to fingerprint upload: {0}")]
    Fingerprint(std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("git sync failed: {0}")]
    Sync(#[from] SyncError),

    /// A blocking worker panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Bad request; nothing was written.
    Input,
    /// Upload, fingerprint or extraction failure.
    Storage,
    /// The ledger lock stayed held for the whole wait; the ledger is untouched.
    LockTimeout,
    /// The ledger could not be read, parsed or written.
    Ledger,
    /// Pull, commit or push failed; the local ledger write stands.
    GitSync,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::InvalidArchive
            | DeployError::InvalidDeploymentId(_)
            | DeployError::Store(StoreError::UnsupportedArchive(_))
            | DeployError::Store(StoreError::UnsafeEntry(_)) => DeployErrorKind::Input,
            DeployError::Upload(_)
            | DeployError::Fingerprint(_)
            | DeployError::Store(_)
            | DeployError::Task(_) => DeployErrorKind::Storage,
            DeployError::Lock(LockError::Timeout { .. }) => DeployErrorKind::LockTimeout,
            DeployError::Lock(LockError::Io { .. }) | DeployError::Ledger(_) => {
                DeployErrorKind::Ledger
            }
            DeployError::Sync(_) => DeployErrorKind::GitSync,
        }
    }

    /// Who held the ledger lock, for timeouts.
    pub fn lock_holder_info(&self) -> Option<&LockInfo> {
        match self {
            DeployError::Lock(LockError::Timeout { holder, .. }) => holder.as_ref(),
            _ => None,
        }
    }

    /// HTTP-style status for the response payload.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            DeployErrorKind::Input => 400,
            _ => 200,
        }
    }
}

impl From<tokio::task::JoinError> for DeployError {
    fn from(err: tokio::task::JoinError) -> Self {
        DeployError::Task(err.to_string())
    }
}
