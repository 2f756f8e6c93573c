// ABOUTME: Version control synchronizer for the ledger.
// ABOUTME: Pulls, commits and pushes the ledger file while the ledger lock is held.

mod error;
mod git;
mod runner;

pub use error::{SyncError, SyncErrorKind};
pub use git::{CommitAuthor, Git};
pub use runner::{CommandOutput, CommandRunner, HostNamespaceRunner, LocalRunner, runner_for};

use async_trait::async_trait;
use std::path::Path;

use crate::types::{DeploymentId, Fingerprint};

/// Result of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The staged ledger matched HEAD, e.g. identical content redeployed.
    NothingToCommit,
}

/// Narrow interface over the repository holding the ledger.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Whether a remote is configured.
    async fn has_remote(&self) -> Result<bool, SyncError>;

    async fn pull(&self) -> Result<(), SyncError>;

    /// Stage a path relative to the working tree.
    async fn stage(&self, path: &Path) -> Result<(), SyncError>;

    async fn commit(&self, message: &str) -> Result<CommitOutcome, SyncError>;

    async fn push(&self) -> Result<(), SyncError>;
}

#[async_trait]
impl<V: VersionControl + ?Sized> VersionControl for Box<V> {
    async fn has_remote(&self) -> Result<bool, SyncError> {
        (**self).has_remote().await
    }

    async fn pull(&self) -> Result<(), SyncError> {
        (**self).pull().await
    }

    async fn stage(&self, path: &Path) -> Result<(), SyncError> {
        (**self).stage(path).await
    }

    async fn commit(&self, message: &str) -> Result<CommitOutcome, SyncError> {
        (**self).commit(message).await
    }

    async fn push(&self) -> Result<(), SyncError> {
        (**self).push().await
    }
}

/// What a sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub remote: bool,
    pub commit: CommitOutcome,
}

/// Commit message for a slot update.
pub fn commit_message(deployment: &DeploymentId, fingerprint: &Fingerprint) -> String {
    format!("Update deployment {deployment} with checksum {fingerprint}")
}

/// Record the ledger file in version control.
///
/// Pull and push only happen when a remote exists; either failing aborts the sync
/// so the ledger is never committed over stale state. Must run under the ledger lock.
pub async fn sync_ledger<V: VersionControl + ?Sized>(
    vcs: &V,
    ledger_file: &Path,
    message: &str,
) -> Result<SyncReport, SyncError> {
    let remote = vcs.has_remote().await?;

    if remote {
        tracing::debug!("pulling ledger repository");
        vcs.pull().await?;
    }

    vcs.stage(ledger_file).await?;
    let commit = vcs.commit(message).await?;

    if remote {
        tracing::debug!("pushing ledger repository");
        vcs.push().await?;
    }

    tracing::info!("ledger synced (remote: {}, commit: {:?})", remote, commit);
    Ok(SyncReport { remote, commit })
}
