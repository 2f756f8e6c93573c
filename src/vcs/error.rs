// ABOUTME: Version control error types with SNAFU pattern.
// ABOUTME: Separates commands that could not be started from commands that exited non-zero.

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SyncError {
    #[snafu(display("failed to run `git {command}`: {source}"))]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("`git {command}` exited with {status}: {detail}"))]
    CommandFailed {
        command: String,
        status: String,
        detail: String,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// The git binary (or nsenter) could not be executed, or its arguments
    /// could not be quoted for the host shell.
    Unavailable,
    /// A git command ran and failed.
    CommandFailed,
}

impl SyncError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Spawn { .. } => SyncErrorKind::Unavailable,
            SyncError::CommandFailed { .. } => SyncErrorKind::CommandFailed,
        }
    }
}
