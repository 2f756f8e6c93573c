// ABOUTME: Git implementation of the version control synchronizer.
// ABOUTME: Maps git invocations and their exit codes onto SyncError results.

use async_trait::async_trait;
use snafu::ResultExt;
use std::path::Path;

use super::error::{CommandFailedSnafu, SpawnSnafu, SyncError};
use super::runner::{CommandOutput, CommandRunner};
use super::{CommitOutcome, VersionControl};

/// Identity recorded as author and committer of ledger commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for CommitAuthor {
    fn default() -> Self {
        Self {
            name: "gitops".to_string(),
            email: "info@bitswan.space".to_string(),
        }
    }
}

impl std::fmt::Display for CommitAuthor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Git working tree driven through a command runner.
#[derive(Debug)]
pub struct Git<R> {
    runner: R,
    author: CommitAuthor,
    remote: String,
}

impl<R: CommandRunner> Git<R> {
    pub fn new(runner: R, author: CommitAuthor) -> Self {
        Self {
            runner,
            author,
            remote: "origin".to_string(),
        }
    }

    /// Name of the remote to check for (default `origin`).
    pub fn remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn git(&self, args: &[&str]) -> Result<CommandOutput, SyncError> {
        let command = subcommand(args).to_string();
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner
            .run("git", &args)
            .await
            .context(SpawnSnafu { command })
    }

    async fn git_checked(&self, args: &[&str]) -> Result<CommandOutput, SyncError> {
        let output = self.git(args).await?;
        if output.success() {
            return Ok(output);
        }
        CommandFailedSnafu {
            command: args.join(" "),
            status: output.status_label(),
            detail: output.detail(),
        }
        .fail()
    }
}

#[async_trait]
impl<R: CommandRunner> VersionControl for Git<R> {
    async fn has_remote(&self) -> Result<bool, SyncError> {
        let output = self.git(&["remote", "get-url", self.remote.as_str()]).await?;
        Ok(output.success())
    }

    async fn pull(&self) -> Result<(), SyncError> {
        self.git_checked(&["pull"]).await.map(|_| ())
    }

    async fn stage(&self, path: &Path) -> Result<(), SyncError> {
        let path = path.to_string_lossy();
        self.git_checked(&["add", "--", &*path]).await.map(|_| ())
    }

    async fn commit(&self, message: &str) -> Result<CommitOutcome, SyncError> {
        let user_name = format!("user.name={}", self.author.name);
        let user_email = format!("user.email={}", self.author.email);
        let author = self.author.to_string();
        let args: [&str; 9] = [
            "-c",
            user_name.as_str(),
            "-c",
            user_email.as_str(),
            "commit",
            "--author",
            author.as_str(),
            "-m",
            message,
        ];

        let output = self.git(&args).await?;
        if output.success() {
            return Ok(CommitOutcome::Committed);
        }
        if is_nothing_to_commit(&output) {
            tracing::debug!("ledger unchanged, nothing to commit");
            return Ok(CommitOutcome::NothingToCommit);
        }
        CommandFailedSnafu {
            command: "commit".to_string(),
            status: output.status_label(),
            detail: output.detail(),
        }
        .fail()
    }

    async fn push(&self) -> Result<(), SyncError> {
        self.git_checked(&["push"]).await.map(|_| ())
    }
}

/// The git subcommand, skipping leading `-c key=value` options.
fn subcommand<'a>(args: &[&'a str]) -> &'a str {
    let mut rest = args;
    while let ["-c", _, tail @ ..] = rest {
        rest = tail;
    }
    rest.first().copied().unwrap_or_default()
}

fn is_nothing_to_commit(output: &CommandOutput) -> bool {
    ["nothing to commit", "no changes added to commit", "nothing added to commit"]
        .iter()
        .any(|needle| output.stdout.contains(needle) || output.stderr.contains(needle))
}
