// ABOUTME: Host execution settings for running git outside the container.
// ABOUTME: Used when the gitops checkout and its credentials live on the host.

use serde::Deserialize;
use std::path::PathBuf;

/// How to reach the host's git checkout through `nsenter`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostExecConfig {
    /// The gitops directory as seen from the host.
    pub dir: PathBuf,
    /// `PATH` for the host user's shell.
    pub path: String,
    /// `HOME` for the host user's shell.
    pub home: String,
    /// Host user that owns the checkout.
    pub user: String,
}
