// ABOUTME: Application-wide error types for bitswan-gitops.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::route::RouteError;
use crate::types::DeploymentIdError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    InvalidDeploymentId(#[from] DeploymentIdError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("route registration failed: {0}")]
    Route(#[from] RouteError),

    #[error("no proxy configured; set proxy.url in the config or CADDY_URL")]
    NoProxy,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
