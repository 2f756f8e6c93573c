// ABOUTME: Result of a finished deploy and the response payload handed to callers.
// ABOUTME: Maps success and failure onto the message/output_directory/checksum contract.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::diagnostics::Warning;
use crate::route::RouteOutcome;
use crate::types::{DeploymentId, Fingerprint};
use crate::vcs::SyncReport;

use super::DeployError;

pub const SUCCESS_MESSAGE: &str = "File processed successfully";

/// What a successful deploy did.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub deployment: DeploymentId,
    pub fingerprint: Fingerprint,
    pub output_directory: PathBuf,
    pub sync: SyncReport,
    /// Superseded artifact that was deleted.
    pub reclaimed: Option<Fingerprint>,
    /// Proxy outcome, when a proxy is configured and reachable.
    pub route: Option<RouteOutcome>,
    pub warnings: Vec<Warning>,
}

/// Payload returned to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeployResponse {
    Success {
        message: String,
        output_directory: String,
        checksum: String,
    },
    Failure {
        error: String,
        #[serde(skip)]
        status: u16,
    },
}

impl DeployResponse {
    pub fn status_code(&self) -> u16 {
        match self {
            DeployResponse::Success { .. } => 200,
            DeployResponse::Failure { status, .. } => *status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeployResponse::Success { .. })
    }
}

impl From<&DeployReport> for DeployResponse {
    fn from(report: &DeployReport) -> Self {
        DeployResponse::Success {
            message: SUCCESS_MESSAGE.to_string(),
            output_directory: report.output_directory.display().to_string(),
            checksum: report.fingerprint.to_string(),
        }
    }
}

impl From<&DeployError> for DeployResponse {
    fn from(err: &DeployError) -> Self {
        let error = match err {
            DeployError::InvalidArchive => err.to_string(),
            _ => format!("Error processing file: {err}"),
        };
        DeployResponse::Failure {
            error,
            status: err.status_code(),
        }
    }
}

impl From<&Result<DeployReport, DeployError>> for DeployResponse {
    fn from(result: &Result<DeployReport, DeployError>) -> Self {
        match result {
            Ok(report) => report.into(),
            Err(err) => err.into(),
        }
    }
}
