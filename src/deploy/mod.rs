// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports the state types, the Deployer, and the report and response payloads.

mod deployment;
mod error;
mod guard;
mod orchestrator;
mod report;
mod state;
mod transitions;
mod upload;

pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind};
pub use orchestrator::{Deployer, GitDeployer, PruneReport, SlotStatus};
pub use report::{DeployReport, DeployResponse, SUCCESS_MESSAGE};
pub use state::{CleanedUp, Identified, Installed, LedgerLocked, LedgerUpdated, Received, Synced};
pub use upload::Upload;
