// ABOUTME: Validated domain types shared by every component.
// ABOUTME: Deployment slot ids and artifact content fingerprints.

mod deployment_id;
mod fingerprint;

pub use deployment_id::{DeploymentId, DeploymentIdError};
pub use fingerprint::{FINGERPRINT_LEN, Fingerprint, FingerprintError};
