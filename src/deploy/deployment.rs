// ABOUTME: Generic deployment struct parameterized by state.
// ABOUTME: State types carry their own resources so each step can only use what exists.

use std::path::Path;

use crate::types::{DeploymentId, Fingerprint};

use super::state::{CleanedUp, Identified, Installed, LedgerLocked, LedgerUpdated, Received, Synced};
use super::upload::Upload;

/// A deployment in progress, parameterized by its current state.
///
/// Dropping a deployment at any state releases what that state holds: the
/// temporary upload, an artifact the ledger has not recorded yet, the ledger lock.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) slot: DeploymentId,
    pub(crate) state: S,
}

impl Deployment<Received> {
    pub fn new(slot: DeploymentId, upload: Upload) -> Self {
        Deployment {
            slot,
            state: Received { upload },
        }
    }
}

impl<S> Deployment<S> {
    /// Slot being deployed.
    pub fn slot(&self) -> &DeploymentId {
        &self.slot
    }
}

impl Deployment<Identified> {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.state.fingerprint
    }
}

impl Deployment<Installed> {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.state.fingerprint
    }

    pub fn artifact_path(&self) -> &Path {
        self.state.artifact.path()
    }
}

impl Deployment<LedgerLocked> {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.state.fingerprint
    }
}

impl Deployment<LedgerUpdated> {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.state.fingerprint
    }

    /// Previous artifact of the slot that will be collected after sync.
    pub fn reclaimable(&self) -> Option<&Fingerprint> {
        self.state.reclaimable.as_ref()
    }
}

impl Deployment<Synced> {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.state.fingerprint
    }
}

impl Deployment<CleanedUp> {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.state.fingerprint
    }

    pub fn output_directory(&self) -> &Path {
        &self.state.output_directory
    }
}
