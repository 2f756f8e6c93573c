// ABOUTME: Deployment state types for the type state pattern.
// ABOUTME: Each state owns exactly the resources valid at that step of a deploy.

use std::path::PathBuf;

use crate::ledger::LedgerLock;
use crate::types::Fingerprint;
use crate::vcs::SyncReport;

use super::guard::ArtifactGuard;
use super::upload::Upload;

/// Upload buffered to a temporary file.
/// Available actions: `identify()`
#[derive(Debug)]
pub struct Received {
    pub(crate) upload: Upload,
}

/// Fingerprint known, nothing extracted yet.
/// Available actions: `install()`
#[derive(Debug)]
pub struct Identified {
    pub(crate) upload: Upload,
    pub(crate) fingerprint: Fingerprint,
}

/// Artifact directory present on disk.
/// Available actions: `lock()`
#[derive(Debug)]
pub struct Installed {
    pub(crate) upload: Upload,
    pub(crate) fingerprint: Fingerprint,
    pub(crate) artifact: ArtifactGuard,
}

/// Ledger lock held.
/// Available actions: `update_ledger()`
#[derive(Debug)]
pub struct LedgerLocked {
    pub(crate) upload: Upload,
    pub(crate) fingerprint: Fingerprint,
    /// Declared before `artifact`: fields drop in order, and the guard can only
    /// clean up once the lock is free again.
    pub(crate) lock: LedgerLock,
    pub(crate) artifact: ArtifactGuard,
}

/// Ledger saved with the new fingerprint; the artifact now belongs to the slot.
/// Available actions: `sync()`
#[derive(Debug)]
pub struct LedgerUpdated {
    pub(crate) fingerprint: Fingerprint,
    pub(crate) output_directory: PathBuf,
    pub(crate) lock: LedgerLock,
    /// Superseded artifact no other slot references.
    pub(crate) reclaimable: Option<Fingerprint>,
}

/// Ledger recorded in version control.
/// Available actions: `clean_up()`
#[derive(Debug)]
pub struct Synced {
    pub(crate) fingerprint: Fingerprint,
    pub(crate) output_directory: PathBuf,
    pub(crate) lock: LedgerLock,
    pub(crate) reclaimable: Option<Fingerprint>,
    pub(crate) sync: SyncReport,
}

/// Superseded artifact collected and lock released.
/// Available actions: `finish()`
#[derive(Debug)]
pub struct CleanedUp {
    pub(crate) fingerprint: Fingerprint,
    pub(crate) output_directory: PathBuf,
    pub(crate) sync: SyncReport,
    pub(crate) reclaimed: Option<Fingerprint>,
}
