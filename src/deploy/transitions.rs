// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::content;
use crate::diagnostics::{Diagnostics, Warning};
use crate::ledger::{LEDGER_FILENAME, Ledger, LedgerDocument, LedgerLock};
use crate::store::ArtifactStore;
use crate::types::{DeploymentId, Fingerprint};
use crate::vcs::{self, VersionControl};

use super::Deployment;
use super::error::DeployError;
use super::guard::ArtifactGuard;
use super::report::DeployReport;
use super::upload::Upload;
use super::state::{CleanedUp, Identified, Installed, LedgerLocked, LedgerUpdated, Received, Synced};

/// Extract `archive` into the store on the blocking pool.
///
/// The guard is built inside the blocking task, so an install that finishes after
/// the deploy was cancelled still cleans up behind itself.
async fn install_blocking(
    store: &ArtifactStore,
    fingerprint: &Fingerprint,
    archive: &Path,
) -> Result<ArtifactGuard, DeployError> {
    let store = store.clone();
    let fingerprint = fingerprint.clone();
    let archive: PathBuf = archive.to_path_buf();
    let guard = tokio::task::spawn_blocking(move || {
        store
            .install(&fingerprint, &archive)
            .map(|installation| ArtifactGuard::new(&installation))
    })
    .await??;
    Ok(guard)
}

// =============================================================================
// Received -> Identified
// =============================================================================

impl Deployment<Received> {
    /// Fingerprint the upload. Nothing is extracted before its identity is known.
    #[must_use = "deployment state must be used"]
    pub async fn identify(self) -> Result<Deployment<Identified>, DeployError> {
        let fingerprint = content::fingerprint_file(self.state.upload.path())
            .await
            .map_err(DeployError::Fingerprint)?;
        tracing::debug!("upload for {} is {}", self.slot, fingerprint);

        Ok(Deployment {
            slot: self.slot,
            state: Identified {
                upload: self.state.upload,
                fingerprint,
            },
        })
    }
}

// =============================================================================
// Identified -> Installed
// =============================================================================

impl Deployment<Identified> {
    /// Make sure the artifact directory for this fingerprint exists.
    #[must_use = "deployment state must be used"]
    pub async fn install(self, store: &ArtifactStore) -> Result<Deployment<Installed>, DeployError> {
        let artifact =
            install_blocking(store, &self.state.fingerprint, self.state.upload.path()).await?;

        Ok(Deployment {
            slot: self.slot,
            state: Installed {
                upload: self.state.upload,
                fingerprint: self.state.fingerprint,
                artifact,
            },
        })
    }
}

// =============================================================================
// Installed -> LedgerLocked
// =============================================================================

impl Deployment<Installed> {
    /// Wait for the ledger lock.
    ///
    /// On timeout the deployment is dropped and the ledger is never touched. An
    /// artifact this deploy created is removed only if the lock comes free and no
    /// slot has recorded it meanwhile; otherwise `prune` collects it.
    #[must_use = "deployment state must be used"]
    pub async fn lock(
        self,
        lock_path: &Path,
        timeout: Duration,
    ) -> Result<Deployment<LedgerLocked>, DeployError> {
        let lock = LedgerLock::acquire(lock_path, timeout, Some(self.slot.as_str())).await?;

        Ok(Deployment {
            slot: self.slot,
            state: LedgerLocked {
                upload: self.state.upload,
                fingerprint: self.state.fingerprint,
                lock,
                artifact: self.state.artifact,
            },
        })
    }
}

// =============================================================================
// LedgerLocked -> LedgerUpdated
// =============================================================================

impl Deployment<LedgerLocked> {
    /// Point the slot at the new artifact and save the ledger.
    #[must_use = "deployment state must be used"]
    pub async fn update_ledger(
        self,
        ledger: &Ledger,
        store: &ArtifactStore,
        diag: &mut Diagnostics,
    ) -> Result<Deployment<LedgerUpdated>, DeployError> {
        let LedgerLocked {
            upload,
            fingerprint,
            mut artifact,
            lock,
        } = self.state;

        let recorded = record(
            &self.slot,
            &fingerprint,
            &upload,
            &mut artifact,
            ledger,
            store,
            &lock,
            diag,
        )
        .await;
        let (document, previous) = match recorded {
            Ok(recorded) => recorded,
            Err(e) => {
                artifact.discard(&lock);
                return Err(e);
            }
        };

        let reclaimable = match previous {
            Some(prev) if prev == fingerprint.as_str() => None,
            Some(prev) if document.is_referenced(&prev) => {
                tracing::debug!("previous artifact {} still referenced, keeping", prev);
                None
            }
            Some(prev) => match Fingerprint::parse(&prev) {
                Ok(fp) => Some(fp),
                Err(e) => {
                    tracing::warn!("not collecting previous checksum {:?}: {}", prev, e);
                    None
                }
            },
            None => None,
        };

        let output_directory = artifact.disarm();
        drop(upload);

        Ok(Deployment {
            slot: self.slot,
            state: LedgerUpdated {
                fingerprint,
                output_directory,
                lock,
                reclaimable,
            },
        })
    }
}

/// Verify the artifact, then upsert the slot and save the ledger.
///
/// A concurrent deploy may have collected a shared artifact between our install
/// and taking the lock, in which case it is installed again from the upload.
#[allow(clippy::too_many_arguments)]
async fn record(
    slot: &DeploymentId,
    fingerprint: &Fingerprint,
    upload: &Upload,
    artifact: &mut ArtifactGuard,
    ledger: &Ledger,
    store: &ArtifactStore,
    lock: &LedgerLock,
    diag: &mut Diagnostics,
) -> Result<(LedgerDocument, Option<String>), DeployError> {
    if !store.exists(fingerprint) {
        tracing::info!("artifact {} vanished before lock, reinstalling", fingerprint.short());
        let reinstalled = install_blocking(store, fingerprint, upload.path()).await?;
        std::mem::replace(artifact, reinstalled).disarm();
    }

    let (mut document, reset) = ledger.load_detailed()?;
    if let Some(reason) = reset {
        diag.warn(Warning::ledger_reset(format!(
            "ledger {} was unreadable and has been reset: {}",
            ledger.path().display(),
            reason
        )));
    }

    let previous = document.upsert(slot, fingerprint);
    ledger.save(&document, lock)?;
    tracing::info!("slot {} now at {}", slot, fingerprint.short());
    Ok((document, previous))
}

// =============================================================================
// LedgerUpdated -> Synced
// =============================================================================

impl Deployment<LedgerUpdated> {
    /// Record the ledger in version control.
    ///
    /// On failure the lock is released but the artifact and the local ledger write
    /// stay; the superseded artifact is not collected.
    #[must_use = "deployment state must be used"]
    pub async fn sync<V: VersionControl + ?Sized>(
        self,
        vcs: &V,
    ) -> Result<Deployment<Synced>, DeployError> {
        let message = vcs::commit_message(&self.slot, &self.state.fingerprint);
        let sync = vcs::sync_ledger(vcs, Path::new(LEDGER_FILENAME), &message).await?;

        Ok(Deployment {
            slot: self.slot,
            state: Synced {
                fingerprint: self.state.fingerprint,
                output_directory: self.state.output_directory,
                lock: self.state.lock,
                reclaimable: self.state.reclaimable,
                sync,
            },
        })
    }
}

// =============================================================================
// Synced -> CleanedUp
// =============================================================================

impl Deployment<Synced> {
    /// Delete the superseded artifact, then release the lock.
    ///
    /// Collection runs under the lock so it cannot race a deploy that is verifying
    /// the same artifact. Removal failures become warnings.
    pub fn clean_up(self, store: &ArtifactStore, diag: &mut Diagnostics) -> Deployment<CleanedUp> {
        let Synced {
            fingerprint,
            output_directory,
            lock,
            reclaimable,
            sync,
        } = self.state;

        let reclaimed = reclaimable.and_then(|old| match store.remove(&old) {
            Ok(true) => {
                tracing::info!("removed superseded artifact {}", old.short());
                Some(old)
            }
            Ok(false) => {
                tracing::debug!("superseded artifact {} already gone", old.short());
                None
            }
            Err(e) => {
                diag.warn(Warning::artifact_removal(format!(
                    "could not remove superseded artifact {old}: {e}"
                )));
                None
            }
        });

        lock.release();

        Deployment {
            slot: self.slot,
            state: CleanedUp {
                fingerprint,
                output_directory,
                sync,
                reclaimed,
            },
        }
    }
}

// =============================================================================
// CleanedUp -> report
// =============================================================================

impl Deployment<CleanedUp> {
    /// Complete the deployment.
    pub fn finish(self, diag: Diagnostics) -> DeployReport {
        DeployReport {
            deployment: self.slot,
            fingerprint: self.state.fingerprint,
            output_directory: self.state.output_directory,
            sync: self.state.sync,
            reclaimed: self.state.reclaimed,
            route: None,
            warnings: diag.into_warnings(),
        }
    }
}
