// ABOUTME: Artifact store keyed by content fingerprint.
// ABOUTME: Installs archives atomically via staging directories, detects and removes artifacts.

mod archive;
mod error;

pub use archive::{ArchiveKind, extract_zip};
pub use error::StoreError;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::types::Fingerprint;

/// Prefix of in-progress extraction directories inside the store root.
pub const STAGING_PREFIX: &str = ".staging-";

/// Outcome of an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// Artifact directory, `<root>/<fingerprint>`.
    pub path: PathBuf,
    /// True when this call populated the directory, false when it already existed.
    pub created: bool,
}

/// On-disk artifact directories under the gitops root.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for an artifact, whether or not it exists yet.
    pub fn artifact_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(fingerprint.as_str())
    }

    pub fn exists(&self, fingerprint: &Fingerprint) -> bool {
        self.artifact_path(fingerprint).is_dir()
    }

    /// Install a ZIP archive as the artifact for `fingerprint`.
    ///
    /// The archive is extracted into a staging directory next to the target and
    /// renamed into place, so an artifact directory that exists is always complete.
    /// Installing a fingerprint that is already present is a no-op, including when a
    /// concurrent install of the same content wins the rename.
    pub fn install(
        &self,
        fingerprint: &Fingerprint,
        archive: &Path,
    ) -> Result<Installation, StoreError> {
        let target = self.artifact_path(fingerprint);

        if target.is_dir() {
            tracing::debug!("artifact {} already installed", fingerprint.short());
            return Ok(Installation {
                path: target,
                created: false,
            });
        }

        fs::create_dir_all(&self.root).map_err(|source| StoreError::Prepare {
            path: self.root.clone(),
            source,
        })?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|source| StoreError::Prepare {
                path: self.root.clone(),
                source,
            })?;

        let files = extract_zip(archive, staging.path())?;
        tracing::debug!(
            "extracted {} file(s) for {} into {}",
            files,
            fingerprint.short(),
            staging.path().display()
        );

        match fs::rename(staging.path(), &target) {
            Ok(()) => {
                tracing::info!("installed artifact {}", target.display());
                Ok(Installation {
                    path: target,
                    created: true,
                })
            }
            // Another upload of identical content published first; ours is dropped.
            Err(_) if target.is_dir() => {
                tracing::debug!("artifact {} installed concurrently", fingerprint.short());
                Ok(Installation {
                    path: target,
                    created: false,
                })
            }
            Err(source) => Err(StoreError::Publish {
                path: target,
                source,
            }),
        }
    }

    /// Remove an artifact directory. Returns false if it did not exist.
    pub fn remove(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        remove_dir(&self.artifact_path(fingerprint))
    }

    /// Fingerprints of all installed artifacts.
    pub fn list(&self) -> Result<Vec<Fingerprint>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::List {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let list_err = |source| StoreError::List {
            path: self.root.clone(),
            source,
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(list_err)?;
            if !entry.file_type().map_err(list_err)?.is_dir() {
                continue;
            }
            if let Some(fingerprint) = entry
                .file_name()
                .to_str()
                .and_then(|name| Fingerprint::parse(name).ok())
            {
                found.push(fingerprint);
            }
        }
        found.sort();
        Ok(found)
    }

    /// Delete staging directories left behind by interrupted installs.
    ///
    /// Installs run without the ledger lock, so only directories untouched for at
    /// least `older_than` are considered abandoned.
    pub fn sweep_staging(&self, older_than: Duration) -> Result<usize, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(StoreError::List {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let is_staging = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(STAGING_PREFIX));
            if !is_staging {
                continue;
            }
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())
                .unwrap_or_default();
            if age < older_than {
                tracing::debug!("keeping recent staging directory {}", entry.path().display());
                continue;
            }
            if remove_dir(&entry.path())? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn remove_dir(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}
