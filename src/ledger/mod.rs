// ABOUTME: The git-tracked ledger file recording which artifact each slot runs.
// ABOUTME: Load with an explicit corrupt-file policy, save atomically under the ledger lock.

mod document;
mod error;
mod lock;

pub use document::{LedgerDocument, SlotRecord};
pub use error::{LedgerError, LockError};
pub use lock::{LOCK_FILENAME, LedgerLock, LockInfo};

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Ledger file name inside the gitops directory.
pub const LEDGER_FILENAME: &str = "bitswan.yaml";

/// What to do when the ledger exists but cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorruptLedgerPolicy {
    /// Treat the file as empty. Every existing slot record is lost on the next save.
    ResetToEmpty,
    /// Refuse to continue.
    #[default]
    FailClosed,
}

/// Handle to the ledger file of one gitops directory.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    policy: CorruptLedgerPolicy,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>, policy: CorruptLedgerPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    /// The ledger of a gitops directory.
    pub fn in_dir(gitops_dir: &Path, policy: CorruptLedgerPolicy) -> Self {
        Self::new(gitops_dir.join(LEDGER_FILENAME), policy)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> CorruptLedgerPolicy {
        self.policy
    }

    /// Read the ledger. A missing or blank file is an empty document.
    pub fn load(&self) -> Result<LedgerDocument, LedgerError> {
        self.load_detailed().map(|(document, _)| document)
    }

    /// Read the ledger, also returning the parse error when the corrupt-file
    /// policy replaced the contents with an empty document.
    pub fn load_detailed(&self) -> Result<(LedgerDocument, Option<String>), LedgerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no ledger at {}, starting empty", self.path.display());
                return Ok((LedgerDocument::default(), None));
            }
            Err(source) => {
                return Err(LedgerError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok((LedgerDocument::default(), None));
        }

        match serde_yaml::from_str::<Option<LedgerDocument>>(&content) {
            Ok(document) => Ok((document.unwrap_or_default(), None)),
            Err(e) => match self.policy {
                CorruptLedgerPolicy::ResetToEmpty => {
                    tracing::warn!(
                        "ledger {} does not parse ({}), resetting to empty",
                        self.path.display(),
                        e
                    );
                    Ok((LedgerDocument::default(), Some(e.to_string())))
                }
                CorruptLedgerPolicy::FailClosed => Err(LedgerError::Corrupt {
                    path: self.path.clone(),
                    message: e.to_string(),
                }),
            },
        }
    }

    /// Replace the ledger file with `document`.
    ///
    /// Writes a temporary file beside the ledger and renames it over the old one,
    /// so readers see either the previous or the new document. The lock guard is
    /// proof that the caller is the only writer.
    pub fn save(&self, document: &LedgerDocument, lock: &LedgerLock) -> Result<(), LedgerError> {
        debug_assert_eq!(
            lock.path().parent(),
            self.path.parent(),
            "ledger saved under a lock for a different directory"
        );

        let yaml = serde_yaml::to_string(document)?;
        let write_err = |source| LedgerError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".bitswan.yaml.")
            .tempfile_in(dir)
            .map_err(write_err)?;
        temp.write_all(yaml.as_bytes()).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&self.path)
            .map_err(|e| write_err(e.error))?;

        tracing::debug!(
            "saved ledger {} ({} slot(s))",
            self.path.display(),
            document.deployments.len()
        );
        Ok(())
    }
}
