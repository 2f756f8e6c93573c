// ABOUTME: The ledger document mapping deployment slots to artifact fingerprints.
// ABOUTME: Preserves fields written by other tools across read-modify-write.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::types::{DeploymentId, Fingerprint};

/// Top-level contents of `bitswan.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub deployments: BTreeMap<String, SlotRecord>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// State of one deployment slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    #[serde(default)]
    pub active: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl LedgerDocument {
    pub fn slot(&self, id: &DeploymentId) -> Option<&SlotRecord> {
        self.deployments.get(id.as_str())
    }

    /// Point `id` at `fingerprint` and mark it active.
    ///
    /// Returns the checksum the slot held before, which is the handle for
    /// collecting the superseded artifact.
    pub fn upsert(&mut self, id: &DeploymentId, fingerprint: &Fingerprint) -> Option<String> {
        let record = self.deployments.entry(id.to_string()).or_default();
        let previous = record.checksum.replace(fingerprint.to_string());
        record.active = true;
        previous
    }

    /// Whether any slot, active or not, still points at `checksum`.
    pub fn is_referenced(&self, checksum: &str) -> bool {
        self.deployments
            .values()
            .any(|record| record.checksum.as_deref() == Some(checksum))
    }
}

fn deserialize_nullable<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, SlotRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}
