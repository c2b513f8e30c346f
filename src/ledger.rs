//! Append-only history of the releases known for one module, persisted as the module's
//! `update.json` (`{"versions": [...], "timestamp": <epoch seconds>}`).

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PersistenceError;
use crate::store;

/// One recorded release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    #[serde(rename = "timestamp", default)]
    pub discovered_at: f64,
    pub version: String,
    #[serde(rename = "versionCode")]
    pub version_code: i64,
    #[serde(rename = "zipUrl", default)]
    pub artifact_url: String,
    #[serde(rename = "changelog", default)]
    pub changelog_url: String,
    #[serde(rename = "size", default)]
    pub size_bytes: u64,
    /// Keys this tool does not own; carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionLedger {
    #[serde(skip)]
    module_id: String,
    #[serde(rename = "versions", default)]
    entries: Vec<ReleaseEntry>,
    #[serde(rename = "timestamp", default)]
    last_updated: f64,
    /// Keys this tool does not own; carried through rewrites untouched.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl VersionLedger {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            entries: Vec::new(),
            last_updated: store::epoch_seconds(),
            extra: Map::new(),
        }
    }

    /// Loads the ledger at `path`; a missing file yields an empty ledger.
    pub fn load(path: &Path, module_id: &str) -> Result<Self, PersistenceError> {
        match store::read_json::<VersionLedger>(path)? {
            Some(mut ledger) => {
                ledger.module_id = module_id.to_string();
                Ok(ledger)
            }
            None => Ok(Self::new(module_id)),
        }
    }

    /// Rewrites the whole ledger file.
    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        store::write_json(path, self)
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn entries(&self) -> &[ReleaseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_updated(&self) -> f64 {
        self.last_updated
    }

    /// Membership by `version` only; version codes are not compared.
    pub fn contains_version(&self, version: &str) -> bool {
        self.entries.iter().any(|entry| entry.version == version)
    }

    /// Appends `entry` unless its version is already recorded. Returns whether it was added.
    pub fn append(&mut self, entry: ReleaseEntry) -> bool {
        if self.contains_version(&entry.version) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Version code of the first entry in insertion order.
    pub fn latest_version_code(&self) -> Option<i64> {
        self.entries.first().map(|entry| entry.version_code)
    }

    pub fn touch(&mut self, now: f64) {
        self.last_updated = now;
    }
}
