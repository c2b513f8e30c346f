//! Per-module reconciliation: compares the module's ledger with its upstream update
//! descriptor, merges new releases and stores the newest artifact.
//!
//! A run walks `FETCH_LOCAL → FETCH_REMOTE → COMPARE → (NO_OP | MERGE_AND_DOWNLOAD)`:
//!
//! - **FETCH_LOCAL**: read `update_to` from the module's `track.json` and load `update.json`
//!   (absent ledger = empty ledger).
//! - **FETCH_REMOTE**: fetch and parse the descriptor; failure aborts with the ledger untouched.
//! - **COMPARE**: remote latest code ≤ local latest code ends the run with no side effects.
//! - **MERGE_AND_DOWNLOAD**: append every unknown version with canonical URLs and the probed
//!   upstream size, rewrite the ledger, then download the newest merged artifact and,
//!   best-effort, its changelog.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::contract::Fetcher;
use crate::descriptor::{RemoteDescriptor, RemoteRelease};
use crate::error::{ConfigError, ReconcileError};
use crate::ledger::{ReleaseEntry, VersionLedger};
use crate::locator::{self, ArtifactLocator};
use crate::store;

pub const LEDGER_FILE: &str = "update.json";
pub const TRACK_FILE: &str = "track.json";

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The remote latest version code is not newer than the local one.
    UpToDate { local_version_code: i64 },
    /// The remote reported a newer code, but every remote version is already recorded.
    NothingNew,
    /// New versions were appended and the newest one was downloaded.
    Updated {
        appended: Vec<String>,
        version: String,
        version_code: i64,
        artifact: PathBuf,
    },
}

impl ReconcileOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, ReconcileOutcome::Updated { .. })
    }
}

pub struct ReconciliationEngine<'a, F: ?Sized> {
    fetcher: &'a F,
    locator: ArtifactLocator,
}

impl<'a, F> ReconciliationEngine<'a, F>
where
    F: Fetcher + ?Sized,
{
    pub fn new(fetcher: &'a F, locator: ArtifactLocator) -> Self {
        Self { fetcher, locator }
    }

    pub async fn reconcile(&self, module_dir: &Path) -> Result<ReconcileOutcome, ReconcileError> {
        let module_id = module_id_of(module_dir)?;
        info!(module_id = %module_id, path = %module_dir.display(), "[FIX] Starting reconciliation");

        // FETCH_LOCAL
        let update_to = read_update_source(&module_dir.join(TRACK_FILE))?;
        let ledger_path = module_dir.join(LEDGER_FILE);
        let mut ledger = VersionLedger::load(&ledger_path, &module_id)?;

        // FETCH_REMOTE
        let remote = self.fetch_remote(&module_id, &update_to).await?;

        // COMPARE
        if remote.releases().is_empty() {
            error!(module_id = %module_id, url = %update_to, "[FIX][ERROR] Remote descriptor lists no releases");
            return Err(ReconcileError::NoReleases(update_to));
        }
        let Some(remote_code) = remote.latest_version_code() else {
            error!(module_id = %module_id, url = %update_to, "[FIX][ERROR] Failed to get remote version code");
            return Err(ReconcileError::MissingVersionCode(update_to));
        };
        if let Some(local_code) = ledger.latest_version_code() {
            if remote_code <= local_code {
                info!(
                    module_id = %module_id,
                    local_version_code = local_code,
                    remote_version_code = remote_code,
                    "[FIX] Local version is already up to date"
                );
                return Ok(ReconcileOutcome::UpToDate {
                    local_version_code: local_code,
                });
            }
        }

        // MERGE_AND_DOWNLOAD
        let merged = self.merge(&module_id, &mut ledger, remote.releases()).await;
        let Some(newest) = merged.first().copied() else {
            info!(module_id = %module_id, "[FIX] Every remote version is already recorded");
            return Ok(ReconcileOutcome::NothingNew);
        };
        ledger.touch(store::epoch_seconds());
        ledger.save(&ledger_path).map_err(|e| {
            error!(module_id = %module_id, error = %e, "[FIX][ERROR] Failed to persist ledger");
            e
        })?;
        info!(
            module_id = %module_id,
            path = %ledger_path.display(),
            appended = merged.len(),
            "[FIX] Ledger updated"
        );

        let artifact = self.download(&module_id, module_dir, newest).await?;
        let version_code = newest.version_code.unwrap_or(0);
        info!("update: [{}] -> update to {}", module_id, newest.version);

        Ok(ReconcileOutcome::Updated {
            appended: merged.iter().map(|r| r.version.clone()).collect(),
            version: newest.version.clone(),
            version_code,
            artifact,
        })
    }

    async fn fetch_remote(
        &self,
        module_id: &str,
        url: &str,
    ) -> Result<RemoteDescriptor, ReconcileError> {
        info!(module_id, url, "[FIX] Fetching remote update descriptor");
        let value = self.fetcher.get_json(url).await.map_err(|e| {
            error!(module_id, url, error = %e, "[FIX][ERROR] Failed to fetch remote descriptor");
            ReconcileError::Remote(e)
        })?;
        RemoteDescriptor::from_value(value).map_err(|e| {
            error!(module_id, url, error = %e, "[FIX][ERROR] Failed to parse remote descriptor");
            ReconcileError::Descriptor {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Appends unknown remote releases; returns them in upstream order.
    async fn merge<'r>(
        &self,
        module_id: &str,
        ledger: &mut VersionLedger,
        releases: &'r [RemoteRelease],
    ) -> Vec<&'r RemoteRelease> {
        let mut merged = Vec::new();
        for release in releases {
            if ledger.contains_version(&release.version) {
                continue;
            }
            let version_code = release.version_code.unwrap_or(0);
            let urls = self
                .locator
                .locate(module_id, &release.version, version_code);
            let size_bytes = match release.artifact_source() {
                Some(zip_url) => match self.fetcher.content_length(zip_url).await {
                    Ok(size) => size,
                    Err(e) => {
                        warn!(module_id, url = zip_url, error = %e, "[FIX] Size probe failed, recording size 0");
                        0
                    }
                },
                None => {
                    warn!(module_id, version = %release.version, "[FIX] Release has no zipUrl, recording size 0");
                    0
                }
            };
            let added = ledger.append(ReleaseEntry {
                discovered_at: store::epoch_seconds(),
                version: release.version.clone(),
                version_code,
                artifact_url: urls.artifact,
                changelog_url: urls.changelog,
                size_bytes,
                extra: Map::new(),
            });
            if added {
                info!(module_id, version = %release.version, version_code, size_bytes, "[FIX] Recorded new version");
                merged.push(release);
            }
        }
        merged
    }

    /// Stores the artifact (fatal on failure) and the changelog (best-effort).
    async fn download(
        &self,
        module_id: &str,
        module_dir: &Path,
        release: &RemoteRelease,
    ) -> Result<PathBuf, ReconcileError> {
        let stem = locator::file_stem(&release.version, release.version_code.unwrap_or(0));

        let Some(zip_url) = release.artifact_source() else {
            error!(module_id, version = %release.version, "[FIX][ERROR] Newest release has no zipUrl");
            return Err(ReconcileError::MissingArtifactUrl(release.version.clone()));
        };
        let bytes = self.fetcher.get_bytes(zip_url).await.map_err(|e| {
            error!(module_id, url = zip_url, error = %e, "[FIX][ERROR] Failed to download artifact");
            ReconcileError::Artifact {
                url: zip_url.to_string(),
                source: e,
            }
        })?;
        let artifact = module_dir.join(format!("{stem}.zip"));
        store::write_bytes(&artifact, &bytes)?;
        info!(module_id, path = %artifact.display(), bytes = bytes.len(), "[FIX] Stored artifact");

        let Some(changelog_url) = release.changelog_source() else {
            return Ok(artifact);
        };
        match self.fetcher.get_bytes(&changelog_url).await {
            Ok(changelog) => {
                let path = module_dir.join(format!("{stem}.md"));
                match store::write_bytes(&path, &changelog) {
                    Ok(()) => info!(module_id, path = %path.display(), "[FIX] Stored changelog"),
                    Err(e) => warn!(module_id, error = %e, "[FIX] Failed to store changelog"),
                }
            }
            Err(e) => {
                warn!(module_id, url = %changelog_url, error = %e, "[FIX] Failed to download changelog");
            }
        }

        Ok(artifact)
    }
}

/// The module id is the module directory's name, after resolving `.` and `..`.
pub fn module_id_of(module_dir: &Path) -> Result<String, ConfigError> {
    let resolved = fs::canonicalize(module_dir).unwrap_or_else(|_| module_dir.to_path_buf());
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ConfigError::ModuleId(module_dir.to_path_buf()))
}

/// Reads the `update_to` URL from a module's `track.json`.
pub fn read_update_source(track_path: &Path) -> Result<String, ConfigError> {
    let content = match fs::read_to_string(track_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!(path = %track_path.display(), "track.json not found");
            return Err(ConfigError::MissingFile(track_path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: track_path.to_path_buf(),
                source: e,
            })
        }
    };
    let value: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: track_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    value
        .get("update_to")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingField {
            path: track_path.to_path_buf(),
            field: "update_to",
        })
}
