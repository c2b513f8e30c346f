//! Track records: the descriptive metadata document published for every module.
//!
//! A record is recomputed from scratch on every run from the module configuration, the
//! source-platform probe and the package listing. Nothing is carried over from a previous
//! `track.json`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::archive;
use crate::contract::{Fetcher, SourcePlatform};
use crate::descriptor::RemoteDescriptor;
use crate::error::TrackError;
use crate::load_config::ModuleConfig;
use crate::probe::{RepoRef, SourceMetadataProber};
use crate::reconcile::TRACK_FILE;
use crate::signals::{self, Antifeature, Category};
use crate::store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub enable: bool,
    pub verified: bool,
    pub update_to: String,
    pub license: String,
    pub homepage: String,
    pub source: String,
    pub support: String,
    pub donate: String,
    pub categories: BTreeSet<Category>,
    pub readme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "min_magisk", default, skip_serializing_if = "Option::is_none")]
    pub min_platform_version: Option<String>,
    /// Omitted entirely when nothing was detected.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub antifeatures: BTreeSet<Antifeature>,
}

/// Where a record was written and whether its content differs from the previous file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTrack {
    pub path: PathBuf,
    pub changed: bool,
}

impl TrackRecord {
    /// Overwrites `<modules_root>/<id>/track.json`, creating the module directory if needed.
    pub fn write(&self, modules_root: &Path) -> Result<WrittenTrack, TrackError> {
        let path = modules_root.join(&self.id).join(TRACK_FILE);
        let changed = match store::read_json::<Value>(&path) {
            Ok(Some(previous)) => serde_json::to_value(self).ok() != Some(previous),
            Ok(None) => true,
            Err(e) => {
                debug!(module_id = %self.id, error = %e, "[TRACK] Previous track record unreadable");
                true
            }
        };
        store::write_json(&path, self)?;
        info!(module_id = %self.id, path = %path.display(), changed, "[TRACK] Wrote track record");
        Ok(WrittenTrack { path, changed })
    }
}

pub struct TrackRecordBuilder<'a, F: ?Sized, P: ?Sized> {
    fetcher: &'a F,
    prober: SourceMetadataProber<'a, P>,
}

impl<'a, F, P> TrackRecordBuilder<'a, F, P>
where
    F: Fetcher + ?Sized,
    P: SourcePlatform + ?Sized,
{
    pub fn new(fetcher: &'a F, platform: &'a P) -> Self {
        Self {
            fetcher,
            prober: SourceMetadataProber::new(platform),
        }
    }

    /// Builds the record for one configured module.
    ///
    /// Only a malformed configuration fails the build. Upstream problems (descriptor,
    /// archive, platform) reduce the record to whatever could still be learned.
    pub async fn build(&self, module: &ModuleConfig) -> Result<TrackRecord, TrackError> {
        validate(module)?;
        let module_id = module.module_id.as_str();
        info!(module_id, "[TRACK] Building track record");

        let metadata = self.prober.probe(&module.url).await;
        let mut antifeatures = metadata.antifeatures;
        let mut categories = BTreeSet::new();
        let mut version = None;
        let mut min_platform_version = None;

        match self.fetch_descriptor(module).await {
            Some(descriptor) => {
                min_platform_version = descriptor.min_platform_version();
                if let Some(latest) = descriptor.latest() {
                    version = Some(latest.version.trim())
                        .filter(|v| !v.is_empty())
                        .map(str::to_string);
                    match latest.artifact_source() {
                        Some(zip_url) => {
                            match archive::download_and_list(self.fetcher, zip_url).await {
                                Ok(files) => {
                                    let classification = signals::classify(&files);
                                    categories = classification.categories;
                                    antifeatures.extend(classification.antifeatures);
                                }
                                Err(e) => {
                                    warn!(module_id, url = zip_url, error = %e, "[TRACK] Package listing unavailable, no file signals");
                                }
                            }
                        }
                        None => {
                            warn!(module_id, "[TRACK] Latest release has no zipUrl, no file signals");
                        }
                    }
                }
            }
            None => {
                warn!(module_id, "[TRACK] No descriptor, record carries configuration and platform data only");
            }
        }

        let readme = RepoRef::parse(&module.url)
            .map(|repo| repo.readme_url())
            .unwrap_or_default();

        let record = TrackRecord {
            id: module.module_id.clone(),
            enable: module.enable,
            verified: module.verified,
            update_to: module.update_to.clone(),
            license: metadata.license,
            homepage: module.homepage.clone(),
            source: module.source.clone(),
            support: module.support.clone(),
            donate: module.donate.clone(),
            categories,
            readme,
            version,
            min_platform_version,
            antifeatures,
        };
        info!(
            module_id,
            categories = ?record.categories,
            antifeatures = ?record.antifeatures,
            source_updated_at = %metadata.updated_at,
            "[TRACK] Track record built"
        );
        Ok(record)
    }

    async fn fetch_descriptor(&self, module: &ModuleConfig) -> Option<RemoteDescriptor> {
        let module_id = module.module_id.as_str();
        let url = module.update_to.as_str();
        let value = match self.fetcher.get_json(url).await {
            Ok(value) => value,
            Err(e) => {
                error!(module_id, url, error = %e, "[TRACK] Failed to fetch update descriptor");
                return None;
            }
        };
        match RemoteDescriptor::from_value(value) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                error!(module_id, url, error = %e, "[TRACK] Failed to parse update descriptor");
                None
            }
        }
    }
}

fn validate(module: &ModuleConfig) -> Result<(), TrackError> {
    let id = module.module_id.trim();
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(TrackError::Malformed(format!(
            "module_id {:?} is not a usable directory name",
            module.module_id
        )));
    }
    if module.url.trim().is_empty() {
        return Err(TrackError::Malformed(format!("{id}: url is empty")));
    }
    if module.update_to.trim().is_empty() {
        return Err(TrackError::Malformed(format!("{id}: update_to is empty")));
    }
    Ok(())
}
