//! Upstream update descriptors.
//!
//! Modules publish either a single release object
//! (`{"version", "versionCode", "zipUrl", "changelog", ...}`) or a collection
//! (`{"versions": [...]}`, newest first). Both shapes are read into [`RemoteDescriptor`];
//! fields the pipeline does not use are ignored.

use serde::Deserialize;
use serde_json::Value;

/// One release as described upstream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRelease {
    pub version: String,
    #[serde(default)]
    pub version_code: Option<i64>,
    /// Only the release that gets downloaded must carry one.
    #[serde(default)]
    pub zip_url: Option<String>,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub min_magisk: Option<Value>,
}

impl RemoteRelease {
    /// The archive URL, if upstream declared a non-blank one.
    pub fn artifact_source(&self) -> Option<&str> {
        self.zip_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Where the release changelog can be fetched from upstream.
    pub fn changelog_source(&self) -> Option<String> {
        match &self.changelog {
            Some(url) if !url.trim().is_empty() => Some(url.clone()),
            _ => self
                .artifact_source()
                .map(|zip_url| zip_url.replace(".zip", ".md")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RemoteDescriptor {
    Collection {
        versions: Vec<RemoteRelease>,
        #[serde(default, rename = "minMagisk")]
        min_magisk: Option<Value>,
    },
    Single(RemoteRelease),
}

impl RemoteDescriptor {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Entries in upstream order (newest first).
    pub fn releases(&self) -> &[RemoteRelease] {
        match self {
            RemoteDescriptor::Collection { versions, .. } => versions,
            RemoteDescriptor::Single(release) => std::slice::from_ref(release),
        }
    }

    /// The leading entry; upstream ordering is trusted, nothing is re-sorted.
    pub fn latest(&self) -> Option<&RemoteRelease> {
        self.releases().first()
    }

    pub fn latest_version_code(&self) -> Option<i64> {
        self.latest().and_then(|release| release.version_code)
    }

    /// Minimum platform version, taken from the latest entry or the descriptor itself.
    pub fn min_platform_version(&self) -> Option<String> {
        let top_level = match self {
            RemoteDescriptor::Collection { min_magisk, .. } => min_magisk.as_ref(),
            RemoteDescriptor::Single(_) => None,
        };
        self.latest()
            .and_then(|release| release.min_magisk.as_ref())
            .or(top_level)
            .and_then(value_to_text)
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
