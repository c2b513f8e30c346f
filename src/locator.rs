//! Canonical artifact URLs under the repository layout
//! `<base>/modules/<module_id>/<version>_<version_code>.<ext>`.

/// Builds the published URLs of a module release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocator {
    base_url: String,
}

/// The pair of canonical URLs for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactUrls {
    pub artifact: String,
    pub changelog: String,
}

impl ArtifactLocator {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn locate(&self, module_id: &str, version: &str, version_code: i64) -> ArtifactUrls {
        let stem = format!(
            "{}/modules/{}/{}",
            self.base_url,
            module_id,
            file_stem(version, version_code)
        );
        ArtifactUrls {
            artifact: format!("{stem}.zip"),
            changelog: format!("{stem}.md"),
        }
    }
}

/// File name stem shared by the published artifact and its changelog.
pub fn file_stem(version: &str, version_code: i64) -> String {
    format!("{version}_{version_code}")
}
