//! Platform-level signals about a module's source repository.
//!
//! Only GitHub repository URLs are probed. Every other host yields an empty
//! [`SourceMetadata`] without any network call. Each probing step degrades to "no
//! contribution" on failure, so [`SourceMetadataProber::probe`] itself never fails.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::contract::SourcePlatform;
use crate::signals::{self, Antifeature};

static REPOSITORY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([^/?#]+)/([^/?#]+)")
        .unwrap_or_else(|e| panic!("invalid repository URL pattern: {e}"))
});

/// Owner and name of a repository on the source-hosting platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parses `https://github.com/<owner>/<repo>[/...]`; any other shape is unsupported.
    pub fn parse(url: &str) -> Option<Self> {
        let caps = REPOSITORY_URL.captures(url.trim())?;
        let owner = caps.get(1)?.as_str().to_string();
        let repo = caps.get(2)?.as_str();
        let repo = repo.strip_suffix(".git").unwrap_or(repo).to_string();
        if repo.is_empty() {
            return None;
        }
        Some(Self { owner, repo })
    }

    /// Raw README on the main branch.
    pub fn readme_url(&self) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/main/README.md",
            self.owner, self.repo
        )
    }
}

/// Best-effort platform signals; empty defaults mean "nothing known".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetadata {
    pub license: String,
    pub antifeatures: BTreeSet<Antifeature>,
    pub updated_at: String,
}

pub struct SourceMetadataProber<'a, P: ?Sized> {
    platform: &'a P,
}

impl<'a, P> SourceMetadataProber<'a, P>
where
    P: SourcePlatform + ?Sized,
{
    pub fn new(platform: &'a P) -> Self {
        Self { platform }
    }

    pub async fn probe(&self, source_url: &str) -> SourceMetadata {
        let Some(repo_ref) = RepoRef::parse(source_url) else {
            debug!(url = source_url, "Unsupported source host, skipping probe");
            return SourceMetadata::default();
        };
        let RepoRef { owner, repo } = &repo_ref;

        let info = match self.platform.repository(owner, repo).await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, owner = %owner, repo = %repo, "Repository metadata unavailable");
                return SourceMetadata::default();
            }
        };

        let mut antifeatures = BTreeSet::new();
        if info.archived || info.disabled {
            antifeatures.insert(Antifeature::NoSourceSince);
        }
        if info.private || info.license.is_none() {
            antifeatures.insert(Antifeature::UpstreamNonFree);
        }

        match self.platform.advisories(owner, repo).await {
            Ok(advisories) if !advisories.is_empty() => {
                info!(owner = %owner, repo = %repo, count = advisories.len(), "Repository has published advisories");
                antifeatures.insert(Antifeature::KnownVuln);
            }
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, owner = %owner, repo = %repo, "Advisories unavailable");
            }
        }

        match self.platform.contents(owner, repo).await {
            Ok(entries) => {
                let files = signals::normalize(entries.iter().map(|entry| entry.name.as_str()));
                antifeatures.extend(signals::antifeatures(&files));
            }
            Err(e) => {
                debug!(error = %e, owner = %owner, repo = %repo, "Repository listing unavailable");
            }
        }

        let license = info
            .license
            .and_then(|license| license.spdx_id)
            .unwrap_or_default();

        info!(
            owner = %owner,
            repo = %repo,
            license = %license,
            antifeatures = ?antifeatures,
            "Probed source repository"
        );

        SourceMetadata {
            license,
            antifeatures,
            updated_at: info.updated_at.unwrap_or_default(),
        }
    }
}
