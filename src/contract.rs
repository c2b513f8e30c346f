//! # contract: interfaces to the network collaborators of the pipelines
//!
//! The reconciliation and classification pipelines never talk to `reqwest` directly. They go
//! through two traits defined here:
//!
//! - [`Fetcher`]: plain HTTP access to upstream descriptors and release artifacts.
//! - [`SourcePlatform`]: repository metadata queries against the source-hosting platform.
//!
//! Concrete clients live in [`crate::http`]. Both traits are annotated for `mockall`, so
//! integration tests can drive every pipeline deterministically without network access.
//!
//! ## Error contract
//! Every method returns a [`FetchError`]; callers decide whether a failure is fatal
//! (reconciliation's descriptor fetch) or degrades to "no contribution" (probing).

use async_trait::async_trait;
use serde::Deserialize;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::FetchError;

/// Repository metadata as reported by the source-hosting platform.
///
/// Only the fields the prober reads are declared; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub license: Option<RepositoryLicense>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepositoryLicense {
    #[serde(default)]
    pub spdx_id: Option<String>,
}

/// An entry of a repository's top-level file listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentEntry {
    pub name: String,
}

/// Plain HTTP access used by reconciliation and track building.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and decode the body as JSON.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError>;

    /// GET `url` and return the raw body.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Metadata-only request for the size of the resource at `url`.
    async fn content_length(&self, url: &str) -> Result<u64, FetchError>;
}

/// Queries against the source-hosting platform, keyed by owner and repository name.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SourcePlatform: Send + Sync {
    /// Repository metadata (`archived`, `disabled`, `private`, `license`, `updated_at`).
    async fn repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo, FetchError>;

    /// Published security advisories; only their count matters to callers.
    async fn advisories(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<serde_json::Value>, FetchError>;

    /// Top-level file listing of the default branch.
    async fn contents(&self, owner: &str, repo: &str) -> Result<Vec<ContentEntry>, FetchError>;
}
