//! reqwest-backed implementations of the [`Fetcher`] and [`SourcePlatform`] contracts.
//!
//! Each client owns one `reqwest::Client` built with the configured per-call timeout.
//! There is no retry policy: a failed call is reported to the caller once.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::config::Settings;
use crate::contract::{ContentEntry, Fetcher, RepositoryInfo, SourcePlatform};
use crate::error::FetchError;

const USER_AGENT: &str = concat!("modrepo/", env!("CARGO_PKG_VERSION"));

/// Maps non-success statuses to [`FetchError::Status`].
async fn check_response(resp: Response) -> Result<Response, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: resp.url().to_string(),
            status: status.as_u16(),
        });
    }
    Ok(resp)
}

async fn decode_json<T: DeserializeOwned>(url: &str, resp: Response) -> Result<T, FetchError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| FetchError::Json {
        url: url.to_string(),
        source: e,
    })
}

/// Unauthenticated HTTP access to update descriptors and artifacts.
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        tracing::debug!(url, "GET json");
        let resp = check_response(self.http.get(url).send().await?).await?;
        decode_json(url, resp).await
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url, "GET bytes");
        let resp = check_response(self.http.get(url).send().await?).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn content_length(&self, url: &str) -> Result<u64, FetchError> {
        tracing::debug!(url, "HEAD");
        let resp = check_response(self.http.head(url).send().await?).await?;
        // Read the header itself: a HEAD body is empty, so the body size hint is always 0.
        Ok(resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0))
    }
}

/// GitHub REST client for repository metadata.
pub struct GitHubClient {
    http: Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = &settings.auth_token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "GITHUB_TOKEN is not a valid header value, querying unauthenticated");
                }
            }
        }
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()?;
        tracing::info!(
            api_url = %settings.github_api_url,
            authenticated = settings.auth_token.is_some(),
            "Initialized GitHubClient"
        );
        Ok(Self {
            http,
            api_url: settings.github_api_url.clone(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.api_url, path);
        tracing::debug!(url = %url, "GitHub API request");
        let resp = check_response(self.http.get(&url).send().await?).await?;
        decode_json(&url, resp).await
    }
}

#[async_trait]
impl SourcePlatform for GitHubClient {
    async fn repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo, FetchError> {
        self.get(&format!("/repos/{owner}/{repo}")).await
    }

    async fn advisories(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<serde_json::Value>, FetchError> {
        self.get(&format!("/repos/{owner}/{repo}/security-advisories"))
            .await
    }

    async fn contents(&self, owner: &str, repo: &str) -> Result<Vec<ContentEntry>, FetchError> {
        self.get(&format!("/repos/{owner}/{repo}/contents")).await
    }
}
