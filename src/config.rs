// modrepo/src/config.rs

use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_REPOSITORY_BASE_URL: &str = "https://misak10.github.io/mmrl-repo";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Process-wide settings, read once at startup and handed to each component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL the repository is published under; canonical artifact URLs hang off it.
    pub repository_base_url: String,
    /// REST root of the source-hosting platform.
    pub github_api_url: String,
    /// Bearer token for platform queries.
    pub auth_token: Option<String>,
    /// Chat the downstream notifier posts update announcements to.
    pub notify_target: Option<i64>,
    /// Upper bound for every single network call.
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository_base_url: DEFAULT_REPOSITORY_BASE_URL.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            auth_token: None,
            notify_target: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Reads the recognised environment variables; unset ones fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`Settings::from_env`], with the variable source injected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let non_empty = |var| lookup(var).filter(|v: &String| !v.trim().is_empty());

        let repository_base_url = non_empty("MODREPO_BASE_URL")
            .unwrap_or_else(|| DEFAULT_REPOSITORY_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let github_api_url = non_empty("MODREPO_GITHUB_API_URL")
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let auth_token = non_empty("GITHUB_TOKEN");

        let notify_target = match non_empty("TELEGRAM_CHAT_ID") {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|e| ConfigError::Env {
                var: "TELEGRAM_CHAT_ID",
                reason: format!("{raw:?} is not an integer chat id: {e}"),
            })?),
            None => None,
        };

        let request_timeout = match non_empty("MODREPO_HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Env {
                        var: "MODREPO_HTTP_TIMEOUT_SECS",
                        reason: format!("{raw:?} is not a positive number of seconds"),
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            repository_base_url,
            github_api_url,
            auth_token,
            notify_target,
            request_timeout,
        })
    }

    pub fn trace_loaded(&self) {
        info!(
            repository_base_url = %self.repository_base_url,
            github_api_url = %self.github_api_url,
            auth_token_set = self.auth_token.is_some(),
            notify_target = ?self.notify_target,
            timeout_secs = self.request_timeout.as_secs(),
            "Loaded Settings"
        );
    }
}
