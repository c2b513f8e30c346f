//! `load_config` module: loads the track configuration file that lists every module the
//! repository tracks, and adapts it into strongly-typed [`ModuleConfig`] records.
//!
//! The file is JSON (`{"repositories": [...]}`); a `.yaml`/`.yml` extension switches the
//! parser to YAML with the same schema. Any failure is a [`ConfigError`] naming the path.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// One tracked module, as declared by the repository maintainers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub module_id: String,
    /// Source-hosting repository URL that gets probed for license and antifeatures.
    pub url: String,
    /// Upstream update descriptor URL.
    pub update_to: String,
    #[serde(default)]
    pub homepage: String,
    pub source: String,
    #[serde(default)]
    pub support: String,
    #[serde(default)]
    pub donate: String,
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default)]
    pub verified: bool,
}

fn default_enable() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackConfig {
    #[serde(default)]
    pub repositories: Vec<ModuleConfig>,
}

impl TrackConfig {
    pub fn trace_loaded(&self) {
        info!(
            modules_count = self.repositories.len(),
            "Loaded TrackConfig"
        );
        for module in &self.repositories {
            info!(
                module_id = %module.module_id,
                url = %module.url,
                enable = module.enable,
                "Loaded module entry"
            );
        }
    }
}

/// Loads the track configuration file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrackConfig, ConfigError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading track configuration from file");

    if !path_ref.exists() {
        error!(config_path = ?path_ref, "Track configuration file does not exist");
        return Err(ConfigError::MissingFile(path_ref.to_path_buf()));
    }

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(ConfigError::Read {
                path: path_ref.to_path_buf(),
                source: e,
            });
        }
    };

    let is_yaml = matches!(
        path_ref.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed = if is_yaml {
        serde_yaml::from_str::<TrackConfig>(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str::<TrackConfig>(&content).map_err(|e| e.to_string())
    };

    match parsed {
        Ok(config) => {
            info!(
                config_path = ?path_ref,
                yaml = is_yaml,
                modules = config.repositories.len(),
                "Parsed track configuration successfully"
            );
            Ok(config)
        }
        Err(reason) => {
            error!(error = %reason, config_path = ?path_ref, "Failed to parse track configuration");
            Err(ConfigError::Parse {
                path: path_ref.to_path_buf(),
                reason,
            })
        }
    }
}
