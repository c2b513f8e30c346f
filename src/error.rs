//! Error taxonomy shared by the reconciliation and classification pipelines.
//!
//! Every error is module-scoped: batch drivers in [`crate::synchronise`] log it against the
//! module id and carry on with the next module.

use std::path::PathBuf;

use thiserror::Error;

/// Failure fetching or decoding an upstream resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport error (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The body was not the JSON we expected.
    #[error("invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A required local input is missing or malformed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required file {0} not found")]
    MissingFile(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("{path} has no usable `{field}` field")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("environment variable {var} is invalid: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("module path {0} has no directory name")]
    ModuleId(PathBuf),
}

/// The downloaded package could not be turned into a file listing.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to download archive: {0}")]
    Fetch(#[from] FetchError),

    #[error("scratch directory I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid or unsupported archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Reading or writing a persisted file failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of one module's reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("fetching remote descriptor: {0}")]
    Remote(#[source] FetchError),

    #[error("remote descriptor from {url} does not match either descriptor form: {reason}")]
    Descriptor { url: String, reason: String },

    #[error("remote descriptor from {0} has no latest version code")]
    MissingVersionCode(String),

    #[error("remote descriptor from {0} has no release entries")]
    NoReleases(String),

    #[error("newest release {0} declares no zipUrl to download")]
    MissingArtifactUrl(String),

    #[error("downloading artifact {url}: {source}")]
    Artifact {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Failure of one module's track record build.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The module configuration cannot even be probed; the caller skips the module.
    #[error("module configuration is malformed: {0}")]
    Malformed(String),

    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),
}
