//! Wholesale JSON file persistence shared by the ledger and track record writers.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::PersistenceError;

/// Reads and parses `path`; `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No persisted file, starting fresh");
            return Ok(None);
        }
        Err(e) => {
            error!(error = ?e, path = %path.display(), "Failed to read persisted file");
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| PersistenceError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Serializes `value` with 4-space indentation and replaces `path` in one rename.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| PersistenceError::Encode {
            path: path.to_path_buf(),
            source: e,
        })?;
    write_bytes(path, &buf)
}

/// Writes `bytes` to a sibling temp file, then renames it over `path`.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let write_err = |source: std::io::Error| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}

/// Current time as fractional seconds since the Unix epoch.
pub fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
