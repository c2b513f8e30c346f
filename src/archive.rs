//! Download a package archive and list the files it contains.
//!
//! The archive is written into an exclusively owned scratch directory and extracted there.
//! The directory is a [`tempfile::TempDir`], so it is removed on every exit path, errors
//! included, as soon as the listing returns.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;

use tracing::{debug, error, info};

use crate::contract::Fetcher;
use crate::error::ArchiveError;

/// Downloads the archive at `url` and returns its lower-cased file names.
pub async fn download_and_list<F>(fetcher: &F, url: &str) -> Result<BTreeSet<String>, ArchiveError>
where
    F: Fetcher + ?Sized,
{
    info!(url, "Downloading package archive");
    let bytes = fetcher.get_bytes(url).await.map_err(|e| {
        error!(error = %e, url, "Failed to download package archive");
        ArchiveError::Fetch(e)
    })?;
    list_archive(&bytes)
}

/// Extracts `bytes` as a zip archive into a scratch directory and lists the file names.
pub fn list_archive(bytes: &[u8]) -> Result<BTreeSet<String>, ArchiveError> {
    let scratch = tempfile::tempdir()?;
    let archive_path = scratch.path().join("module.zip");
    let contents_dir = scratch.path().join("contents");
    fs::write(&archive_path, bytes)?;
    fs::create_dir_all(&contents_dir)?;

    let mut archive = zip::ZipArchive::new(File::open(&archive_path)?).map_err(|e| {
        error!(error = %e, "Not a valid zip archive");
        ArchiveError::Zip(e)
    })?;
    archive.extract(&contents_dir).map_err(|e| {
        error!(error = %e, "Failed to extract archive");
        ArchiveError::Zip(e)
    })?;

    let mut names = BTreeSet::new();
    visit_dir(&contents_dir, &mut names)?;
    info!(count = names.len(), "Listed package archive");
    Ok(names)
}

/// Recursively collects lower-cased file names below `dir`.
fn visit_dir(dir: &Path, results: &mut BTreeSet<String>) -> Result<(), ArchiveError> {
    for entry_res in fs::read_dir(dir)? {
        let entry = entry_res?;
        let path = entry.path();
        if path.is_dir() {
            visit_dir(&path, results)?;
        } else if let Some(name) = path.file_name() {
            let name = name.to_string_lossy().to_lowercase();
            debug!(file = %name, "Archive entry");
            results.insert(name);
        }
    }
    Ok(())
}
