//! Batch drivers: run a pipeline over many modules, one after another, and report per module.
//!
//! A module's failure is logged and recorded in the report; the batch always continues.
//! Only a condition that prevents the batch from starting (an unreadable modules directory)
//! is returned as an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::contract::{Fetcher, SourcePlatform};
use crate::error::ConfigError;
use crate::load_config::TrackConfig;
use crate::reconcile::{module_id_of, ReconcileOutcome, ReconciliationEngine, TRACK_FILE};
use crate::track::TrackRecordBuilder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Something new was written for the module.
    Updated { version: Option<String> },
    /// Nothing to do.
    Current,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub module_id: String,
    #[serde(flatten)]
    pub status: ModuleStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SynchroniseSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub updated: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SynchroniseReport {
    pub modules: Vec<ModuleReport>,
}

impl SynchroniseReport {
    fn record(&mut self, module_id: impl Into<String>, status: ModuleStatus) {
        self.modules.push(ModuleReport {
            module_id: module_id.into(),
            status,
        });
    }

    pub fn summary(&self) -> SynchroniseSummary {
        let mut summary = SynchroniseSummary::default();
        for report in &self.modules {
            match &report.status {
                ModuleStatus::Failed { .. } => summary.failed.push(report.module_id.clone()),
                ModuleStatus::Updated { .. } => {
                    summary.succeeded.push(report.module_id.clone());
                    summary.updated.push(report.module_id.clone());
                }
                ModuleStatus::Current => summary.succeeded.push(report.module_id.clone()),
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.modules
            .iter()
            .any(|report| matches!(report.status, ModuleStatus::Failed { .. }))
    }
}

/// Module directories below `modules_root` that carry a `track.json`, in name order.
pub fn module_dirs(modules_root: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let read_err = |source| ConfigError::Read {
        path: modules_root.to_path_buf(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in fs::read_dir(modules_root).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_dir() && path.join(TRACK_FILE).is_file() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Reconciles every module below `modules_root`.
pub async fn reconcile_all<F>(
    engine: &ReconciliationEngine<'_, F>,
    modules_root: &Path,
) -> Result<SynchroniseReport, ConfigError>
where
    F: Fetcher + ?Sized,
{
    let dirs = module_dirs(modules_root)?;
    info!(path = %modules_root.display(), modules = dirs.len(), "[SYNC] Starting reconciliation batch");

    let mut report = SynchroniseReport::default();
    for dir in dirs {
        let module_id = match module_id_of(&dir) {
            Ok(id) => id,
            Err(e) => {
                report.record(dir.display().to_string(), failed(e));
                continue;
            }
        };
        let status = match engine.reconcile(&dir).await {
            Ok(ReconcileOutcome::Updated { version, .. }) => ModuleStatus::Updated {
                version: Some(version),
            },
            Ok(_) => ModuleStatus::Current,
            Err(e) => {
                error!(module_id = %module_id, error = %e, "[SYNC][ERROR] Reconciliation failed");
                failed(e)
            }
        };
        report.record(module_id, status);
    }

    log_summary("reconciliation", &report);
    Ok(report)
}

/// Builds and writes the track record of every configured module.
///
/// A module counts as updated only when its rewritten `track.json` differs from the
/// previous one.
pub async fn update_tracks<F, P>(
    builder: &TrackRecordBuilder<'_, F, P>,
    config: &TrackConfig,
    modules_root: &Path,
) -> SynchroniseReport
where
    F: Fetcher + ?Sized,
    P: SourcePlatform + ?Sized,
{
    info!(path = %modules_root.display(), modules = config.repositories.len(), "[SYNC] Starting track batch");

    let mut report = SynchroniseReport::default();
    for module in &config.repositories {
        let result = match builder.build(module).await {
            Ok(record) => record
                .write(modules_root)
                .map(|written| (written.changed, record.version)),
            Err(e) => Err(e),
        };
        let status = match result {
            Ok((true, version)) => ModuleStatus::Updated { version },
            Ok((false, _)) => ModuleStatus::Current,
            Err(e) => {
                error!(module_id = %module.module_id, error = %e, "[SYNC][ERROR] Track update failed");
                failed(e)
            }
        };
        report.record(module.module_id.clone(), status);
    }

    log_summary("track", &report);
    report
}

fn failed(e: impl std::fmt::Display) -> ModuleStatus {
    ModuleStatus::Failed {
        reason: e.to_string(),
    }
}

fn log_summary(batch: &str, report: &SynchroniseReport) {
    let summary = report.summary();
    info!(
        batch,
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        updated = ?summary.updated,
        "[SYNC] Batch complete"
    );
}
