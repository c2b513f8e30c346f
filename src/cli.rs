use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::http::{GitHubClient, HttpFetcher};
use crate::load_config::load_config;
use crate::locator::ArtifactLocator;
use crate::reconcile::{ReconcileOutcome, ReconciliationEngine};
use crate::synchronise::{reconcile_all, update_tracks, SynchroniseReport};
use crate::track::TrackRecordBuilder;

/// CLI for modrepo: keep a static module repository in step with upstream releases.
#[derive(Parser)]
#[clap(
    name = "modrepo",
    version,
    about = "Reconcile module release ledgers and classify modules for a static repository feed"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile one module directory with its upstream update descriptor
    Fix {
        /// Module directory holding track.json and update.json
        module_path: PathBuf,
    },
    /// Reconcile every module below the modules directory
    Sync {
        /// Directory with one sub-directory per module
        #[clap(long)]
        modules: PathBuf,
    },
    /// Rebuild track.json for every module listed in the configuration file
    Track {
        /// Path to the JSON or YAML track configuration
        #[clap(long)]
        config: PathBuf,
        /// Directory with one sub-directory per module
        #[clap(long)]
        modules: PathBuf,
    },
}

/// Async CLI entrypoint shared by main() and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env().context("invalid environment configuration")?;
    settings.trace_loaded();

    let fetcher = HttpFetcher::new(&settings).context("failed to build HTTP client")?;
    let locator = ArtifactLocator::new(settings.repository_base_url.clone());

    match cli.command {
        Commands::Fix { module_path } => {
            let engine = ReconciliationEngine::new(&fetcher, locator);
            let outcome = engine
                .reconcile(&module_path)
                .await
                .with_context(|| format!("reconciliation of {} failed", module_path.display()))?;
            match outcome {
                ReconcileOutcome::Updated {
                    version, artifact, ..
                } => println!("Updated to {} ({})", version, artifact.display()),
                ReconcileOutcome::UpToDate { .. } | ReconcileOutcome::NothingNew => {
                    println!("Already up to date")
                }
            }
            Ok(())
        }
        Commands::Sync { modules } => {
            let engine = ReconciliationEngine::new(&fetcher, locator);
            let report = reconcile_all(&engine, &modules).await?;
            finish(&settings, &report)
        }
        Commands::Track { config, modules } => {
            let config = load_config(config)?;
            config.trace_loaded();
            let platform = GitHubClient::new(&settings).context("failed to build GitHub client")?;
            let builder = TrackRecordBuilder::new(&fetcher, &platform);
            let report = update_tracks(&builder, &config, &modules).await;
            finish(&settings, &report)
        }
    }
}

/// Prints the summary and the JSON array of updated module ids.
fn finish(settings: &Settings, report: &SynchroniseReport) -> Result<()> {
    let summary = report.summary();
    println!(
        "Synchronise complete: {} succeeded, {} failed, {} updated",
        summary.succeeded.len(),
        summary.failed.len(),
        summary.updated.len()
    );
    println!("{}", serde_json::to_string(&summary.updated)?);

    if let Some(target) = settings.notify_target {
        tracing::info!(notify_target = target, updated = ?summary.updated, "Updated modules ready for notification");
    }

    if report.has_failures() {
        bail!("{} module(s) failed: {}", summary.failed.len(), summary.failed.join(", "));
    }
    Ok(())
}
