//! Status command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use qforge_sched::{JobId, JobStatus, JobStore, StorageBackend, open_store};

use super::common::load_config;

/// Execute the status command.
pub async fn execute(config_path: Option<&Path>, job_id: &str) -> Result<()> {
    let config = load_config(config_path)?;
    if config.storage.backend == StorageBackend::Memory {
        eprintln!(
            "{} memory storage keeps no jobs between runs; configure sqlite storage to query past jobs",
            style("Note:").yellow().bold()
        );
    }

    let parsed_id =
        JobId::parse(job_id).map_err(|e| anyhow::anyhow!("Invalid job ID '{job_id}': {e}"))?;
    let store = JobStore::new(open_store(&config.storage).context("Failed to open job store")?);

    let Some(snapshot) = store.query(&parsed_id).await? else {
        anyhow::bail!("Job not found: {job_id}");
    };

    let status = match snapshot.status {
        JobStatus::Completed => style(snapshot.status.as_str()).green(),
        JobStatus::Failed => style(snapshot.status.as_str()).red(),
        JobStatus::InProgress => style(snapshot.status.as_str()).yellow(),
    };
    eprintln!(
        "{} {} {} ({}%, {})",
        style("●").cyan(),
        style(job_id).dim(),
        status,
        snapshot.progress.percentage,
        snapshot.progress.current_step
    );

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
