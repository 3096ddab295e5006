//! Compile command implementation.
//!
//! Submit a file as a pipeline job, poll it to a terminal state, then write
//! the compiled program. Progress goes to stderr so stdout carries only the
//! program.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qforge_sched::{JobStatus, Pipeline};

use super::common::{load_config, read_source, write_output};

/// Execute the compile command.
pub async fn execute(
    config_path: Option<&Path>,
    input: &Path,
    output: Option<&Path>,
    target: Option<&str>,
    timeout: u64,
    show_stages: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let source = read_source(input)?;
    let pipeline = Pipeline::from_config(&config).context("Failed to open job store")?;

    eprintln!(
        "{} Compiling {} for target {}",
        style("→").cyan().bold(),
        style(input.display()).green(),
        style(target.unwrap_or(&config.pipeline.default_target)).yellow()
    );

    let job_id = pipeline
        .submit_source(&source, target)
        .await
        .with_context(|| format!("Failed to submit {}", input.display()))?;
    eprintln!("  Job: {}", style(job_id).dim());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();
    let timeout_duration = Duration::from_secs(timeout);

    let job = loop {
        let snapshot = pipeline
            .query(&job_id)
            .await?
            .with_context(|| format!("Job {job_id} disappeared from the store"))?;

        spinner.set_message(format!(
            "{} ({}%)",
            snapshot.progress.current_step, snapshot.progress.percentage
        ));

        if snapshot.is_terminal() {
            spinner.finish_and_clear();
            break snapshot;
        }

        if start.elapsed() > timeout_duration {
            spinner.finish_and_clear();
            anyhow::bail!(
                "Timeout after {}s. Job {} is still at {}%.",
                timeout,
                job_id,
                snapshot.progress.percentage
            );
        }

        tokio::time::sleep(config.poll_interval()).await;
    };

    if show_stages {
        for stage in pipeline.store().stage_outputs(&job_id).await? {
            eprintln!("{} after {}", style("──").dim(), style(&stage.stage).cyan());
            eprint!("{}", stage.output);
        }
    }

    let result = job.result.unwrap_or_default();
    match job.status {
        JobStatus::Completed => {
            write_output(output, &result)?;
            eprintln!(
                "{} Compilation complete in {:.2?}",
                style("✓").green().bold(),
                start.elapsed()
            );
            if let Some(path) = output {
                eprintln!("  Output: {}", style(path.display()).green());
            }
            Ok(())
        }
        _ => anyhow::bail!("Job {job_id} failed: {result}"),
    }
}
