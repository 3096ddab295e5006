//! Pipeline orchestrator: runs compile stages for submitted jobs.
//!
//! Each submission becomes a job in the [`JobStore`] and a spawned task that
//! drives the program through the stages in order:
//!
//! ```text
//! submit ──> compile ──> enrich ──> postprocess ──> emit ──> COMPLETED
//!               │           │            │            │
//!               └───────────┴────────────┴────────────┴──> FAILED
//! ```
//!
//! Callers get the job id back immediately and poll [`Pipeline::query`] or
//! await [`Pipeline::wait`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use qforge_compile::{CompileError, CompileResult, PassManager, PassManagerBuilder, emit_for_target};
use qforge_qasm3::syntax::Program;
use qforge_qasm3::{QasmVersion, emit_program, parse_program};

use crate::config::PipelineConfig;
use crate::error::{SchedError, SchedResult};
use crate::job::{JobId, JobSnapshot};
use crate::persistence::open_store;
use crate::store::JobStore;

/// One step of the compile pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name, used for progress labels and error summaries.
    fn name(&self) -> &str;

    /// Transform the program.
    async fn run(&self, program: Program) -> CompileResult<Program>;
}

/// A stage backed by a [`PassManager`].
///
/// Passes are CPU-bound, so they run on the blocking pool. A timed-out pass
/// keeps running there until it returns; its output is discarded.
pub struct PassStage {
    name: String,
    manager: Arc<PassManager>,
}

impl PassStage {
    pub fn new(name: impl Into<String>, manager: PassManager) -> Self {
        Self {
            name: name.into(),
            manager: Arc::new(manager),
        }
    }

    /// The default stages, in execution order.
    pub fn defaults(builder: &PassManagerBuilder) -> Vec<Arc<dyn Stage>> {
        builder
            .build_all()
            .into_iter()
            .map(|(stage, manager)| Arc::new(Self::new(stage.name(), manager)) as Arc<dyn Stage>)
            .collect()
    }

    /// Names of the passes this stage runs.
    pub fn pass_names(&self) -> Vec<&str> {
        self.manager.pass_names()
    }
}

#[async_trait]
impl Stage for PassStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, program: Program) -> CompileResult<Program> {
        let manager = Arc::clone(&self.manager);
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| manager.run(program)))
            .await
            .map_err(|e| CompileError::PassFailed {
                name: self.name.clone(),
                reason: e.to_string(),
            })?
    }
}

/// Orchestrates compile jobs over a shared [`JobStore`].
pub struct Pipeline {
    store: Arc<JobStore>,
    stages: Arc<[Arc<dyn Stage>]>,
    stage_timeout: Duration,
    poll_interval: Duration,
    default_target: String,
}

impl Pipeline {
    /// Create a pipeline with the default stages.
    pub fn new(store: Arc<JobStore>, config: &PipelineConfig) -> Self {
        Self {
            store,
            stages: PassStage::defaults(&PassManagerBuilder::new()).into(),
            stage_timeout: config.stage_timeout(),
            poll_interval: config.poll_interval(),
            default_target: config.pipeline.default_target.clone(),
        }
    }

    /// Open the configured store and create a pipeline over it.
    pub fn from_config(config: &PipelineConfig) -> SchedResult<Self> {
        let storage = open_store(&config.storage)?;
        let store = JobStore::new(storage).with_retry(config.retry_policy());
        Ok(Self::new(Arc::new(store), config))
    }

    /// Replace the stage list.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<Arc<dyn Stage>>) -> Self {
        self.stages = stages.into();
        self
    }

    /// Override the per-stage time budget.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// The job store this pipeline writes to.
    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Names of the configured stages, in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Create a job for `program` and start compiling it in the background.
    ///
    /// Returns as soon as the job record exists.
    pub async fn submit(&self, program: Program, target: Option<&str>) -> SchedResult<JobId> {
        let target = target.unwrap_or(&self.default_target).to_string();
        let job_id = self.store.submit(Some(&target)).await?;

        let run = JobRun {
            store: Arc::clone(&self.store),
            stages: Arc::clone(&self.stages),
            stage_timeout: self.stage_timeout,
            target,
        };
        tokio::spawn(run.execute(job_id, program));

        Ok(job_id)
    }

    /// Parse `source` and submit it.
    ///
    /// A parse error is returned to the caller and no job is created.
    pub async fn submit_source(&self, source: &str, target: Option<&str>) -> SchedResult<JobId> {
        let program = parse_program(source)?;
        self.submit(program, target).await
    }

    /// Current snapshot of a job, or `None` for an unknown id.
    pub async fn query(&self, job_id: &JobId) -> SchedResult<Option<JobSnapshot>> {
        self.store.query(job_id).await
    }

    /// Poll until the job reaches a terminal state or `timeout` elapses.
    pub async fn wait(&self, job_id: &JobId, timeout: Duration) -> SchedResult<JobSnapshot> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.store.query(job_id).await? {
                None => return Err(SchedError::JobNotFound(job_id.to_string())),
                Some(snapshot) if snapshot.is_terminal() => return Ok(snapshot),
                Some(_) => {}
            }

            if Instant::now() >= deadline {
                return Err(SchedError::Timeout(job_id.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Everything a spawned job task needs.
struct JobRun {
    store: Arc<JobStore>,
    stages: Arc<[Arc<dyn Stage>]>,
    stage_timeout: Duration,
    target: String,
}

impl JobRun {
    #[instrument(skip_all, fields(job_id = %job_id, target = %self.target))]
    async fn execute(self, job_id: JobId, program: Program) {
        info!(stages = self.stages.len(), "Starting compile job");

        let summary = match self.run_stages(&job_id, program).await {
            Ok(result) => match self.store.complete(&job_id, result).await {
                Ok(()) => return,
                Err(e) => {
                    error!(error = %e, "Failed to mark job completed");
                    format!("persist stage failed: {e}")
                }
            },
            Err(summary) => summary,
        };

        warn!(summary = %summary, "Compile job failed");
        if let Err(e) = self.store.fail(&job_id, &summary).await {
            error!(error = %e, "Failed to mark job failed");
        }
    }

    /// Run every stage and emit the target source, or return a failure summary.
    async fn run_stages(&self, job_id: &JobId, mut program: Program) -> Result<String, String> {
        let total = self.stages.len();

        for (i, stage) in self.stages.iter().enumerate() {
            let name = stage.name();
            let started = Instant::now();

            program = self
                .run_stage(stage.as_ref(), program)
                .await
                .map_err(|e| format!("{name} stage failed: {e}"))?;

            debug!(
                stage = name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Stage finished"
            );

            let artifact = emit_program(&program, QasmVersion::V3);
            self.store
                .record_stage_output(job_id, name, artifact)
                .await
                .map_err(|e| format!("{name} stage failed: {e}"))?;

            if i + 1 < total {
                let percentage = u8::try_from((i + 1) * 100 / total).unwrap_or(99);
                self.store
                    .advance(job_id, percentage, name)
                    .await
                    .map_err(|e| format!("{name} stage failed: {e}"))?;
            }
        }

        emit_for_target(&program, &self.target).map_err(|e| format!("emit stage failed: {e}"))
    }

    async fn run_stage(&self, stage: &dyn Stage, program: Program) -> SchedResult<Program> {
        match tokio::time::timeout(self.stage_timeout, stage.run(program)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SchedError::StageTimeout {
                stage: stage.name().to_string(),
                timeout: self.stage_timeout,
            }),
        }
    }
}
