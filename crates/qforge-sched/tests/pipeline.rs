//! Pipeline integration tests.
//!
//! These drive whole jobs through the orchestrator with in-memory storage,
//! using wrapper stores and stages to observe progress and inject failures.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use qforge_compile::{CompileResult, PassManagerBuilder};
use qforge_qasm3::syntax::Program;
use qforge_sched::{
    JobId, JobRecord, JobStatus, JobStore, MemoryStore, PassStage, Pipeline, PipelineConfig,
    RetryPolicy, SchedError, SchedResult, Stage, StageOutput, StateStore,
};

const WAIT: Duration = Duration::from_secs(10);

const INCLUDE_SCENARIO: &str = r#"OPENQASM 3.0;
include "stdgates.inc";
include "other.inc";
include "stdgates.inc";
x q[0];
cx q[0], q[1];
"#;

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.pipeline.poll_interval_ms = 5;
    config
}

fn pipeline_over(storage: Arc<dyn StateStore>) -> Pipeline {
    let store = JobStore::new(storage).with_retry(RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_millis(1),
    });
    Pipeline::new(Arc::new(store), &config())
}

/// Records the progress of every saved record.
#[derive(Default)]
struct RecordingStore {
    inner: MemoryStore,
    saves: Mutex<Vec<(JobStatus, u8, String)>>,
}

impl RecordingStore {
    fn saves(&self) -> Vec<(JobStatus, u8, String)> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateStore for RecordingStore {
    async fn insert_job(&self, job: &JobRecord) -> SchedResult<()> {
        self.inner.insert_job(job).await
    }

    async fn load_job(&self, job_id: &JobId) -> SchedResult<Option<JobRecord>> {
        self.inner.load_job(job_id).await
    }

    async fn save_job(&self, job: &JobRecord) -> SchedResult<()> {
        self.inner.save_job(job).await?;
        self.saves.lock().unwrap().push((
            job.status,
            job.progress.percentage,
            job.progress.current_step.clone(),
        ));
        Ok(())
    }

    async fn save_stage_output(&self, job_id: &JobId, output: &StageOutput) -> SchedResult<()> {
        self.inner.save_stage_output(job_id, output).await
    }

    async fn load_stage_outputs(&self, job_id: &JobId) -> SchedResult<Vec<StageOutput>> {
        self.inner.load_stage_outputs(job_id).await
    }
}

/// Fails the first `failures` record saves with a transient error.
struct FlakyStore {
    inner: MemoryStore,
    failures: AtomicU32,
    attempts: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn insert_job(&self, job: &JobRecord) -> SchedResult<()> {
        self.inner.insert_job(job).await
    }

    async fn load_job(&self, job_id: &JobId) -> SchedResult<Option<JobRecord>> {
        self.inner.load_job(job_id).await
    }

    async fn save_job(&self, job: &JobRecord) -> SchedResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SchedError::PersistenceError("disk busy".into()));
        }
        self.inner.save_job(job).await
    }

    async fn save_stage_output(&self, job_id: &JobId, output: &StageOutput) -> SchedResult<()> {
        self.inner.save_stage_output(job_id, output).await
    }

    async fn load_stage_outputs(&self, job_id: &JobId) -> SchedResult<Vec<StageOutput>> {
        self.inner.load_stage_outputs(job_id).await
    }
}

/// Refuses to persist COMPLETED records.
#[derive(Default)]
struct NoCompletionStore {
    inner: MemoryStore,
}

#[async_trait]
impl StateStore for NoCompletionStore {
    async fn insert_job(&self, job: &JobRecord) -> SchedResult<()> {
        self.inner.insert_job(job).await
    }

    async fn load_job(&self, job_id: &JobId) -> SchedResult<Option<JobRecord>> {
        self.inner.load_job(job_id).await
    }

    async fn save_job(&self, job: &JobRecord) -> SchedResult<()> {
        if job.status == JobStatus::Completed {
            return Err(SchedError::PersistenceError("result column full".into()));
        }
        self.inner.save_job(job).await
    }

    async fn save_stage_output(&self, job_id: &JobId, output: &StageOutput) -> SchedResult<()> {
        self.inner.save_stage_output(job_id, output).await
    }

    async fn load_stage_outputs(&self, job_id: &JobId) -> SchedResult<Vec<StageOutput>> {
        self.inner.load_stage_outputs(job_id).await
    }
}

/// A stage that never finishes within any reasonable budget.
struct SlowStage;

#[async_trait]
impl Stage for SlowStage {
    fn name(&self) -> &str {
        "slow"
    }

    async fn run(&self, program: Program) -> CompileResult<Program> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(program)
    }
}

#[tokio::test]
async fn test_include_scenario_completes_with_progress() {
    let storage = Arc::new(RecordingStore::default());
    let pipeline = pipeline_over(storage.clone());

    let id = pipeline.submit_source(INCLUDE_SCENARIO, None).await.unwrap();
    let job = pipeline.wait(&id, WAIT).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.result.as_deref(),
        Some(
            "OPENQASM 3.0;\ninclude \"stdgates.inc\";\ninclude \"other.inc\";\nx q[0];\ncx q[0], q[1];\n"
        )
    );
    assert!(job.completed_at.is_some());

    assert_eq!(
        storage.saves(),
        vec![
            (JobStatus::InProgress, 33, "compile".to_string()),
            (JobStatus::InProgress, 66, "enrich".to_string()),
            (JobStatus::Completed, 100, "completed".to_string()),
        ]
    );

    let outputs = pipeline.store().stage_outputs(&id).await.unwrap();
    let stages: Vec<&str> = outputs.iter().map(|o| o.stage.as_str()).collect();
    assert_eq!(stages, vec!["compile", "enrich", "postprocess"]);
    assert_eq!(outputs[2].output, job.result.unwrap());
}

#[tokio::test]
async fn test_opaque_statements_survive_pipeline() {
    let pipeline = pipeline_over(Arc::new(MemoryStore::new()));

    let source = "OPENQASM 3.0;\ninput float theta;\ninclude \"stdgates.inc\";\nqubit q;\nrz(theta) q;\nwhile (theta > 0) { x q; }\ninclude \"stdgates.inc\";\n";
    let id = pipeline.submit_source(source, None).await.unwrap();
    let job = pipeline.wait(&id, WAIT).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.result.as_deref(),
        Some(
            "OPENQASM 3.0;\ninclude \"stdgates.inc\";\ninput float theta;\nqubit q;\nrz(theta) q;\nwhile (theta > 0) { x q; }\n"
        )
    );
}

#[tokio::test]
async fn test_unsupported_gate_fails_at_enrich() {
    let storage = Arc::new(RecordingStore::default());
    let pipeline = pipeline_over(storage.clone());

    let id = pipeline
        .submit_source("OPENQASM 3.0; qubit q; foo q;", None)
        .await
        .unwrap();
    let job = pipeline.wait(&id, WAIT).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    let summary = job.result.unwrap();
    assert!(summary.starts_with("enrich stage failed:"), "{summary}");
    assert!(summary.contains("foo"), "{summary}");
    assert_eq!(job.progress.percentage, 33);

    let outputs = pipeline.store().stage_outputs(&id).await.unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].stage, "compile");
}

#[tokio::test]
async fn test_validation_error_fails_at_compile() {
    let pipeline = pipeline_over(Arc::new(MemoryStore::new()));

    let id = pipeline
        .submit_source("OPENQASM 3.0; qubit[2] q; qubit[3] q;", None)
        .await
        .unwrap();
    let job = pipeline.wait(&id, WAIT).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result.unwrap().starts_with("compile stage failed:"));
    assert_eq!(job.progress.percentage, 0);
}

#[tokio::test]
async fn test_stage_timeout_fails_job() {
    let pipeline = pipeline_over(Arc::new(MemoryStore::new()))
        .with_stages(vec![
            PassStage::defaults(&PassManagerBuilder::new()).remove(0),
            Arc::new(SlowStage) as Arc<dyn Stage>,
        ])
        .with_stage_timeout(Duration::from_millis(50));

    let id = pipeline
        .submit_source("OPENQASM 3.0; qubit q; h q;", None)
        .await
        .unwrap();
    let job = pipeline.wait(&id, WAIT).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    let summary = job.result.unwrap();
    assert!(summary.starts_with("slow stage failed:"), "{summary}");
    assert!(summary.contains("time budget"), "{summary}");
    assert_eq!(job.progress.percentage, 50);
    assert_eq!(job.progress.current_step, "compile");
}

#[tokio::test]
async fn test_query_answers_while_stage_runs() {
    let pipeline = pipeline_over(Arc::new(MemoryStore::new()))
        .with_stages(vec![Arc::new(SlowStage) as Arc<dyn Stage>])
        .with_stage_timeout(Duration::from_secs(3600));

    let id = pipeline
        .submit_source("OPENQASM 3.0; qubit q; h q;", None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let snapshot = pipeline.query(&id).await.unwrap().unwrap();
    assert_eq!(snapshot.status, JobStatus::InProgress);
    assert_eq!(snapshot.progress.percentage, 0);

    let err = pipeline
        .wait(&id, Duration::from_millis(30))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedError::Timeout(_)));
}

#[tokio::test]
async fn test_transient_save_failures_are_retried() {
    let storage = Arc::new(FlakyStore::new(2));
    let pipeline = pipeline_over(storage.clone());

    let id = pipeline
        .submit_source("OPENQASM 3.0; qubit q; h q;", None)
        .await
        .unwrap();
    let job = pipeline.wait(&id, WAIT).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    // Two failed attempts on top of the three successful saves.
    assert_eq!(storage.attempts.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_exhausted_retries_keep_committed_record() {
    let storage = Arc::new(FlakyStore::new(u32::MAX));
    let store = JobStore::new(storage.clone()).with_retry(RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_millis(1),
    });

    let id = store.submit(None).await.unwrap();
    let err = store.advance(&id, 40, "compile").await.unwrap_err();
    assert!(matches!(err, SchedError::PersistenceError(_)));
    assert_eq!(storage.attempts.load(Ordering::SeqCst), 3);

    let snapshot = store.query(&id).await.unwrap().unwrap();
    assert_eq!(snapshot.status, JobStatus::InProgress);
    assert_eq!(snapshot.progress.percentage, 0);
}

#[tokio::test]
async fn test_unpersistable_completion_fails_job() {
    let pipeline = pipeline_over(Arc::new(NoCompletionStore::default()));

    let id = pipeline
        .submit_source("OPENQASM 3.0; qubit q; h q;", None)
        .await
        .unwrap();
    let job = pipeline.wait(&id, WAIT).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.progress.percentage, 66);
    let summary = job.result.unwrap();
    assert!(summary.starts_with("persist stage failed:"), "{summary}");
    assert!(summary.contains("result column full"), "{summary}");
}

#[tokio::test]
async fn test_unknown_target_fails_at_emit() {
    let pipeline = pipeline_over(Arc::new(MemoryStore::new()));

    let id = pipeline
        .submit_source("OPENQASM 3.0; qubit q; h q;", Some("quil"))
        .await
        .unwrap();
    let job = pipeline.wait(&id, WAIT).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.compilation_target, "quil");
    assert_eq!(
        job.result.as_deref(),
        Some("emit stage failed: Unsupported compilation target: 'quil'")
    );
}

#[tokio::test]
async fn test_qasm2_target() {
    let pipeline = pipeline_over(Arc::new(MemoryStore::new()));

    let id = pipeline
        .submit_source("OPENQASM 3.0; qubit[2] q; h q[0]; cx q[0], q[1];", Some("qasm2"))
        .await
        .unwrap();
    let job = pipeline.wait(&id, WAIT).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    let result = job.result.unwrap();
    assert!(result.starts_with("OPENQASM 2.0;\ninclude \"stdgates.inc\";\n"));
    assert!(result.contains("qreg q[2];"));
}

#[tokio::test]
async fn test_parse_error_creates_no_job() {
    let memory = MemoryStore::new();
    let pipeline = pipeline_over(Arc::new(memory.clone()));

    let err = pipeline
        .submit_source("OPENQASM 3.0; h q", None)
        .await
        .unwrap_err();

    assert!(matches!(err, SchedError::ParseError(_)));
    assert!(memory.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_jobs_are_independent() {
    let pipeline = Arc::new(pipeline_over(Arc::new(MemoryStore::new())));

    let mut ids = Vec::new();
    for i in 0..12 {
        let source = if i % 3 == 0 {
            "OPENQASM 3.0; qubit q; nope q;".to_string()
        } else {
            format!("OPENQASM 3.0; qubit[{n}] q; h q[0];", n = i + 1)
        };
        ids.push((i, pipeline.submit_source(&source, None).await.unwrap()));
    }

    for (i, id) in ids {
        let job = pipeline.wait(&id, WAIT).await.unwrap();
        let expected = if i % 3 == 0 {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        assert_eq!(job.status, expected, "job {i}");
    }
}
