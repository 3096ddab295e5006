//! Job lifecycle state machine.
//!
//! ```text
//! submit -> IN_PROGRESS --advance--> IN_PROGRESS
//!                |
//!                +--complete--> COMPLETED
//!                +--fail------> FAILED
//! ```
//!
//! Transitions for one job are serialized by a per-job lock; different jobs
//! proceed independently. Queries do not take the lock.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rustc_hash::FxHashMap;
use tracing::{debug, error, info, warn};

use crate::error::{SchedError, SchedResult};
use crate::job::{JobId, JobRecord, JobSnapshot, JobStatus, Progress, StageOutput};
use crate::persistence::{MemoryStore, StateStore};

/// Retry schedule for persistence calls made during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

type JobLock = Arc<tokio::sync::Mutex<()>>;

/// Owner of every job state transition.
pub struct JobStore {
    storage: Arc<dyn StateStore>,
    locks: Mutex<FxHashMap<JobId, JobLock>>,
    retry: RetryPolicy,
}

impl JobStore {
    /// Create a job store over a storage backend.
    pub fn new(storage: Arc<dyn StateStore>) -> Self {
        Self {
            storage,
            locks: Mutex::new(FxHashMap::default()),
            retry: RetryPolicy::default(),
        }
    }

    /// Create a job store with in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Set the persistence retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create a new IN_PROGRESS job and return its ID.
    ///
    /// The target defaults to `"qasm"`.
    pub async fn submit(&self, compilation_target: Option<&str>) -> SchedResult<JobId> {
        let record = JobRecord::new(compilation_target);
        self.retrying("insert", &record.id, || self.storage.insert_job(&record))
            .await?;

        info!(
            job_id = %record.id,
            target = record.compilation_target(),
            "Job submitted"
        );
        Ok(record.id)
    }

    /// Record progress after a non-final step.
    ///
    /// `percentage` must not be lower than the current value and must stay
    /// below 100; only [`complete`](Self::complete) reaches 100.
    pub async fn advance(
        &self,
        job_id: &JobId,
        percentage: u8,
        current_step: &str,
    ) -> SchedResult<()> {
        self.transition(job_id, |record| {
            require_in_progress(record, "advance")?;
            if percentage >= 100 {
                return Err(SchedError::violation(
                    record.id,
                    format!("progress {percentage}% is reserved for completion"),
                ));
            }
            if percentage < record.progress.percentage {
                return Err(SchedError::violation(
                    record.id,
                    format!(
                        "progress cannot decrease from {}% to {percentage}%",
                        record.progress.percentage
                    ),
                ));
            }
            record.progress = Progress {
                percentage,
                current_step: current_step.to_string(),
            };
            Ok(())
        })
        .await?;

        debug!(job_id = %job_id, percentage, step = current_step, "Job advanced");
        Ok(())
    }

    /// Mark a job COMPLETED with its compiled program.
    pub async fn complete(&self, job_id: &JobId, result: String) -> SchedResult<()> {
        self.transition(job_id, |record| {
            require_in_progress(record, "complete")?;
            record.status = JobStatus::Completed;
            record.completed_at = Some(Utc::now());
            record.progress = Progress {
                percentage: 100,
                current_step: "completed".to_string(),
            };
            record.result = Some(result);
            Ok(())
        })
        .await?;

        info!(job_id = %job_id, "Job completed");
        Ok(())
    }

    /// Mark a job FAILED with an error summary. Progress is left as it was.
    pub async fn fail(&self, job_id: &JobId, error_summary: &str) -> SchedResult<()> {
        self.transition(job_id, |record| {
            require_in_progress(record, "fail")?;
            record.status = JobStatus::Failed;
            record.completed_at = Some(Utc::now());
            record.result = Some(error_summary.to_string());
            Ok(())
        })
        .await?;

        info!(job_id = %job_id, summary = error_summary, "Job failed");
        Ok(())
    }

    /// Current snapshot of a job, or `None` for an unknown id.
    pub async fn query(&self, job_id: &JobId) -> SchedResult<Option<JobSnapshot>> {
        let record = self.storage.load_job(job_id).await?;
        Ok(record.as_ref().map(JobRecord::snapshot))
    }

    /// Save an artifact produced by a stage.
    pub async fn record_stage_output(
        &self,
        job_id: &JobId,
        stage: &str,
        output: String,
    ) -> SchedResult<()> {
        let output = StageOutput::new(stage, output);
        self.retrying("save stage output", job_id, || {
            self.storage.save_stage_output(job_id, &output)
        })
        .await
    }

    /// Artifacts saved for a job, in stage order.
    pub async fn stage_outputs(&self, job_id: &JobId) -> SchedResult<Vec<StageOutput>> {
        self.storage.load_stage_outputs(job_id).await
    }

    /// Load, modify and save a record while holding the job's lock.
    async fn transition<F>(&self, job_id: &JobId, apply: F) -> SchedResult<JobRecord>
    where
        F: FnOnce(&mut JobRecord) -> SchedResult<()>,
    {
        let lock = self.job_lock(job_id)?;
        let _guard = lock.lock().await;

        let loaded = self
            .retrying("load", job_id, || self.storage.load_job(job_id))
            .await?;
        let Some(mut record) = loaded else {
            self.release_lock(job_id);
            return Err(SchedError::JobNotFound(job_id.to_string()));
        };

        let was_terminal = record.status.is_terminal();
        if let Err(e) = apply(&mut record) {
            if was_terminal {
                self.release_lock(job_id);
            }
            return Err(e);
        }

        self.retrying("save", job_id, || self.storage.save_job(&record))
            .await?;

        // Entries only live while a job can still change.
        if record.status.is_terminal() {
            self.release_lock(job_id);
        }
        Ok(record)
    }

    async fn retrying<T, F, Fut>(&self, operation: &str, job_id: &JobId, mut call: F) -> SchedResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SchedResult<T>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                    let backoff = self.retry.delay(attempt);
                    warn!(
                        job_id = %job_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Retrying {} after transient failure (backoff {:?})",
                        operation,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!(
                            job_id = %job_id,
                            attempts = attempt + 1,
                            error = %e,
                            "Giving up on {}",
                            operation
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    fn job_lock(&self, job_id: &JobId) -> SchedResult<JobLock> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| SchedError::Internal(format!("job lock table poisoned: {e}")))?;
        Ok(Arc::clone(locks.entry(*job_id).or_default()))
    }

    fn release_lock(&self, job_id: &JobId) {
        if let Ok(mut locks) = self.locks.lock() {
            locks.remove(job_id);
        }
    }
}

fn require_in_progress(record: &JobRecord, operation: &str) -> SchedResult<()> {
    if record.status == JobStatus::InProgress {
        Ok(())
    } else {
        Err(SchedError::violation(
            record.id,
            format!("cannot {operation} a job that is already {}", record.status),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_defaults() {
        let store = JobStore::in_memory();
        let id = store.submit(None).await.unwrap();

        let snapshot = store.query(&id).await.unwrap().unwrap();
        assert_eq!(snapshot.status, JobStatus::InProgress);
        assert_eq!(snapshot.progress, Progress::submitted());
        assert_eq!(snapshot.compilation_target, "qasm");
        assert!(snapshot.completed_at.is_none());
        assert!(snapshot.result.is_none());
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let store = JobStore::in_memory();
        let id = store.submit(None).await.unwrap();

        store.advance(&id, 33, "compile").await.unwrap();
        store.advance(&id, 33, "compile").await.unwrap();
        store.advance(&id, 66, "enrich").await.unwrap();

        let err = store.advance(&id, 50, "rewind").await.unwrap_err();
        assert!(matches!(err, SchedError::ContractViolation { .. }));

        let err = store.advance(&id, 100, "done").await.unwrap_err();
        assert!(matches!(err, SchedError::ContractViolation { .. }));

        let snapshot = store.query(&id).await.unwrap().unwrap();
        assert_eq!(snapshot.progress.percentage, 66);
        assert_eq!(snapshot.progress.current_step, "enrich");
    }

    #[tokio::test]
    async fn test_complete_exactly_once() {
        let store = JobStore::in_memory();
        let id = store.submit(Some("qasm2")).await.unwrap();

        store.complete(&id, "OPENQASM 2.0;".into()).await.unwrap();
        let first = store.query(&id).await.unwrap().unwrap();
        assert_eq!(first.status, JobStatus::Completed);
        assert_eq!(first.progress.percentage, 100);
        assert_eq!(first.progress.current_step, "completed");

        assert!(store.complete(&id, "again".into()).await.is_err());
        assert!(store.fail(&id, "late failure").await.is_err());
        assert!(store.advance(&id, 99, "late").await.is_err());

        let after = store.query(&id).await.unwrap().unwrap();
        assert_eq!(after, first);
    }

    #[tokio::test]
    async fn test_fail_keeps_progress() {
        let store = JobStore::in_memory();
        let id = store.submit(None).await.unwrap();

        store.advance(&id, 33, "compile").await.unwrap();
        store.fail(&id, "enrich stage failed: boom").await.unwrap();

        let snapshot = store.query(&id).await.unwrap().unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.progress.percentage, 33);
        assert_eq!(snapshot.result.as_deref(), Some("enrich stage failed: boom"));
        assert!(snapshot.completed_at.is_some());

        assert!(store.complete(&id, "ok".into()).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = JobStore::in_memory();
        let id = JobId::new();

        assert!(store.query(&id).await.unwrap().is_none());
        assert!(matches!(
            store.advance(&id, 10, "x").await,
            Err(SchedError::JobNotFound(_))
        ));
        assert!(matches!(
            store.fail(&id, "x").await,
            Err(SchedError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_terminal_transitions() {
        let store = Arc::new(JobStore::in_memory());
        let id = store.submit(None).await.unwrap();

        let handles = (0..8).map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                if i % 2 == 0 {
                    store.complete(&id, format!("result {i}")).await
                } else {
                    store.fail(&id, &format!("failure {i}")).await
                }
            })
        });

        let results = futures::future::join_all(handles).await;
        let successes = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(()))))
            .count();
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_lock_table_drains() {
        let store = JobStore::in_memory();

        for _ in 0..100 {
            let _ = store.advance(&JobId::new(), 10, "x").await;
        }

        let id = store.submit(None).await.unwrap();
        store.advance(&id, 33, "compile").await.unwrap();
        assert_eq!(store.locks.lock().unwrap().len(), 1);

        store.complete(&id, "done".into()).await.unwrap();
        for _ in 0..10 {
            assert!(store.fail(&id, "late").await.is_err());
        }

        assert!(store.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn test_retry_delay_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff: Duration::from_millis(10),
        };
        assert_eq!(policy.delay(0), Duration::from_millis(10));
        assert_eq!(policy.delay(1), Duration::from_millis(20));
        assert_eq!(policy.delay(2), Duration::from_millis(40));
    }
}
