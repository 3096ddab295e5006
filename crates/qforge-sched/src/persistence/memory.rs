//! In-memory job storage (no persistence).

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use super::StateStore;
use crate::error::{SchedError, SchedResult};
use crate::job::{JobId, JobRecord, StageOutput};

/// In-memory job storage.
///
/// Jobs are lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    jobs: Arc<RwLock<FxHashMap<JobId, JobRecord>>>,
    outputs: Arc<RwLock<FxHashMap<JobId, Vec<StageOutput>>>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Check if the store holds no jobs.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn insert_job(&self, job: &JobRecord) -> SchedResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(SchedError::violation(job.id, "job already exists"));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn load_job(&self, job_id: &JobId) -> SchedResult<Option<JobRecord>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(job_id).cloned())
    }

    async fn save_job(&self, job: &JobRecord) -> SchedResult<()> {
        let mut jobs = self.jobs.write().await;

        let stored = jobs
            .get_mut(&job.id)
            .ok_or_else(|| SchedError::JobNotFound(job.id.to_string()))?;

        // Keep the stored target; everything else is replaced.
        let target = stored.compilation_target().to_string();
        *stored = JobRecord::from_parts(
            job.id,
            job.status,
            job.created_at,
            job.completed_at,
            job.progress.clone(),
            job.result.clone(),
            target,
        );
        Ok(())
    }

    async fn save_stage_output(&self, job_id: &JobId, output: &StageOutput) -> SchedResult<()> {
        if !self.jobs.read().await.contains_key(job_id) {
            return Err(SchedError::JobNotFound(job_id.to_string()));
        }
        let mut outputs = self.outputs.write().await;
        outputs.entry(*job_id).or_default().push(output.clone());
        Ok(())
    }

    async fn load_stage_outputs(&self, job_id: &JobId) -> SchedResult<Vec<StageOutput>> {
        let outputs = self.outputs.read().await;
        Ok(outputs.get(job_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let job = JobRecord::new(None);

        store.insert_job(&job).await.unwrap();
        assert_eq!(store.len().await, 1);

        let loaded = store.load_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded, job);

        let mut updated = loaded.clone();
        updated.status = JobStatus::Failed;
        updated.result = Some("boom".into());
        store.save_job(&updated).await.unwrap();

        let loaded = store.load_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(loaded.result.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let job = JobRecord::new(None);

        store.insert_job(&job).await.unwrap();
        assert!(store.insert_job(&job).await.is_err());
    }

    #[tokio::test]
    async fn test_save_unknown_job() {
        let store = MemoryStore::new();
        let job = JobRecord::new(None);

        let err = store.save_job(&job).await.unwrap_err();
        assert!(matches!(err, SchedError::JobNotFound(_)));
        assert!(store.load_job(&job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stage_outputs_in_order() {
        let store = MemoryStore::new();
        let job = JobRecord::new(None);
        store.insert_job(&job).await.unwrap();

        store
            .save_stage_output(&job.id, &StageOutput::new("compile", "a"))
            .await
            .unwrap();
        store
            .save_stage_output(&job.id, &StageOutput::new("enrich", "b"))
            .await
            .unwrap();

        let stages: Vec<_> = store
            .load_stage_outputs(&job.id)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.stage)
            .collect();
        assert_eq!(stages, vec!["compile", "enrich"]);
    }
}
