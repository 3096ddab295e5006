//! Persistence layer for job state.
//!
//! - [`MemoryStore`]: in-process storage, lost on exit
//! - [`SqliteStore`]: `SQLite` database with a migration ledger

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{MIGRATIONS, Migration, SqliteStore};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{SchedError, SchedResult};
use crate::job::{JobId, JobRecord, StageOutput};

/// Trait for persistent job storage.
///
/// Every write replaces a whole record, so a failed write leaves the
/// previously committed record visible.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Store a new job. Fails if the id is already present.
    async fn insert_job(&self, job: &JobRecord) -> SchedResult<()>;

    /// Load a job from the store.
    async fn load_job(&self, job_id: &JobId) -> SchedResult<Option<JobRecord>>;

    /// Replace an existing job's mutable state.
    ///
    /// The compilation target of the stored record is never changed.
    async fn save_job(&self, job: &JobRecord) -> SchedResult<()>;

    /// Append a stage artifact for a job.
    async fn save_stage_output(&self, job_id: &JobId, output: &StageOutput) -> SchedResult<()>;

    /// Load a job's stage artifacts in the order they were saved.
    async fn load_stage_outputs(&self, job_id: &JobId) -> SchedResult<Vec<StageOutput>>;
}

/// Open the store described by `config`.
pub fn open_store(config: &StorageConfig) -> SchedResult<Arc<dyn StateStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Sqlite => {
            let path = config.path.as_deref().ok_or_else(|| {
                SchedError::Internal("sqlite storage requires a database path".to_string())
            })?;
            Ok(Arc::new(SqliteStore::new(path)?))
        }
    }
}
