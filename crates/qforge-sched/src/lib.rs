//! qforge Job Scheduling and Pipeline Orchestration
//!
//! This crate runs compile requests as asynchronous jobs. A submission is
//! recorded as a job, then a background task drives its program through the
//! pipeline stages while callers poll the job's status.
//!
//! # Architecture
//!
//! ```text
//! +-------------+     +------------+     +-------------------+
//! |  Pipeline   |---->|  JobStore  |---->|    StateStore     |
//! | (stages,    |     | (lifecycle,|     | (MemoryStore,     |
//! |  timeouts)  |     |  retries)  |     |  SqliteStore)     |
//! +-------------+     +------------+     +-------------------+
//!        |
//!        v
//!   PassStage: compile -> enrich -> postprocess (qforge_compile)
//! ```
//!
//! # Job Lifecycle
//!
//! Jobs start `IN_PROGRESS` at 0% and end in exactly one of `COMPLETED`
//! (result holds the emitted program) or `FAILED` (result holds
//! `"<stage> stage failed: <error>"`). Unknown ids query as `None`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use qforge_sched::{JobStatus, JobStore, Pipeline, PipelineConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(Arc::new(JobStore::in_memory()), &PipelineConfig::default());
//!
//! let id = pipeline
//!     .submit_source("OPENQASM 3.0; qubit[2] q; h q[0]; cx q[0], q[1];", None)
//!     .await?;
//! let job = pipeline.wait(&id, Duration::from_secs(5)).await?;
//!
//! assert_eq!(job.status, JobStatus::Completed);
//! assert!(job.result.unwrap().contains("include \"stdgates.inc\";"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod job;
pub mod persistence;
pub mod pipeline;
pub mod store;
pub mod tracing_config;

pub use config::{ConfigError, PipelineConfig, StorageBackend, StorageConfig};
pub use error::{SchedError, SchedResult};
pub use job::{JobId, JobRecord, JobSnapshot, JobStatus, Progress, StageOutput};
pub use persistence::{MIGRATIONS, MemoryStore, Migration, SqliteStore, StateStore, open_store};
pub use pipeline::{PassStage, Pipeline, Stage};
pub use store::{JobStore, RetryPolicy};
pub use tracing_config::{TracingConfig, TracingFormat, init_default_tracing, init_tracing};
