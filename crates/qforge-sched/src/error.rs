//! Error handling for job scheduling and the compile pipeline.

use std::time::Duration;

use thiserror::Error;

use qforge_compile::CompileError;

use crate::config::ConfigError;

/// Result type for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur during scheduler operations.
#[derive(Error, Debug)]
pub enum SchedError {
    /// Job not found in the store.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A state transition broke the job lifecycle rules.
    #[error("Contract violation for job {job_id}: {message}")]
    ContractViolation { job_id: String, message: String },

    /// Persistence error.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// SQLite database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A pass or emission step rejected the program.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Parse error from QASM.
    #[error("Parse error: {0}")]
    ParseError(#[from] qforge_qasm3::ParseError),

    /// A stage ran past its time budget.
    #[error("Stage '{stage}' exceeded its time budget of {timeout:?}")]
    StageTimeout { stage: String, timeout: Duration },

    /// Timeout waiting for job completion.
    #[error("Timed out waiting for job {0}")]
    Timeout(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Internal scheduler error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SchedError {
    /// Create a contract violation error.
    pub fn violation(job_id: impl ToString, message: impl Into<String>) -> Self {
        SchedError::ContractViolation {
            job_id: job_id.to_string(),
            message: message.into(),
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SchedError::PersistenceError(_) | SchedError::DatabaseError(_)
        )
    }
}

impl From<rusqlite::Error> for SchedError {
    fn from(e: rusqlite::Error) -> Self {
        SchedError::DatabaseError(e.to_string())
    }
}
