//! Job record types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use qforge_compile::DEFAULT_TARGET;

use crate::error::{SchedError, SchedResult};

/// Unique identifier for a compile job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Create a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a job.
///
/// There is no "not found" member: a query for an unknown id yields `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Stages are still running.
    InProgress,
    /// All stages succeeded and the result holds the compiled program.
    Completed,
    /// A stage failed and the result holds the error summary.
    Failed,
}

impl JobStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Canonical storage spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = SchedError;

    fn from_str(s: &str) -> SchedResult<Self> {
        match s {
            "IN_PROGRESS" => Ok(JobStatus::InProgress),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(SchedError::PersistenceError(format!(
                "Unknown job status in storage: {other}"
            ))),
        }
    }
}

/// How far a job has got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Percentage in `0..=100`; reaches 100 only on completion.
    pub percentage: u8,
    /// Label of the last finished step.
    pub current_step: String,
}

impl Progress {
    /// Progress of a freshly submitted job.
    pub fn submitted() -> Self {
        Self {
            percentage: 0,
            current_step: "submitted".to_string(),
        }
    }
}

/// Persisted state of one compile request.
///
/// Only [`JobStore`](crate::JobStore) mutates records, and only through its
/// transitions. The compilation target is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier.
    pub id: JobId,
    /// Lifecycle state.
    pub status: JobStatus,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Time of the terminal transition.
    pub completed_at: Option<DateTime<Utc>>,
    /// Current progress.
    pub progress: Progress,
    /// Compiled program or error summary, once terminal.
    pub result: Option<String>,
    compilation_target: String,
}

impl JobRecord {
    /// Create an in-progress record for a new submission.
    pub fn new(compilation_target: Option<&str>) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::InProgress,
            created_at: Utc::now(),
            completed_at: None,
            progress: Progress::submitted(),
            result: None,
            compilation_target: compilation_target.unwrap_or(DEFAULT_TARGET).to_string(),
        }
    }

    /// Rebuild a record loaded from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: JobId,
        status: JobStatus,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        progress: Progress,
        result: Option<String>,
        compilation_target: String,
    ) -> Self {
        Self {
            id,
            status,
            created_at,
            completed_at,
            progress,
            result,
            compilation_target,
        }
    }

    /// Target dialect the job compiles to.
    pub fn compilation_target(&self) -> &str {
        &self.compilation_target
    }

    /// Read-only view for callers.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            status: self.status,
            created_at: self.created_at,
            completed_at: self.completed_at,
            progress: self.progress.clone(),
            result: self.result.clone(),
            compilation_target: self.compilation_target.clone(),
        }
    }
}

/// Point-in-time view of a job, as returned by status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: Progress,
    pub result: Option<String>,
    pub compilation_target: String,
}

impl JobSnapshot {
    /// Check if the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Program source emitted after a stage, kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    /// Stage name.
    pub stage: String,
    /// Emitted source.
    pub output: String,
    /// When the stage finished.
    pub recorded_at: DateTime<Utc>,
}

impl StageOutput {
    /// Record a stage's output now.
    pub fn new(stage: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            output: output.into(),
            recorded_at: Utc::now(),
        }
    }
}
