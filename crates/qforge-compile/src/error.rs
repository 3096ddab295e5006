//! Error types for the compilation crate.

use thiserror::Error;

use crate::location::Location;

/// Errors that can occur while running passes over a program tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// The tree is malformed in a way a pass cannot safely skip.
    #[error("Validation error at {location}: {message}")]
    Validation { location: Location, message: String },

    /// Gate name outside the recognised vocabulary.
    #[error("Unsupported gate '{name}' at {location}")]
    UnsupportedGate { name: String, location: Location },

    /// Compilation target has no emitter.
    #[error("Unsupported compilation target: '{0}'")]
    UnsupportedTarget(String),

    /// Source text could not be parsed into a tree.
    #[error("Parse error: {0}")]
    Parse(#[from] qforge_qasm3::ParseError),

    /// Pass execution failed for a reason other than the tree's shape.
    #[error("Pass '{name}' failed: {reason}")]
    PassFailed { name: String, reason: String },
}

impl CompileError {
    /// Create a validation error at `location`.
    pub fn validation(location: &Location, message: impl Into<String>) -> Self {
        CompileError::Validation {
            location: location.clone(),
            message: message.into(),
        }
    }

    /// Short machine-friendly kind, used in job failure summaries and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Validation { .. } => "validation",
            CompileError::UnsupportedGate { .. } => "unsupported_gate",
            CompileError::UnsupportedTarget(_) => "unsupported_target",
            CompileError::Parse(_) => "parse",
            CompileError::PassFailed { .. } => "pass_failed",
        }
    }
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
