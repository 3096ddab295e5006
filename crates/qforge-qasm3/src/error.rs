//! Error types for the QASM front end.

use thiserror::Error;

/// Errors that can occur during parsing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Lexer error (invalid token).
    #[error("Lexer error at line {line}: {message}")]
    LexerError { line: usize, message: String },

    /// Unexpected token.
    #[error("Unexpected token at line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input: {0}")]
    UnexpectedEof(String),

    /// Invalid or unsupported version header.
    #[error("Invalid OPENQASM version: {0}")]
    InvalidVersion(String),

    /// Literal does not fit the target integer width.
    #[error("Integer literal {value} out of range at line {line}")]
    IntegerOutOfRange { line: usize, value: u64 },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
