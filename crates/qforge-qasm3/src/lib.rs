//! `OpenQASM` syntax tree, parser and emitter for qforge
//!
//! This crate turns `OpenQASM` 2/3 source into a [`syntax::Program`] tree and
//! back. The tree is what the qforge pass framework rewrites; nothing here
//! lowers to a circuit or checks gate names against a vocabulary.
//!
//! # Supported Syntax
//!
//! | Feature | Example |
//! |---------|---------|
//! | Version declaration | `OPENQASM 3.0;`, `OPENQASM 2.0;` |
//! | Includes | `include "stdgates.inc";` |
//! | Declarations | `qubit[5] q;`, `bit[5] c;`, `qreg q[5];`, `creg c[5];` |
//! | Gate calls | `h q[0];`, `rx(pi/4) q[0];`, `ctrl @ x q[0], q[1];` |
//! | Measurement | `c = measure q;`, `measure q -> c;` |
//! | Barrier, reset, delay | `barrier q;`, `reset q[0];`, `delay[100] q;` |
//! | Control flow | `if (c == 1) { ... } else { ... }`, `for i in [0:4] { ... }` |
//! | Gate definitions | `gate bell a, b { h a; cx a, b; }` |
//!
//! # Example
//!
//! ```rust
//! use qforge_qasm3::{QasmVersion, emit_program, parse_program};
//!
//! let program = parse_program(r#"
//!     OPENQASM 3.0;
//!     include "stdgates.inc";
//!     qubit[2] q;
//!     h q[0];
//!     cx q[0], q[1];
//! "#).unwrap();
//!
//! assert_eq!(program.top_level_includes(), vec!["stdgates.inc"]);
//!
//! let qasm = emit_program(&program, QasmVersion::V3);
//! assert!(qasm.starts_with("OPENQASM 3.0;"));
//! assert!(qasm.contains("cx q[0], q[1];"));
//! ```

mod ast;
mod emitter;
mod error;
mod lexer;
mod parser;

pub use emitter::{QasmVersion, emit_program};
pub use error::{ParseError, ParseResult};
pub use parser::parse_program;

/// Syntax tree types.
pub mod syntax {
    pub use crate::ast::*;
}
