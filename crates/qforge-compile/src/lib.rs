//! qforge Pass Framework
//!
//! This crate provides the pass infrastructure that rewrites `OpenQASM`
//! syntax trees between parsing and emission. Each pipeline stage owns a
//! [`PassManager`]; passes take the tree by value and hand back the rebuilt
//! tree, so stages compose without shared mutable state.
//!
//! # Architecture
//!
//! ```text
//! Program (qforge_qasm3::syntax)
//!       |
//!       v
//! +-------------+
//! | compile     |  ValidateStructure
//! +-------------+
//!       |
//! +-------------+
//! | enrich      |  CheckGateVocabulary, AddStandardInclude
//! +-------------+
//!       |
//! +-------------+
//! | postprocess |  NormalizeIncludes
//! +-------------+
//!       |
//!       v
//! emit_for_target(program, "qasm" | "qasm3" | "qasm2")
//! ```
//!
//! # Example: Running a Stage
//!
//! ```rust
//! use qforge_compile::{PassManagerBuilder, PipelineStage};
//! use qforge_qasm3::parse_program;
//!
//! let program = parse_program(r#"
//!     OPENQASM 3.0;
//!     include "stdgates.inc";
//!     qubit[2] q;
//!     include "other.inc";
//!     include "stdgates.inc";
//!     x q[0];
//! "#).unwrap();
//!
//! let pm = PassManagerBuilder::new().build(PipelineStage::Postprocess);
//! let program = pm.run(program).unwrap();
//!
//! assert_eq!(program.top_level_includes(), vec!["stdgates.inc", "other.inc"]);
//! ```
//!
//! # Writing a Pass
//!
//! Implement [`Pass`]. A pass must handle every statement variant and keep
//! its traversal state in locals of [`Pass::run`]. Analysis passes can use
//! [`walk_statements`] to visit the tree in pre-order with the
//! [`Location`] of each statement, which is what errors report.

pub mod error;
pub mod location;
pub mod manager;
pub mod pass;
pub mod passes;
pub mod target;
pub mod vocabulary;
mod walk;

pub use error::{CompileError, CompileResult};
pub use location::{Block, Location};
pub use manager::{PassManager, PassManagerBuilder, PipelineStage};
pub use pass::{Pass, PassKind};
pub use target::{DEFAULT_TARGET, SUPPORTED_TARGETS, emit_for_target, qasm_version};
pub use vocabulary::{GateSignature, GateVocabulary};
pub use walk::walk_statements;
