//! Compilation targets.

use qforge_qasm3::syntax::Program;
use qforge_qasm3::{QasmVersion, emit_program};

use crate::error::{CompileError, CompileResult};

/// Target used when a submission does not name one.
pub const DEFAULT_TARGET: &str = "qasm";

/// Targets with an emitter.
pub const SUPPORTED_TARGETS: &[&str] = &["qasm", "qasm3", "qasm2"];

/// Map a compilation target name to the dialect it emits.
pub fn qasm_version(target: &str) -> CompileResult<QasmVersion> {
    match target {
        "qasm" | "qasm3" => Ok(QasmVersion::V3),
        "qasm2" => Ok(QasmVersion::V2),
        other => Err(CompileError::UnsupportedTarget(other.to_string())),
    }
}

/// Emit `program` as source for `target`.
pub fn emit_for_target(program: &Program, target: &str) -> CompileResult<String> {
    let version = qasm_version(target)?;
    Ok(emit_program(program, version))
}
