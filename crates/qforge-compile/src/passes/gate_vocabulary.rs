//! Gate vocabulary check.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use qforge_qasm3::syntax::{GateCall, Program, Statement};

use crate::error::{CompileError, CompileResult};
use crate::location::Location;
use crate::pass::{Pass, PassKind};
use crate::vocabulary::GateVocabulary;
use crate::walk::walk_statements;

/// Require every gate call to name a known gate with the right shape.
///
/// A call resolves first against gate definitions in the program, then
/// against the vocabulary. Unknown names fail with
/// [`CompileError::UnsupportedGate`]; known names called with the wrong
/// number of parameters or qubit operands fail validation. Control
/// modifiers add operands; a whole-register operand counts once.
pub struct CheckGateVocabulary {
    vocabulary: Arc<GateVocabulary>,
}

impl CheckGateVocabulary {
    /// Create the pass over a vocabulary.
    pub fn new(vocabulary: Arc<GateVocabulary>) -> Self {
        Self { vocabulary }
    }
}

impl Default for CheckGateVocabulary {
    fn default() -> Self {
        Self::new(Arc::new(GateVocabulary::standard()))
    }
}

/// Qubit and parameter counts of a resolved gate.
#[derive(Debug, Clone, Copy)]
struct Shape {
    qubits: usize,
    params: usize,
}

impl Pass for CheckGateVocabulary {
    fn name(&self) -> &'static str {
        "CheckGateVocabulary"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, program: Program) -> CompileResult<Program> {
        let mut defined: FxHashMap<&str, Shape> = FxHashMap::default();
        walk_statements(&program.statements, &mut |stmt, _| {
            if let Statement::GateDef {
                name,
                params,
                qubits,
                ..
            } = stmt
            {
                defined.insert(
                    name.as_str(),
                    Shape {
                        qubits: qubits.len(),
                        params: params.len(),
                    },
                );
            }
            Ok(())
        })?;

        let mut calls = 0usize;
        walk_statements(&program.statements, &mut |stmt, location| {
            if let Statement::Gate(call) = stmt {
                calls += 1;
                let shape = self.resolve(call, &defined, location)?;
                check_shape(call, shape, location)?;
            }
            Ok(())
        })?;

        debug!(
            "Checked {} gate calls against {} defined and {} known gates",
            calls,
            defined.len(),
            self.vocabulary.len()
        );

        Ok(program)
    }
}

impl CheckGateVocabulary {
    fn resolve(
        &self,
        call: &GateCall,
        defined: &FxHashMap<&str, Shape>,
        location: &Location,
    ) -> CompileResult<Shape> {
        if let Some(shape) = defined.get(call.name.as_str()) {
            return Ok(*shape);
        }
        self.vocabulary
            .get(&call.name)
            .map(|sig| Shape {
                qubits: sig.num_qubits,
                params: sig.num_params,
            })
            .ok_or_else(|| CompileError::UnsupportedGate {
                name: call.name.clone(),
                location: location.clone(),
            })
    }
}

fn check_shape(call: &GateCall, shape: Shape, location: &Location) -> CompileResult<()> {
    if call.params.len() != shape.params {
        return Err(CompileError::validation(
            location,
            format!(
                "gate '{}' expects {} parameters, got {}",
                call.name,
                shape.params,
                call.params.len()
            ),
        ));
    }

    let controls: usize = call.modifiers.iter().map(|m| m.extra_qubits()).sum();
    let expected = shape.qubits + controls;
    if call.qubits.len() != expected {
        return Err(CompileError::validation(
            location,
            format!(
                "gate '{}' expects {} qubits, got {}",
                call.name,
                expected,
                call.qubits.len()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qforge_qasm3::parse_program;

    fn check(source: &str) -> CompileResult<Program> {
        CheckGateVocabulary::default().run(parse_program(source).unwrap())
    }

    #[test]
    fn test_standard_gates_accepted() {
        let result = check(
            r#"
            OPENQASM 3.0;
            qubit[3] q;
            h q[0];
            cnot q[0], q[1];
            rz(pi / 4) q[2];
            u3(0.1, 0.2, 0.3) q[0];
            ccx q[0], q[1], q[2];
            U(0, 0, 0) q[1];
            "#,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_unknown_gate_in_nested_block() {
        let err = check("OPENQASM 3.0; qubit q; bit c; if (c == 1) { h q; } else { foo q; }")
            .unwrap_err();
        match err {
            CompileError::UnsupportedGate { name, location } => {
                assert_eq!(name, "foo");
                assert_eq!(location.to_string(), "statements[2].else[0]");
            }
            other => panic!("expected unsupported gate, got {other:?}"),
        }
    }

    #[test]
    fn test_opaque_statement_not_inspected() {
        let result = check("OPENQASM 3.0; qubit q; def f(qubit a) { foo a; } h q;");
        assert!(result.is_ok());
    }

    #[test]
    fn test_defined_gate_accepted() {
        let result = check("OPENQASM 3.0; gate bell a, b { h a; cx a, b; } bell q[0], q[1];");
        assert!(result.is_ok());
    }

    #[test]
    fn test_defined_gate_arity() {
        let err = check("OPENQASM 3.0; gate bell a, b { h a; cx a, b; } bell q[0];").unwrap_err();
        assert!(err.to_string().contains("gate 'bell' expects 2 qubits, got 1"));
    }

    #[test]
    fn test_wrong_parameter_count() {
        let err = check("OPENQASM 3.0; rx q[0];").unwrap_err();
        assert!(err.to_string().contains("expects 1 parameters, got 0"));
    }

    #[test]
    fn test_control_modifiers_add_operands() {
        assert!(check("OPENQASM 3.0; ctrl @ x q[0], q[1];").is_ok());
        assert!(check("OPENQASM 3.0; ctrl(2) @ x q[0], q[1], q[2];").is_ok());
        assert!(check("OPENQASM 3.0; inv @ ctrl @ x q[0];").is_err());
    }

    #[test]
    fn test_gates_inside_definitions_checked() {
        let err = check("OPENQASM 3.0; gate g a { bogus a; }").unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedGate { ref name, .. } if name == "bogus"));
    }
}
