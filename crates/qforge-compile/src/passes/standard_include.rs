//! Injection of the standard gate library include.

use std::sync::Arc;

use tracing::debug;

use qforge_qasm3::syntax::{Program, Statement};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::vocabulary::GateVocabulary;
use crate::walk::walk_statements;

/// Filename of the `OpenQASM` 3 standard gate library.
pub const STDGATES_INC: &str = "stdgates.inc";

/// Filename of the `OpenQASM` 2 standard gate library.
pub const QELIB1_INC: &str = "qelib1.inc";

/// Prepend `include "stdgates.inc";` when the program calls a library gate
/// without including any standard library.
///
/// Gates defined by the program and language built-ins do not count as
/// library gates. An existing `stdgates.inc` or `qelib1.inc` include
/// anywhere in the tree satisfies the requirement; hoisting nested includes
/// is left to [`NormalizeIncludes`](super::NormalizeIncludes).
pub struct AddStandardInclude {
    vocabulary: Arc<GateVocabulary>,
}

impl AddStandardInclude {
    /// Create the pass over a vocabulary.
    pub fn new(vocabulary: Arc<GateVocabulary>) -> Self {
        Self { vocabulary }
    }
}

impl Default for AddStandardInclude {
    fn default() -> Self {
        Self::new(Arc::new(GateVocabulary::standard()))
    }
}

impl Pass for AddStandardInclude {
    fn name(&self) -> &'static str {
        "AddStandardInclude"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, program: Program) -> CompileResult<Program> {
        let mut has_library_include = false;
        let mut defined = Vec::new();
        let mut used = Vec::new();

        walk_statements(&program.statements, &mut |stmt, _| {
            match stmt {
                Statement::Include(filename) => {
                    has_library_include |= filename == STDGATES_INC || filename == QELIB1_INC;
                }
                Statement::GateDef { name, .. } => defined.push(name.as_str()),
                Statement::Gate(call) if self.vocabulary.needs_include(&call.name) => {
                    used.push(call.name.as_str());
                }
                _ => {}
            }
            Ok(())
        })?;

        let needs_library = used.iter().any(|name| !defined.contains(name));
        if has_library_include || !needs_library {
            return Ok(program);
        }

        debug!("Adding include \"{STDGATES_INC}\" for library gates");
        let mut statements = Vec::with_capacity(program.statements.len() + 1);
        statements.push(Statement::include(STDGATES_INC));
        statements.extend(program.statements);

        Ok(Program {
            version: program.version,
            statements,
        })
    }
}
