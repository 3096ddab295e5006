//! Include deduplication and hoisting.

use rustc_hash::FxHashSet;
use tracing::debug;

use qforge_qasm3::syntax::{Program, Statement};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};

/// Collapse every `include` in the tree into one deduplicated block at the top.
///
/// Includes are collected in pre-order (a nested include counts where its
/// enclosing statement sits, then in body order) and each distinct filename
/// keeps its first position. All other statements keep their relative order
/// and nesting. Filenames are compared as exact strings.
pub struct NormalizeIncludes;

impl Pass for NormalizeIncludes {
    fn name(&self) -> &'static str {
        "NormalizeIncludes"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn should_run(&self, program: &Program) -> bool {
        contains_include(&program.statements)
    }

    fn run(&self, program: Program) -> CompileResult<Program> {
        let mut includes = IncludeSet::default();
        let body = strip_includes(program.statements, &mut includes);

        debug!(
            "Hoisting {} distinct includes ({} removed)",
            includes.order.len(),
            includes.removed
        );

        let mut statements = Vec::with_capacity(includes.order.len() + body.len());
        statements.extend(includes.order.into_iter().map(Statement::Include));
        statements.extend(body);

        Ok(Program {
            version: program.version,
            statements,
        })
    }
}

/// Filenames in first-seen order.
#[derive(Default)]
struct IncludeSet {
    order: Vec<String>,
    seen: FxHashSet<String>,
    removed: usize,
}

impl IncludeSet {
    fn record(&mut self, filename: String) {
        self.removed += 1;
        if self.seen.insert(filename.clone()) {
            self.order.push(filename);
        }
    }
}

/// Rebuild a statement list without its includes, descending into nested blocks.
fn strip_includes(statements: Vec<Statement>, includes: &mut IncludeSet) -> Vec<Statement> {
    let mut kept = Vec::with_capacity(statements.len());

    for stmt in statements {
        match stmt {
            Statement::Include(filename) => includes.record(filename),
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let then_body = strip_includes(then_body, includes);
                let else_body = else_body.map(|body| strip_includes(body, includes));
                kept.push(Statement::If {
                    condition,
                    then_body,
                    else_body,
                });
            }
            Statement::For {
                variable,
                range,
                body,
            } => kept.push(Statement::For {
                variable,
                range,
                body: strip_includes(body, includes),
            }),
            Statement::GateDef {
                name,
                params,
                qubits,
                body,
            } => kept.push(Statement::GateDef {
                name,
                params,
                qubits,
                body: strip_includes(body, includes),
            }),
            stmt @ (Statement::QubitDecl { .. }
            | Statement::BitDecl { .. }
            | Statement::Gate(_)
            | Statement::Measure { .. }
            | Statement::Reset { .. }
            | Statement::Barrier { .. }
            | Statement::Delay { .. }
            | Statement::Assignment { .. }
            | Statement::Other(_)) => kept.push(stmt),
        }
    }

    kept
}

fn contains_include(statements: &[Statement]) -> bool {
    statements.iter().any(|stmt| {
        matches!(stmt, Statement::Include(_))
            || stmt.blocks().into_iter().any(contains_include)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qforge_qasm3::parse_program;
    use qforge_qasm3::syntax::QubitRef;

    fn normalize(program: Program) -> Program {
        NormalizeIncludes.run(program).unwrap()
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let program = Program::v3(vec![
            Statement::include("stdgates.inc"),
            Statement::include("other.inc"),
            Statement::include("stdgates.inc"),
            Statement::gate("x", vec![QubitRef::single("q", 0)]),
            Statement::gate("cx", vec![QubitRef::single("q", 0), QubitRef::single("q", 1)]),
        ]);

        let result = normalize(program);
        assert_eq!(
            result.statements,
            vec![
                Statement::include("stdgates.inc"),
                Statement::include("other.inc"),
                Statement::gate("x", vec![QubitRef::single("q", 0)]),
                Statement::gate("cx", vec![QubitRef::single("q", 0), QubitRef::single("q", 1)]),
            ]
        );
    }

    #[test]
    fn test_opaque_statements_stay_in_place() {
        let program = parse_program(
            r#"
            OPENQASM 3.0;
            include "a.inc";
            while (c == 0) { x q; }
            input float theta;
            include "a.inc";
            include "b.inc";
            "#,
        )
        .unwrap();

        let result = normalize(program);
        assert_eq!(
            result.statements,
            vec![
                Statement::include("a.inc"),
                Statement::include("b.inc"),
                Statement::other("while (c == 0) { x q; }"),
                Statement::other("input float theta;"),
            ]
        );
    }

    #[test]
    fn test_hoists_interleaved_includes() {
        let program = parse_program(
            r#"
            OPENQASM 3.0;
            include "a.inc";
            qubit[2] q;
            include "b.inc";
            h q[0];
            include "a.inc";
            include "c.inc";
            x q[1];
            "#,
        )
        .unwrap();

        let result = normalize(program);
        assert_eq!(result.top_level_includes(), vec!["a.inc", "b.inc", "c.inc"]);
        let kinds: Vec<_> = result.statements[3..].iter().map(Statement::kind).collect();
        assert_eq!(kinds, vec!["qubit declaration", "gate call", "gate call"]);
    }

    #[test]
    fn test_hoists_nested_includes_in_preorder() {
        let program = parse_program(
            r#"
            OPENQASM 3.0;
            qubit q;
            bit c;
            if (c == 1) {
                include "then.inc";
                x q;
            } else {
                include "else.inc";
            }
            for i in [0:3] {
                include "loop.inc";
                include "then.inc";
                h q;
            }
            include "top.inc";
            "#,
        )
        .unwrap();

        let result = normalize(program);
        assert_eq!(
            result.top_level_includes(),
            vec!["then.inc", "else.inc", "loop.inc", "top.inc"]
        );

        let Statement::If {
            then_body,
            else_body,
            ..
        } = &result.statements[6]
        else {
            panic!("expected if statement after declarations");
        };
        assert_eq!(then_body.len(), 1);
        assert_eq!(else_body.as_deref(), Some(&[][..]));

        let Statement::For { body, .. } = &result.statements[7] else {
            panic!("expected for loop");
        };
        assert_eq!(body.len(), 1);
        assert_eq!(result.statements.len(), 8);
    }

    #[test]
    fn test_no_includes_is_unchanged() {
        let program = parse_program("OPENQASM 3.0; qubit q; h q; if (c == 0) { x q; }").unwrap();

        assert!(!NormalizeIncludes.should_run(&program));
        assert_eq!(normalize(program.clone()), program);
    }

    #[test]
    fn test_empty_program() {
        let program = Program::v3(vec![]);
        assert_eq!(normalize(program.clone()), program);
    }

    #[test]
    fn test_filenames_compared_exactly() {
        let program = Program::v3(vec![
            Statement::include("stdgates.inc"),
            Statement::include("StdGates.inc"),
            Statement::include("./stdgates.inc"),
        ]);

        assert_eq!(normalize(program).top_level_includes().len(), 3);
    }

    #[test]
    fn test_idempotent() {
        let program = parse_program(
            r#"
            OPENQASM 3.0;
            qubit q;
            include "b.inc";
            gate g a { include "a.inc"; h a; }
            include "b.inc";
            "#,
        )
        .unwrap();

        let once = normalize(program);
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }
}
