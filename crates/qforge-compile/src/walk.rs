//! Read-only pre-order traversal for analysis passes.

use qforge_qasm3::syntax::Statement;

use crate::error::CompileResult;
use crate::location::{Block, Location};

/// Visit every statement in pre-order, passing its location.
///
/// Children are visited after their parent, `then` before `else`. The first
/// error returned by `visit` stops the walk.
pub fn walk_statements<'a, F>(statements: &'a [Statement], visit: &mut F) -> CompileResult<()>
where
    F: FnMut(&'a Statement, &Location) -> CompileResult<()>,
{
    walk_block(statements, Block::Top, &Location::root(), visit)
}

fn walk_block<'a, F>(
    statements: &'a [Statement],
    block: Block,
    parent: &Location,
    visit: &mut F,
) -> CompileResult<()>
where
    F: FnMut(&'a Statement, &Location) -> CompileResult<()>,
{
    for (index, stmt) in statements.iter().enumerate() {
        let location = parent.child(block, index);
        visit(stmt, &location)?;

        match stmt {
            Statement::If {
                then_body,
                else_body,
                ..
            } => {
                walk_block(then_body, Block::Then, &location, visit)?;
                if let Some(else_body) = else_body {
                    walk_block(else_body, Block::Else, &location, visit)?;
                }
            }
            Statement::For { body, .. } | Statement::GateDef { body, .. } => {
                walk_block(body, Block::Body, &location, visit)?;
            }
            Statement::Include(_)
            | Statement::QubitDecl { .. }
            | Statement::BitDecl { .. }
            | Statement::Gate(_)
            | Statement::Measure { .. }
            | Statement::Reset { .. }
            | Statement::Barrier { .. }
            | Statement::Delay { .. }
            | Statement::Assignment { .. }
            | Statement::Other(_) => {}
        }
    }
    Ok(())
}
