//! Pass trait and types for compilation passes.

use qforge_qasm3::syntax::Program;

use crate::error::CompileResult;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Analysis pass that inspects the tree and returns it unchanged.
    Analysis,
    /// Transformation pass that rebuilds the tree.
    Transformation,
}

/// A compilation pass that operates on a program tree.
///
/// Passes are the unit of work inside a pipeline stage. A pass takes
/// ownership of the tree and returns the (possibly rebuilt) tree, so the
/// manager can chain passes without cloning.
///
/// Implementations must be deterministic and must handle every
/// [`Statement`](qforge_qasm3::syntax::Statement) variant, passing through
/// nodes they do not care about unchanged. Any state a pass needs while
/// walking the tree lives in locals of `run`, never in `self`.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Run the pass on the given program.
    ///
    /// Analysis passes return `program` as received. A pass that cannot make
    /// progress on malformed input returns
    /// [`CompileError::Validation`](crate::CompileError::Validation).
    fn run(&self, program: Program) -> CompileResult<Program>;

    /// Whether running the pass twice yields the same tree as running it once.
    fn is_idempotent(&self) -> bool {
        true
    }

    /// Check if this pass should run on the current tree.
    ///
    /// This can be overridden to skip passes that would be a no-op.
    fn should_run(&self, _program: &Program) -> bool {
        true
    }
}
