//! Pass manager for orchestrating compilation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use qforge_qasm3::syntax::Program;

use crate::error::CompileResult;
use crate::pass::Pass;
use crate::passes::{AddStandardInclude, CheckGateVocabulary, NormalizeIncludes, ValidateStructure};
use crate::vocabulary::GateVocabulary;

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes in order, feeding each one's output to the next.
    #[instrument(skip(self, program))]
    pub fn run(&self, program: Program) -> CompileResult<Program> {
        info!(
            "Running pass manager with {} passes on program with {} statements",
            self.passes.len(),
            program.statements.len()
        );

        let mut program = program;
        for pass in &self.passes {
            if pass.should_run(&program) {
                debug!("Running pass: {}", pass.name());
                program = pass.run(program)?;
                debug!(
                    "Pass {} completed, statements: {}",
                    pass.name(),
                    program.num_statements()
                );
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!(
            "Pass manager completed, statements: {}",
            program.num_statements()
        );

        Ok(program)
    }

    /// Names of the passes, in execution order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Whether every pass in the manager is idempotent.
    pub fn is_idempotent(&self) -> bool {
        self.passes.iter().all(|p| p.is_idempotent())
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PassManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassManager")
            .field("passes", &self.pass_names())
            .finish()
    }
}

/// A phase of the compilation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Structural validation of the submitted tree.
    Compile,
    /// Vocabulary checks and library includes.
    Enrich,
    /// Tree clean-up before emission.
    Postprocess,
}

impl PipelineStage {
    /// All stages in execution order.
    pub const ALL: [PipelineStage; 3] = [
        PipelineStage::Compile,
        PipelineStage::Enrich,
        PipelineStage::Postprocess,
    ];

    /// Stage name as used in progress steps and logs.
    pub fn name(self) -> &'static str {
        match self {
            PipelineStage::Compile => "compile",
            PipelineStage::Enrich => "enrich",
            PipelineStage::Postprocess => "postprocess",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builder for creating the pass manager of each pipeline stage.
pub struct PassManagerBuilder {
    /// Gates callable without a definition.
    vocabulary: Arc<GateVocabulary>,
    /// Whether the enrich stage adds the standard library include.
    standard_include: bool,
}

impl PassManagerBuilder {
    /// Create a new builder with the standard vocabulary.
    pub fn new() -> Self {
        Self {
            vocabulary: Arc::new(GateVocabulary::standard()),
            standard_include: true,
        }
    }

    /// Set the gate vocabulary.
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: GateVocabulary) -> Self {
        self.vocabulary = Arc::new(vocabulary);
        self
    }

    /// Enable or disable standard include injection in the enrich stage.
    #[must_use]
    pub fn with_standard_include(mut self, enabled: bool) -> Self {
        self.standard_include = enabled;
        self
    }

    /// Build the pass manager for one stage.
    pub fn build(&self, stage: PipelineStage) -> PassManager {
        let mut pm = PassManager::new();

        match stage {
            PipelineStage::Compile => pm.add_pass(ValidateStructure),
            PipelineStage::Enrich => {
                pm.add_pass(CheckGateVocabulary::new(Arc::clone(&self.vocabulary)));
                if self.standard_include {
                    pm.add_pass(AddStandardInclude::new(Arc::clone(&self.vocabulary)));
                }
            }
            PipelineStage::Postprocess => pm.add_pass(NormalizeIncludes),
        }

        pm
    }

    /// Build one pass manager per stage, in execution order.
    pub fn build_all(&self) -> Vec<(PipelineStage, PassManager)> {
        PipelineStage::ALL
            .into_iter()
            .map(|stage| (stage, self.build(stage)))
            .collect()
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
