//! Normalize command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;

use qforge_compile::{PassManagerBuilder, PipelineStage};
use qforge_qasm3::emit_program;

use super::common::{load_program, source_version, write_output};

/// Execute the normalize command.
pub fn execute(input: &Path, output: Option<&Path>) -> Result<()> {
    let program = load_program(input)?;
    let version = source_version(&program);

    let pm = PassManagerBuilder::new().build(PipelineStage::Postprocess);
    let program = pm.run(program)?;

    write_output(output, &emit_program(&program, version))?;
    eprintln!(
        "{} Normalized {} ({} includes)",
        style("✓").green().bold(),
        style(input.display()).green(),
        program.top_level_includes().len()
    );
    Ok(())
}
