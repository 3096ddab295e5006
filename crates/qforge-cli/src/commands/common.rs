//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use qforge_qasm3::syntax::Program;
use qforge_qasm3::{QasmVersion, parse_program};
use qforge_sched::PipelineConfig;

/// Load the pipeline configuration, from `path` if given.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    PipelineConfig::load(path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })
}

/// Read a QASM source file.
pub fn read_source(path: &Path) -> Result<String> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Read and parse a QASM source file.
pub fn load_program(path: &Path) -> Result<Program> {
    let source = read_source(path)?;
    parse_program(&source).map_err(|e| anyhow::anyhow!("Parse error in {}: {e}", path.display()))
}

/// Emission dialect matching a program's own header.
pub fn source_version(program: &Program) -> QasmVersion {
    if program.version.starts_with('2') {
        QasmVersion::V2
    } else {
        QasmVersion::V3
    }
}

/// Write `content` to `output`, or to stdout when no path is given.
pub fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("Failed to write file: {}", path.display())),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_file() {
        let err = read_source(Path::new("/nonexistent/bell.qasm")).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_load_program_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.qasm");
        fs::write(&path, "OPENQASM 2.0;\nqreg q[1];\nx q[0];\n").unwrap();

        let program = load_program(&path).unwrap();
        assert_eq!(source_version(&program), QasmVersion::V2);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.qasm");
        fs::write(&path, "OPENQASM 3.0;\nx q").unwrap();

        let err = load_program(&path).unwrap_err();
        assert!(err.to_string().contains("broken.qasm"));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.qasm");
        write_output(Some(&path), "OPENQASM 3.0;\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "OPENQASM 3.0;\n");
    }
}
