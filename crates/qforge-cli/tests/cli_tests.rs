//! End-to-end tests for the `qforge` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn qforge(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qforge"))
        .args(args)
        .current_dir(cwd)
        .env_remove("QFORGE_CONFIG")
        .env_remove("QFORGE_STORAGE_TYPE")
        .env_remove("QFORGE_DEFAULT_TARGET")
        .output()
        .expect("failed to run qforge")
}

fn write(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_compile_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "scenario.qasm",
        "OPENQASM 3.0;\ninclude \"stdgates.inc\";\ninclude \"other.inc\";\ninclude \"stdgates.inc\";\nx q[0];\ncx q[0], q[1];\n",
    );

    let out = qforge(&["compile", "-i", &input], dir.path());
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "OPENQASM 3.0;\ninclude \"stdgates.inc\";\ninclude \"other.inc\";\nx q[0];\ncx q[0], q[1];\n"
    );
}

#[test]
fn test_compile_qasm2_to_file() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "bell.qasm", "OPENQASM 3.0;\nqubit[2] q;\nh q[0];\ncx q[0], q[1];\n");
    let output = dir.path().join("bell_compiled.qasm");

    let out = qforge(
        &["compile", "-i", &input, "-o", &output.to_string_lossy(), "-t", "qasm2"],
        dir.path(),
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let compiled = fs::read_to_string(&output).unwrap();
    assert!(compiled.starts_with("OPENQASM 2.0;\ninclude \"stdgates.inc\";\n"));
    assert!(compiled.contains("qreg q[2];"));
}

#[test]
fn test_compile_unsupported_gate_fails() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "bad.qasm", "OPENQASM 3.0;\nqubit q;\nfoo q;\n");

    let out = qforge(&["compile", "-i", &input], dir.path());
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("enrich stage failed"), "{stderr}");
    assert!(stderr.contains("foo"), "{stderr}");
}

#[test]
fn test_compile_parse_error() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "broken.qasm", "OPENQASM 3.0;\nx q");

    let out = qforge(&["compile", "-i", &input], dir.path());
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Parse error"));
}

#[test]
fn test_normalize_only_moves_includes() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "nested.qasm",
        "OPENQASM 3.0;\nbit c;\nif (c == 1) {\n    include \"a.inc\";\n    foo q;\n}\ninclude \"a.inc\";\n",
    );

    let out = qforge(&["normalize", "-i", &input], dir.path());
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "OPENQASM 3.0;\ninclude \"a.inc\";\nbit c;\nif (c == 1) {\n    foo q;\n}\n"
    );
}

#[test]
fn test_vocabulary_json() {
    let dir = TempDir::new().unwrap();
    let out = qforge(&["vocabulary", "--json"], dir.path());
    assert!(out.status.success());

    let entries: Vec<serde_json::Value> = serde_json::from_slice(&out.stdout).unwrap();
    let cx = entries.iter().find(|e| e["name"] == "cx").unwrap();
    assert_eq!(cx["num_qubits"], 2);
}

#[test]
fn test_status_from_sqlite_config() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("jobs.db");
    let config = write(
        &dir,
        "qforge.yaml",
        &format!("storage:\n  backend: sqlite\n  path: {}\n", db.to_string_lossy()),
    );
    let input = write(&dir, "x.qasm", "OPENQASM 3.0;\nqubit q;\nx q;\n");

    let out = qforge(&["compile", "-i", &input, "--config", &config], dir.path());
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stderr = String::from_utf8_lossy(&out.stderr);
    let job_id = stderr
        .lines()
        .find_map(|line| line.trim().strip_prefix("Job: "))
        .map(|id| console::strip_ansi_codes(id).trim().to_string())
        .expect("job id in output");

    let out = qforge(&["status", &job_id, "--config", &config], dir.path());
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let snapshot: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(snapshot["status"], "COMPLETED");
    assert_eq!(snapshot["progress"]["percentage"], 100);
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "qforge.yaml", "logging:\n  level: loud\n");

    let out = qforge(&["vocabulary", "--config", &config], dir.path());
    // Only commands that need the pipeline read the configuration.
    assert!(out.status.success());

    let input = write(&dir, "x.qasm", "OPENQASM 3.0;\nqubit q;\nx q;\n");
    let out = qforge(&["compile", "-i", &input, "--config", &config], dir.path());
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid log level"));
}
