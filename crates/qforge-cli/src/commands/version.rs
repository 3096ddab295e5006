//! Version command implementation.

use console::style;

use qforge_compile::SUPPORTED_TARGETS;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - OpenQASM compile pipeline",
        style("qforge").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qforge-qasm3    OpenQASM parser and emitter");
    println!("  qforge-compile  Pass framework and compile passes");
    println!("  qforge-sched    Job lifecycle and pipeline orchestration");
    println!("  qforge-cli      Command-line interface");
    println!();
    println!("Targets:    {}", SUPPORTED_TARGETS.join(", "));
    println!("License:    {}", style("Apache-2.0").dim());
}
