//! qforge Command-Line Interface
//!
//! Local front end for the compile pipeline: submits programs as jobs,
//! waits for them, and prints or writes the compiled source.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use qforge_sched::{TracingConfig, init_tracing};

mod commands;

use commands::{compile, normalize, status, version, vocabulary};

/// qforge - OpenQASM compile pipeline
#[derive(Parser, Debug)]
#[command(name = "qforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true, env = "QFORGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a program through every pipeline stage
    Compile {
        /// Input QASM file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compilation target (qasm, qasm3, qasm2)
        #[arg(short, long)]
        target: Option<String>,

        /// Seconds to wait for the job before giving up
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Also print the program emitted after each stage
        #[arg(long)]
        stages: bool,
    },

    /// Deduplicate and hoist include directives only
    Normalize {
        /// Input QASM file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a stored job
    Status {
        /// Job ID
        job_id: String,
    },

    /// List the gates programs may call without defining them
    Vocabulary {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

/// Log filter for a `-v` count.
fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut tracing = TracingConfig::from_env();
    tracing.log_level = verbosity_filter(cli.verbose).to_string();
    if let Err(e) = init_tracing(&tracing) {
        eprintln!("{} {}", style("Warning:").yellow().bold(), e);
    }

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Compile {
            input,
            output,
            target,
            timeout,
            stages,
        } => {
            compile::execute(
                config,
                &input,
                output.as_deref(),
                target.as_deref(),
                timeout,
                stages,
            )
            .await
        }

        Commands::Normalize { input, output } => normalize::execute(&input, output.as_deref()),

        Commands::Status { job_id } => status::execute(config, &job_id).await,

        Commands::Vocabulary { json } => vocabulary::execute(json),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
