//! Bootprint — render documentation sites from a template module and an
//! input document.
//!
//! # Usage
//!
//! ```text
//! bootprint run <module> <input> <target-dir> [--config <file>] [--dry-run]
//! bootprint diff <module> <input> <target-dir> [--config <file>]
//! bootprint config <module> <input> [--config <file>] [--json]
//! ```
//!
//! `<module>` is a registered module name (`base`) or a module directory;
//! `<input>` is a YAML/JSON file or an `http(s)://` URL.

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use bootprint::BootprintError;
use commands::{config::ConfigArgs, diff::DiffArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "bootprint",
    version,
    about = "Render documentation sites from a template module and an input document",
    long_about = None,
)]
struct Cli {
    /// Log module and input resolution steps (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the input with a module and write the result.
    Run(RunArgs),

    /// Show a unified diff of what `run` would change in the target directory.
    Diff(DiffArgs),

    /// Print the merged configuration the input would be rendered with.
    Config(ConfigArgs),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Error reporting
// ---------------------------------------------------------------------------

/// Print `err` for a human: a missing input file gets its message only,
/// unreadable input gets a short prefix, anything else the full chain.
fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<BootprintError>() {
        Some(e) if e.is_missing_input() => eprintln!("{e}"),
        Some(e) if e.cause().is_some() => {
            eprintln!("{} {err:?}", "Could not load input data:".red().bold())
        }
        _ => eprintln!("{} {err:?}", "error:".red().bold()),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => args.run().await,
        Commands::Diff(args) => args.run().await,
        Commands::Config(args) => args.run().await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}
