//! buildgate - run the full build-validation pipeline.
//!
//! A single entry point: sequence the project's verification stages
//! and exit 0 only when every mandatory stage passed.

use anyhow::{Context, Result};
use buildgate_core::{
    default_stages, Pipeline, PipelineConfig, PipelineOutcome, StageStatus,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "buildgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Local build-validation pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Workspace root to validate (default: current directory)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Ask sub-invoked tools for a backtrace on panic
    #[arg(long)]
    backtrace: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    buildgate_core::telemetry::init_tracing(cli.json, level);

    let mut config = PipelineConfig {
        workspace_path: cli.workspace,
        ..PipelineConfig::default()
    };
    config.env.backtrace = cli.backtrace;

    let stages = default_stages(&config);
    let pipeline = Pipeline::new(config);

    let outcome = pipeline
        .run(stages)
        .await
        .context("pipeline execution failed")?;

    print_summary(&outcome);

    Ok(if outcome.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(outcome: &PipelineOutcome) {
    println!();
    println!("Pipeline summary ({} ms):", outcome.duration_ms);
    for record in &outcome.records {
        let line = match &record.status {
            StageStatus::Succeeded => format!("ok      ({} ms)", record.duration_ms),
            StageStatus::Skipped { reason } => format!("skipped ({reason})"),
            StageStatus::FailedSoft { exit_code } => {
                format!("warned  (exit code {exit_code})")
            }
            StageStatus::FailedHard { exit_code } => {
                format!("FAILED  (exit code {exit_code})")
            }
        };
        println!("  {:<14} {}", record.name, line);
    }
    println!();
    match outcome.first_failure() {
        None => println!("PASS"),
        Some(stage) => println!("FAIL at stage '{stage}'"),
    }
}
