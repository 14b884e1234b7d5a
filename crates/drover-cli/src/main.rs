//! # drover-cli
//!
//! Binary entry point for the drover iteration engine.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Tracing initialization
//! - Metadata directory scaffolding
//! - The iteration controller loop

mod runner;
mod scaffold;
mod transcript;

use clap::Parser;
use drover_core::{DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, RunConfig, exit_code};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use runner::ExitReason;

/// Drives long-running autonomous coding work by repeatedly invoking a
/// coding agent with state-selected prompts.
#[derive(Parser, Debug)]
#[command(name = "drover", version, about)]
struct Cli {
    /// Target project directory; created if it does not exist
    project_dir: PathBuf,

    /// Specification file (required until onboarding has completed)
    #[arg(short = 's', long)]
    spec_file: Option<PathBuf>,

    /// Maximum iteration count; omit to run until interrupted
    #[arg(short = 'n', long)]
    max_iterations: Option<u32>,

    /// Hard per-iteration timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Seconds without agent output before the invocation is killed
    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT_SECS)]
    idle_timeout: u64,

    /// Model for all phases unless a per-phase override applies
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Model override for initializer/onboarding iterations
    #[arg(long)]
    init_model: Option<String>,

    /// Model override for coding/todo iterations
    #[arg(long)]
    code_model: Option<String>,

    /// Skip the end-of-run log normalization step
    #[arg(long)]
    no_log_clean: bool,

    /// Abort after this many consecutive failed iterations (0 = never)
    #[arg(long, default_value_t = 0)]
    quit_on_abort: u32,

    /// Keep iterating past hard/idle timeouts without counting them as
    /// failures
    #[arg(long)]
    continue_on_timeout: bool,

    /// Work through the metadata todo file instead of the normal phases
    #[arg(long)]
    todo: bool,

    /// Custom agent command overriding the built-in agent invocation
    #[arg(long)]
    agent_cmd: Option<String>,

    /// Verbose diagnostic output
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("DROVER_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Fixed once per run: whether this process created the project
    // directory. Never recomputed, even though everything else is
    // re-resolved each iteration.
    let is_new_project = !cli.project_dir.exists();
    if is_new_project {
        if let Err(e) = fs::create_dir_all(&cli.project_dir) {
            error!(dir = %cli.project_dir.display(), error = %e, "Cannot create project directory");
            return ExitCode::from(exit_code::CONFIG_ERROR as u8);
        }
        info!(dir = %cli.project_dir.display(), "Created project directory");
    }

    let config = RunConfig {
        project_dir: cli.project_dir,
        spec_file: cli.spec_file,
        max_iterations: cli.max_iterations,
        timeout_secs: cli.timeout,
        idle_timeout_secs: cli.idle_timeout,
        model: cli.model,
        init_model: cli.init_model,
        code_model: cli.code_model,
        no_log_clean: cli.no_log_clean,
        quit_on_abort: cli.quit_on_abort,
        continue_on_timeout: cli.continue_on_timeout,
        todo_mode: cli.todo,
        agent_command: cli.agent_cmd,
    };

    match runner::run_iterations(config, is_new_project).await {
        Ok(outcome) => {
            let reason = match outcome.exit {
                ExitReason::Completed => "completed",
                ExitReason::AbortThreshold { .. } => "aborted on consecutive failures",
                ExitReason::Interrupted => "interrupted",
            };
            println!(
                "drover: {reason} after {} iteration(s)",
                outcome.iterations_run
            );
            ExitCode::from(u8::try_from(outcome.exit_code()).unwrap_or(1))
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_code::CONFIG_ERROR as u8)
        }
    }
}
