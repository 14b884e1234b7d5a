//! The iteration controller.
//!
//! One run is a strictly sequential sequence of supervised agent
//! invocations. Each iteration re-resolves the project state from disk,
//! selects a phase, scaffolds artifacts when the phase calls for it, runs
//! the supervisor against a freshly numbered transcript log, and folds the
//! classified exit code into the failure streak. Log cleanup is installed
//! as a scope guard so it runs exactly once on every exit path, including
//! interrupts.

use anyhow::{Context, Result};
use chrono::Utc;
use drover_adapters::{AgentBackend, Supervisor};
use drover_core::{
    CommandPostProcessor, FailureDisposition, IterationRecord, LogIndexer, Phase, RunConfig,
    RunHistory, RunState, cleanup_logs, ensure_spec_available, exit_code, resolve_project_state,
    select_phase,
};
use std::fs;
use tracing::{debug, error, info, warn};

use crate::scaffold;
use crate::transcript::{TranscriptWriter, iteration_header, iteration_footer};

/// Why the run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// The configured iteration count was reached.
    Completed,
    /// The consecutive-failure threshold was reached.
    AbortThreshold { code: i32 },
    /// SIGINT or SIGTERM.
    Interrupted,
}

/// Summary of one run, returned to main.
#[derive(Debug)]
pub struct RunOutcome {
    /// Iterations that ran to a classified exit.
    pub iterations_run: u32,
    /// Why the loop stopped.
    pub exit: ExitReason,
}

impl RunOutcome {
    /// Process exit code for this outcome. An abort mirrors the last
    /// failing iteration's code.
    pub fn exit_code(&self) -> i32 {
        match self.exit {
            ExitReason::Completed => exit_code::SUCCESS,
            ExitReason::AbortThreshold { code } => code,
            ExitReason::Interrupted => exit_code::INTERRUPTED,
        }
    }
}

/// Runs the iteration loop until the configured bound, an abort, or an
/// interrupt. Fatal configuration errors (missing specification, todo mode
/// without a todo file) surface as `Err` before the first invocation.
pub async fn run_iterations(config: RunConfig, is_new_project: bool) -> Result<RunOutcome> {
    // Interrupt notification: signal tasks flip a watch channel that the
    // loop checks between iterations and races against the supervisor.
    let (interrupt_tx, mut interrupt_rx) = tokio::sync::watch::channel(false);

    let interrupt_tx_sigint = interrupt_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing up");
            let _ = interrupt_tx_sigint.send(true);
        }
    });

    #[cfg(unix)]
    {
        let interrupt_tx_sigterm = interrupt_tx.clone();
        tokio::spawn(async move {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler");
            sigterm.recv().await;
            warn!("SIGTERM received, finishing up");
            let _ = interrupt_tx_sigterm.send(true);
        });
    }

    let initial_state = resolve_project_state(&config.project_dir, is_new_project);
    ensure_spec_available(&config, &initial_state)?;

    let iterations_dir = initial_state.iterations_dir();
    fs::create_dir_all(&iterations_dir)
        .with_context(|| format!("Failed to create {}", iterations_dir.display()))?;

    // Cleanup must run exactly once on every exit path: normal completion,
    // abort, config error after this point, and interrupt.
    let cleanup_dir = iterations_dir.clone();
    let no_clean = config.no_log_clean;
    let _cleanup = scopeguard::guard((), move |()| {
        cleanup_logs(&cleanup_dir, no_clean, &CommandPostProcessor::default());
    });

    let mut history = RunHistory::new(initial_state.history_path());
    let mut indexer = LogIndexer::new(&iterations_dir);
    let mut run_state = RunState::new();
    let mut completed: u32 = 0;

    let backend = AgentBackend::from_override(config.agent_command.as_deref());

    let exit = loop {
        if config.max_iterations.is_some_and(|max| completed >= max) {
            break ExitReason::Completed;
        }
        if *interrupt_rx.borrow() {
            break ExitReason::Interrupted;
        }

        let iteration = completed + 1;

        // Fresh state every iteration; the previous invocation may have
        // completed onboarding or rewritten the feature list.
        let state = resolve_project_state(&config.project_dir, is_new_project);
        let phase = select_phase(&state, config.todo_mode)?;

        match phase {
            Phase::Onboarding if state.feature_list_path().is_file() => {
                info!("Onboarding incomplete, resuming feature-list generation");
            }
            Phase::Onboarding => {
                info!("Existing codebase detected, onboarding before feature work");
            }
            _ => debug!(phase = %phase, "Phase selected"),
        }

        if phase.scaffolds_artifacts() {
            scaffold::ensure_artifacts(&state.metadata_dir)
                .with_context(|| format!("Failed to scaffold {}", state.metadata_dir.display()))?;
            if phase == Phase::Initializer {
                scaffold::copy_spec(config.spec_file.as_deref(), &state.metadata_dir)
                    .context("Failed to copy specification")?;
            }
        }

        let index = indexer.next_index();
        let log_path = indexer.log_path(index);
        let mut transcript = TranscriptWriter::create(&log_path)
            .with_context(|| format!("Failed to create {}", log_path.display()))?;

        let started_at = Utc::now();
        transcript.frame(&iteration_header(iteration, phase, &log_path, started_at));

        let supervisor = Supervisor::new(
            backend.clone(),
            &config.project_dir,
            config.timeout_secs,
            config.idle_timeout_secs,
        );
        let prompt_path = state.metadata_dir.join(phase.prompt_file());
        let model = config.model_for(phase.model_profile());

        let mut interrupted = false;
        let code = tokio::select! {
            result = supervisor.run(&prompt_path, model, &mut transcript) => match result {
                Ok(code) => code,
                Err(e) => {
                    warn!(error = %e, "Supervised invocation failed to start");
                    exit_code::LAUNCH_FAILURE
                }
            },
            _ = interrupt_rx.changed() => {
                // Dropping the supervisor future reaps the child.
                interrupted = true;
                exit_code::INTERRUPTED
            }
        };

        let finished_at = Utc::now();
        transcript.frame(&iteration_footer(iteration, code, finished_at));

        let record = IterationRecord::new(iteration, phase, &log_path, code, started_at, finished_at);
        if let Err(e) = history.append(&record) {
            warn!(path = %history.path().display(), error = %e, "Could not append history record");
        }

        if interrupted {
            break ExitReason::Interrupted;
        }
        completed = iteration;

        match run_state.record(code, config.continue_on_timeout) {
            FailureDisposition::Reset => {}
            FailureDisposition::Exempt => {
                info!(code, "Timeout exit exempted from the failure streak");
            }
            FailureDisposition::Counted(streak) => {
                warn!(code, streak, "Iteration failed");
            }
        }

        if run_state.should_abort(config.quit_on_abort) {
            error!(
                threshold = config.quit_on_abort,
                "Consecutive-failure threshold reached, aborting run"
            );
            break ExitReason::AbortThreshold {
                code: run_state.last_failure_code(),
            };
        }
    };

    Ok(RunOutcome {
        iterations_run: completed,
        exit,
    })
}
