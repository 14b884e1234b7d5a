//! Process supervision for one agent invocation.
//!
//! The supervisor spawns the agent, feeds it the prompt over stdin,
//! multiplexes its combined output against a watchdog timer, and
//! classifies the result into one of the reserved exit codes. Within one
//! invocation three activities run concurrently against the child: the
//! stdin writer, the stdout/stderr line readers, and the idle watchdog.
//! Iterations themselves are strictly sequential; the controller never
//! runs two supervisors at once.

use crate::agent_backend::AgentBackend;
use drover_core::exit_code;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Sentinel printed by the agent when the provider produced a response
/// with no assistant message. Case-sensitive containment test.
pub const SENTINEL_NO_ASSISTANT: &str = "no assistant messages returned";

/// Sentinel printed by the agent when the provider itself failed.
pub const SENTINEL_PROVIDER_ERROR: &str = "provider returned an error";

/// Watchdog wake interval. Idle and hard timeouts are both enforced at
/// this granularity, which is ample for multi-second timeout values.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Grace period for the child to exit after a termination request.
const KILL_GRACE: Duration = Duration::from_secs(10);

/// Receives each line of the supervised agent's combined output.
///
/// The controller's implementation tees lines to stdout and the transcript
/// log; tests collect them in memory.
pub trait OutputSink: Send {
    fn on_line(&mut self, line: &str);
}

/// Errors surfaced to the controller instead of an exit code.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The prompt document could not be read.
    #[error("failed to read prompt {path:?}: {source}")]
    PromptRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Which sentinel fired first. "No assistant messages" has priority when
/// one line contains both substrings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sentinel {
    NoAssistant,
    ProviderError,
}

/// Why the monitoring loop stopped.
#[derive(Debug, Clone, Copy)]
enum Ending {
    /// Both output pipes reached EOF.
    OutputClosed,
    /// A sentinel matched; the child must be terminated.
    Sentinel,
    /// No output for longer than the idle timeout.
    Idle,
    /// The overall hard timeout elapsed.
    HardTimeout,
}

/// Supervises a single agent invocation.
#[derive(Debug)]
pub struct Supervisor {
    backend: AgentBackend,
    project_dir: PathBuf,
    timeout: Duration,
    idle_timeout: Duration,
    poll_interval: Duration,
}

impl Supervisor {
    pub fn new(
        backend: AgentBackend,
        project_dir: impl Into<PathBuf>,
        timeout_secs: u64,
        idle_timeout_secs: u64,
    ) -> Self {
        Self {
            backend,
            project_dir: project_dir.into(),
            timeout: Duration::from_secs(timeout_secs),
            idle_timeout: Duration::from_secs(idle_timeout_secs),
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Overrides the watchdog wake interval. Intended for tests that use
    /// sub-second timeouts.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs the agent once with the given prompt and model arguments,
    /// forwarding every output line to `sink`, and returns the classified
    /// exit code.
    ///
    /// A spawn failure is not an error: it classifies as the generic
    /// launch-failure code and the controller treats it like any other
    /// failed iteration.
    pub async fn run(
        &self,
        prompt_path: &Path,
        model: Option<&str>,
        sink: &mut dyn OutputSink,
    ) -> Result<i32, SupervisorError> {
        let prompt = tokio::fs::read_to_string(prompt_path)
            .await
            .map_err(|source| SupervisorError::PromptRead {
                path: prompt_path.to_path_buf(),
                source,
            })?;

        let args = self.backend.build_args(model, self.timeout.as_secs());
        debug!(
            command = %self.backend.command,
            args_count = args.len(),
            prompt_len = prompt.len(),
            "Spawning agent"
        );

        let mut command = Command::new(&self.backend.command);
        command
            .args(&args)
            .current_dir(&self.project_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %self.backend.command, error = %e, "Failed to launch agent");
                return Ok(exit_code::LAUNCH_FAILURE);
            }
        };

        // Feed the prompt concurrently; dropping the handle closes the
        // stream and signals end-of-input. Correctness must not depend on
        // how this interleaves with reads.
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    debug!(error = %e, "Agent closed stdin before the prompt was fully written");
                }
                let _ = stdin.shutdown().await;
            });
        }

        // Merge stdout and stderr into one line stream.
        let (tx, mut rx) = mpsc::channel::<String>(256);
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, tx.clone());
        }
        drop(tx);

        let started = Instant::now();
        let mut last_output = Instant::now();
        let mut ticker = tokio::time::interval(self.poll_interval);
        let mut sentinel: Option<Sentinel> = None;

        // The watchdog and the line stream race; whichever condition is
        // observed first decides the classification.
        let ending = loop {
            tokio::select! {
                maybe_line = rx.recv() => match maybe_line {
                    Some(line) => {
                        last_output = Instant::now();
                        sink.on_line(&line);
                        if line.contains(SENTINEL_NO_ASSISTANT) {
                            sentinel = Some(Sentinel::NoAssistant);
                            break Ending::Sentinel;
                        }
                        if line.contains(SENTINEL_PROVIDER_ERROR) {
                            sentinel = Some(Sentinel::ProviderError);
                            break Ending::Sentinel;
                        }
                    }
                    None => break Ending::OutputClosed,
                },
                _ = ticker.tick() => {
                    if started.elapsed() >= self.timeout {
                        break Ending::HardTimeout;
                    }
                    if last_output.elapsed() >= self.idle_timeout {
                        break Ending::Idle;
                    }
                }
            }
        };

        let status = match ending {
            Ending::OutputClosed => {
                // Output is done but the child may linger; the hard
                // timeout still bounds the wait.
                let remaining = self.timeout.saturating_sub(started.elapsed());
                match tokio::time::timeout(remaining, child.wait()).await {
                    Ok(status) => status,
                    Err(_) => {
                        terminate(&mut child).await;
                        child.wait().await
                    }
                }
            }
            Ending::Sentinel | Ending::Idle | Ending::HardTimeout => {
                terminate(&mut child).await;
                match tokio::time::timeout(KILL_GRACE, child.wait()).await {
                    Ok(status) => status,
                    Err(_) => {
                        let _ = child.start_kill();
                        child.wait().await
                    }
                }
            }
        };

        let raw_code = match status {
            Ok(status) => raw_exit_code(status),
            Err(e) => {
                warn!(error = %e, "Could not collect agent exit status");
                1
            }
        };

        // Classification priority: sentinels first, then liveness, then
        // the child's real status.
        let code = match (sentinel, ending) {
            (Some(Sentinel::NoAssistant), _) => exit_code::NO_ASSISTANT_OUTPUT,
            (Some(Sentinel::ProviderError), _) => exit_code::PROVIDER_ERROR,
            (None, Ending::Idle) => exit_code::IDLE_TIMEOUT,
            (None, Ending::HardTimeout) => exit_code::HARD_TIMEOUT,
            (None, _) => raw_code,
        };

        debug!(
            code,
            elapsed_secs = started.elapsed().as_secs(),
            "Agent invocation classified"
        );
        Ok(code)
    }
}

/// Reads lines from one output pipe into the shared channel. Stops when
/// the pipe closes or the receiver is gone.
fn spawn_line_reader<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
}

/// Best-effort termination: SIGTERM to the child's process group so agent
/// subprocesses go down with it, then a kill on the child itself. Failure
/// to signal an already-exited process is not an error.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
    let _ = child.start_kill();
}

/// Raw exit code of the child: the real code when it exited, 128+signal
/// when a signal killed it (Unix), 1 otherwise.
fn raw_exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
