//! Transcript log writing.
//!
//! Every supervised invocation is framed by an iteration header and footer
//! and captured, line by line, to a numbered log file while being echoed
//! to the controller's stdout.

use chrono::{DateTime, Utc};
use drover_adapters::OutputSink;
use drover_core::Phase;
use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::Path;

/// Tees agent output to stdout and the iteration's transcript log.
pub struct TranscriptWriter {
    file: LineWriter<File>,
}

impl TranscriptWriter {
    /// Creates the transcript log file, truncating any leftover content.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            file: LineWriter::new(file),
        })
    }

    /// Writes framing text (header/footer) to both stdout and the log.
    pub fn frame(&mut self, text: &str) {
        println!("{text}");
        let _ = writeln!(self.file, "{text}");
    }
}

impl OutputSink for TranscriptWriter {
    fn on_line(&mut self, line: &str) {
        println!("{line}");
        let _ = writeln!(self.file, "{line}");
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Header printed before each supervised invocation.
pub fn iteration_header(
    iteration: u32,
    phase: Phase,
    log_path: &Path,
    started_at: DateTime<Utc>,
) -> String {
    format!(
        "=== Iteration {iteration} [{phase}] ===\nlog: {}\nstarted: {}",
        log_path.display(),
        timestamp(started_at),
    )
}

/// Footer printed after each supervised invocation, whatever its outcome.
pub fn iteration_footer(iteration: u32, exit_code: i32, finished_at: DateTime<Utc>) -> String {
    format!(
        "--- Iteration {iteration} finished (exit {exit_code}) at {} ---",
        timestamp(finished_at),
    )
}
