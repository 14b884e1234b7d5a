//! Iteration history records.
//!
//! One JSONL line per supervised invocation, appended to `history.jsonl`
//! in the metadata directory. The transcript log holds the full output;
//! the history file is the compact machine-readable index over it. Write
//! failures are warnings, never fatal to the run.

use crate::phase::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A single iteration's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration number.
    pub iteration: u32,

    /// Phase that governed the iteration.
    pub phase: String,

    /// Transcript log file name (relative to the iterations directory).
    pub log_file: String,

    /// Classified exit code of the supervised invocation.
    pub exit_code: i32,

    /// RFC 3339 start timestamp.
    pub started_at: String,

    /// RFC 3339 end timestamp.
    pub finished_at: String,
}

impl IterationRecord {
    pub fn new(
        iteration: u32,
        phase: Phase,
        log_path: &Path,
        exit_code: i32,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let log_file = log_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            iteration,
            phase: phase.as_str().to_string(),
            log_file,
            exit_code,
            started_at: started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
        }
    }
}

/// Appender for the iteration history file.
#[derive(Debug)]
pub struct RunHistory {
    path: PathBuf,
    file: Option<File>,
}

impl RunHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Appends one record as a JSONL line, opening the file lazily.
    pub fn append(&mut self, record: &IterationRecord) -> io::Result<()> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.file = Some(file);
        }
        let Some(file) = self.file.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::Other, "history file unavailable"));
        };

        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn appends_one_line_per_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.jsonl");
        let mut history = RunHistory::new(&path);

        let started = Utc::now();
        for i in 1..=3 {
            let record = IterationRecord::new(
                i,
                Phase::Coding,
                Path::new("001.log"),
                0,
                started,
                Utc::now(),
            );
            history.append(&record).unwrap();
        }

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        let parsed: IterationRecord = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(parsed.iteration, 3);
        assert_eq!(parsed.phase, "coding");
        assert_eq!(parsed.log_file, "001.log");
        assert_eq!(parsed.exit_code, 0);
    }
}
