//! Transcript log indexing and end-of-run cleanup.
//!
//! Transcript logs are numbered `NNN.log` inside the iterations directory.
//! The indexer keeps a high-water mark so that indices issued within a run
//! are strictly increasing and never reused, even when earlier logs are
//! deleted underneath it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Extension of transcript log files.
const LOG_EXTENSION: &str = "log";

/// Default external command invoked to normalize logs after a run.
const DEFAULT_POST_PROCESSOR: &str = "drover-logclean";

/// Issues sequential, gap-free transcript log indices.
#[derive(Debug)]
pub struct LogIndexer {
    iterations_dir: PathBuf,
    last_issued: u32,
}

impl LogIndexer {
    pub fn new(iterations_dir: impl Into<PathBuf>) -> Self {
        Self {
            iterations_dir: iterations_dir.into(),
            last_issued: 0,
        }
    }

    /// Returns the next unused index: one past the highest numeric `.log`
    /// basename on disk, or one past the highest index this indexer has
    /// already issued, whichever is larger. Never returns the same index
    /// twice within a run.
    pub fn next_index(&mut self) -> u32 {
        let next = self.scan_max().max(self.last_issued) + 1;
        self.last_issued = next;
        next
    }

    /// Path of the log file for an index, zero-padded to 3 digits.
    pub fn log_path(&self, index: u32) -> PathBuf {
        self.iterations_dir.join(format!("{index:03}.{LOG_EXTENSION}"))
    }

    /// Highest numeric log basename currently on disk, 0 when none exist.
    fn scan_max(&self) -> u32 {
        let entries = match fs::read_dir(&self.iterations_dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        entries
            .flatten()
            .filter_map(|entry| parse_log_index(&entry.path()))
            .max()
            .unwrap_or(0)
    }
}

/// Parses `NNN.log` into its index. Leading zeros are tolerated; anything
/// that is not a pure-numeric basename with the log extension is ignored.
fn parse_log_index(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != LOG_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// End-of-run log normalization step. The transformation itself belongs to
/// an external collaborator; the engine only decides whether to invoke it.
pub trait LogPostProcessor {
    fn process(&self, iterations_dir: &Path) -> io::Result<()>;
}

/// Shells out to an external normalizer command with the iterations
/// directory as its only argument.
#[derive(Debug)]
pub struct CommandPostProcessor {
    command: String,
}

impl CommandPostProcessor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for CommandPostProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_POST_PROCESSOR)
    }
}

impl LogPostProcessor for CommandPostProcessor {
    fn process(&self, iterations_dir: &Path) -> io::Result<()> {
        let status = Command::new(&self.command).arg(iterations_dir).status()?;
        if !status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} exited with {status}", self.command),
            ));
        }
        Ok(())
    }
}

/// Post-processor that does nothing. Used by tests and by callers that
/// only want the no-clean/has-logs gating.
#[derive(Debug, Default)]
pub struct NoopPostProcessor;

impl LogPostProcessor for NoopPostProcessor {
    fn process(&self, _iterations_dir: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Runs the post-processing step over the iterations directory unless
/// `no_clean` is set, and only when at least one log file exists. Failures
/// of the external step are warnings, never fatal.
pub fn cleanup_logs(iterations_dir: &Path, no_clean: bool, processor: &dyn LogPostProcessor) {
    if no_clean {
        debug!("Log cleanup disabled by --no-log-clean");
        return;
    }

    let has_logs = fs::read_dir(iterations_dir)
        .map(|entries| {
            entries
                .flatten()
                .any(|entry| parse_log_index(&entry.path()).is_some())
        })
        .unwrap_or(false);
    if !has_logs {
        debug!(dir = %iterations_dir.display(), "No transcript logs, skipping cleanup");
        return;
    }

    if let Err(e) = processor.process(iterations_dir) {
        warn!(dir = %iterations_dir.display(), error = %e, "Log post-processing failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    #[test]
    fn first_index_is_one() {
        let temp = TempDir::new().unwrap();
        let mut indexer = LogIndexer::new(temp.path());
        assert_eq!(indexer.next_index(), 1);
        assert_eq!(indexer.log_path(1), temp.path().join("001.log"));
    }

    #[test]
    fn resumes_past_existing_logs() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("001.log"), "").unwrap();
        fs::write(temp.path().join("007.log"), "").unwrap();
        // Non-log noise must be ignored.
        fs::write(temp.path().join("notes.txt"), "").unwrap();
        fs::write(temp.path().join("9x.log"), "").unwrap();

        let mut indexer = LogIndexer::new(temp.path());
        assert_eq!(indexer.next_index(), 8);
    }

    #[test]
    fn leading_zeros_parse() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("042.log"), "").unwrap();

        let mut indexer = LogIndexer::new(temp.path());
        assert_eq!(indexer.next_index(), 43);
    }

    #[test]
    fn indices_never_repeat_after_deletion() {
        let temp = TempDir::new().unwrap();
        let mut indexer = LogIndexer::new(temp.path());

        let first = indexer.next_index();
        fs::write(indexer.log_path(first), "transcript").unwrap();
        let second = indexer.next_index();
        assert!(second > first);

        // Deleting every log must not roll the counter back.
        fs::remove_file(indexer.log_path(first)).unwrap();
        let third = indexer.next_index();
        assert!(third > second);
    }

    #[test]
    fn indices_strictly_increase() {
        let temp = TempDir::new().unwrap();
        let mut indexer = LogIndexer::new(temp.path());
        let mut previous = 0;
        for _ in 0..20 {
            let index = indexer.next_index();
            assert!(index > previous);
            previous = index;
        }
    }

    struct CountingProcessor {
        calls: Cell<u32>,
    }

    impl LogPostProcessor for CountingProcessor {
        fn process(&self, _dir: &Path) -> io::Result<()> {
            self.calls.set(self.calls.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn no_clean_leaves_logs_untouched() {
        let temp = TempDir::new().unwrap();
        for i in 1..=3 {
            fs::write(temp.path().join(format!("{i:03}.log")), "x").unwrap();
        }

        let processor = CountingProcessor { calls: Cell::new(0) };
        cleanup_logs(temp.path(), true, &processor);

        assert_eq!(processor.calls.get(), 0);
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 3);
    }

    #[test]
    fn cleanup_invoked_once_when_logs_exist() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("001.log"), "x").unwrap();

        let processor = CountingProcessor { calls: Cell::new(0) };
        cleanup_logs(temp.path(), false, &processor);

        assert_eq!(processor.calls.get(), 1);
    }

    #[test]
    fn cleanup_skipped_without_logs() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();

        let processor = CountingProcessor { calls: Cell::new(0) };
        cleanup_logs(temp.path(), false, &processor);

        assert_eq!(processor.calls.get(), 0);
    }
}
