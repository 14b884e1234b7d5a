//! Project state resolution.
//!
//! Each iteration starts by re-reading the target project from disk: which
//! metadata directory it uses, whether it already holds a non-trivial
//! codebase, and whether onboarding (initial feature-list generation) has
//! completed. Resolution never fails; a missing project directory simply
//! resolves to an empty, non-existing codebase.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Ranked metadata directory candidates. The first existing one wins; if
/// none exist the top-ranked name is created.
pub const METADATA_DIR_CANDIDATES: &[&str] = &[".drover", ".autodev"];

/// Copied specification inside the metadata directory.
pub const SPEC_FILE_NAME: &str = "spec.txt";

/// Feature list produced by onboarding.
pub const FEATURE_LIST_FILE_NAME: &str = "feature_list.json";

/// Todo tracking file required by todo mode.
pub const TODO_FILE_NAME: &str = "todo.md";

/// Directory holding per-iteration transcript logs.
pub const ITERATIONS_DIR_NAME: &str = "iterations";

/// Directory holding the scaffolded prompt documents.
pub const PROMPTS_DIR_NAME: &str = "prompts";

/// Iteration history JSONL file.
pub const HISTORY_FILE_NAME: &str = "history.jsonl";

/// Date placeholder left in an unfilled feature-list template.
pub const DATE_PLACEHOLDER: &str = "YYYY-MM-DD";

/// Feature-name placeholder left in an unfilled feature-list template.
pub const FEATURE_NAME_PLACEHOLDER: &str = "Replace with feature name";

/// Entries that do not count as project content when deciding whether a
/// directory already holds a codebase.
const CODEBASE_IGNORE: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".drover",
    ".autodev",
    ".idea",
    ".vscode",
    ".DS_Store",
    "Thumbs.db",
    "node_modules",
    "target",
];

/// On-disk state of the target project, recomputed at the start of every
/// iteration.
#[derive(Debug, Clone)]
pub struct ProjectState {
    /// Root of the target project.
    pub project_root: PathBuf,

    /// Resolved metadata directory under the project root.
    pub metadata_dir: PathBuf,

    /// The directory existed at resolution time and contains at least one
    /// entry outside the ignore set.
    pub is_existing_codebase: bool,

    /// The project directory did not exist when this run started. Fixed at
    /// process start, never recomputed.
    pub is_new_project: bool,

    /// `feature_list.json` exists and no template placeholder survives.
    pub onboarding_complete: bool,
}

impl ProjectState {
    /// Path of the copied specification file.
    pub fn spec_path(&self) -> PathBuf {
        self.metadata_dir.join(SPEC_FILE_NAME)
    }

    /// Path of the feature list file.
    pub fn feature_list_path(&self) -> PathBuf {
        self.metadata_dir.join(FEATURE_LIST_FILE_NAME)
    }

    /// Path of the todo tracking file.
    pub fn todo_path(&self) -> PathBuf {
        self.metadata_dir.join(TODO_FILE_NAME)
    }

    /// Directory holding numbered transcript logs.
    pub fn iterations_dir(&self) -> PathBuf {
        self.metadata_dir.join(ITERATIONS_DIR_NAME)
    }

    /// Directory holding the scaffolded prompt documents.
    pub fn prompts_dir(&self) -> PathBuf {
        self.metadata_dir.join(PROMPTS_DIR_NAME)
    }

    /// Path of the iteration history JSONL file.
    pub fn history_path(&self) -> PathBuf {
        self.metadata_dir.join(HISTORY_FILE_NAME)
    }
}

/// Resolves the project state from disk.
///
/// Idempotent and safe to call every iteration: the metadata directory is
/// created at most once, and all detection is read-only.
///
/// `is_new_project` is determined once by the caller at process start (the
/// project directory did not exist) and threaded through unchanged.
pub fn resolve_project_state(project_root: &Path, is_new_project: bool) -> ProjectState {
    let is_existing_codebase = detect_existing_codebase(project_root);
    let metadata_dir = resolve_metadata_dir(project_root);
    let onboarding_complete = detect_onboarding_complete(&metadata_dir.join(FEATURE_LIST_FILE_NAME));

    debug!(
        metadata_dir = %metadata_dir.display(),
        is_existing_codebase,
        onboarding_complete,
        "Resolved project state"
    );

    ProjectState {
        project_root: project_root.to_path_buf(),
        metadata_dir,
        is_existing_codebase,
        is_new_project,
        onboarding_complete,
    }
}

/// Returns the first existing metadata directory candidate, creating the
/// top-ranked one when none exist.
fn resolve_metadata_dir(project_root: &Path) -> PathBuf {
    for candidate in METADATA_DIR_CANDIDATES {
        let dir = project_root.join(candidate);
        if dir.is_dir() {
            return dir;
        }
    }

    let default = project_root.join(METADATA_DIR_CANDIDATES[0]);
    if let Err(e) = fs::create_dir_all(&default) {
        // Resolution itself never fails; the supervisor will surface any
        // real permission problem when it tries to write the first log.
        warn!(dir = %default.display(), error = %e, "Could not create metadata directory");
    }
    default
}

/// A directory is an existing codebase if it exists and contains at least
/// one entry whose name is not in the ignore set.
fn detect_existing_codebase(project_root: &Path) -> bool {
    let entries = match fs::read_dir(project_root) {
        Ok(entries) => entries,
        Err(_) => return false,
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !CODEBASE_IGNORE.iter().any(|ignored| *ignored == name) {
            return true;
        }
    }
    false
}

/// Onboarding is complete when the feature list exists and neither template
/// placeholder survives in its raw text. An unreadable file counts as
/// incomplete.
fn detect_onboarding_complete(feature_list: &Path) -> bool {
    match fs::read_to_string(feature_list) {
        Ok(text) => !text.contains(DATE_PLACEHOLDER) && !text.contains(FEATURE_NAME_PLACEHOLDER),
        Err(_) => false,
    }
}
