//! Run configuration.
//!
//! All knobs come from the command line; there is no configuration file.
//! The CLI crate assembles a [`RunConfig`] from parsed arguments and the
//! controller threads it through each iteration unchanged.

use crate::project::ProjectState;
use std::path::PathBuf;
use thiserror::Error;

/// Default per-iteration hard timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Default idle timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 180;

/// Which model override applies to a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProfile {
    /// Initializer and onboarding work.
    Init,
    /// Coding and todo work.
    Coding,
}

/// Configuration for one run of the iteration engine.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Target project directory.
    pub project_dir: PathBuf,

    /// User-supplied specification file, copied to the metadata directory
    /// by the initializer phase.
    pub spec_file: Option<PathBuf>,

    /// Maximum iteration count. `None` runs until interrupted or aborted.
    pub max_iterations: Option<u32>,

    /// Hard per-iteration timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum seconds without agent output before the child is killed.
    pub idle_timeout_secs: u64,

    /// Model for all phases unless a profile override applies.
    pub model: Option<String>,

    /// Model override for the init profile (initializer/onboarding).
    pub init_model: Option<String>,

    /// Model override for the coding profile (coding/todo).
    pub code_model: Option<String>,

    /// Skip the end-of-run log normalization step.
    pub no_log_clean: bool,

    /// Consecutive-failure threshold that aborts the run; 0 disables.
    pub quit_on_abort: u32,

    /// Leave the failure streak untouched on timeout exits.
    pub continue_on_timeout: bool,

    /// Work through the todo file instead of the normal phase ladder.
    pub todo_mode: bool,

    /// Custom agent command overriding the default backend.
    pub agent_command: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::new(),
            spec_file: None,
            max_iterations: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            model: None,
            init_model: None,
            code_model: None,
            no_log_clean: false,
            quit_on_abort: 0,
            continue_on_timeout: false,
            todo_mode: false,
            agent_command: None,
        }
    }
}

impl RunConfig {
    /// Resolves the model argument for a profile: the profile override
    /// wins, then the single `--model`, then none.
    pub fn model_for(&self, profile: ModelProfile) -> Option<&str> {
        let specific = match profile {
            ModelProfile::Init => self.init_model.as_deref(),
            ModelProfile::Coding => self.code_model.as_deref(),
        };
        specific.or(self.model.as_deref())
    }
}

/// Fatal configuration errors, reported before any iteration is attempted.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No prior onboarding state exists and no specification was supplied.
    #[error("a specification file is required (no prior onboarding state under {0:?})")]
    SpecFileRequired(PathBuf),

    /// The supplied specification file cannot be read.
    #[error("specification file {0:?} does not exist")]
    SpecFileNotFound(PathBuf),
}

/// Checks that a specification is available when one is still needed.
///
/// A completed onboarding or an already-copied `spec.txt` counts as prior
/// onboarding state; otherwise `--spec-file` must name an existing file.
pub fn ensure_spec_available(config: &RunConfig, state: &ProjectState) -> Result<(), ConfigError> {
    if state.onboarding_complete || state.spec_path().is_file() {
        return Ok(());
    }

    match &config.spec_file {
        None => Err(ConfigError::SpecFileRequired(state.metadata_dir.clone())),
        Some(path) if !path.is_file() => Err(ConfigError::SpecFileNotFound(path.clone())),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::resolve_project_state;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn model_resolution_prefers_profile_override() {
        let config = RunConfig {
            model: Some("base".into()),
            init_model: Some("heavy".into()),
            ..RunConfig::default()
        };

        assert_eq!(config.model_for(ModelProfile::Init), Some("heavy"));
        assert_eq!(config.model_for(ModelProfile::Coding), Some("base"));

        let bare = RunConfig::default();
        assert_eq!(bare.model_for(ModelProfile::Coding), None);
    }

    #[test]
    fn spec_required_without_prior_state() {
        let temp = TempDir::new().unwrap();
        let state = resolve_project_state(temp.path(), true);
        let config = RunConfig::default();

        let err = ensure_spec_available(&config, &state).unwrap_err();
        assert!(matches!(err, ConfigError::SpecFileRequired(_)));
    }

    #[test]
    fn missing_spec_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let state = resolve_project_state(temp.path(), true);
        let config = RunConfig {
            spec_file: Some(temp.path().join("nope.md")),
            ..RunConfig::default()
        };

        let err = ensure_spec_available(&config, &state).unwrap_err();
        assert!(matches!(err, ConfigError::SpecFileNotFound(_)));
    }

    #[test]
    fn copied_spec_counts_as_prior_state() {
        let temp = TempDir::new().unwrap();
        let state = resolve_project_state(temp.path(), false);
        fs::write(state.spec_path(), "build a thing").unwrap();

        let config = RunConfig::default();
        assert!(ensure_spec_available(&config, &state).is_ok());
    }

    #[test]
    fn completed_onboarding_counts_as_prior_state() {
        let temp = TempDir::new().unwrap();
        let mut state = resolve_project_state(temp.path(), false);
        state.onboarding_complete = true;

        let config = RunConfig::default();
        assert!(ensure_spec_available(&config, &state).is_ok());
    }
}
