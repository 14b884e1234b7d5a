//! # drover-core
//!
//! Core state and decision logic for the drover iteration engine.
//!
//! This crate provides:
//! - Run configuration and validation
//! - Project state resolution (metadata directory, onboarding detection)
//! - Phase selection for each iteration
//! - Failure-streak accounting for the abort policy
//! - Transcript log indexing and end-of-run cleanup
//! - Iteration history records
//!
//! Nothing in this crate spawns processes; the agent boundary lives in
//! `drover-adapters` and the controller loop in `drover-cli`.

mod config;
pub mod exit_code;
mod history;
mod log_index;
mod phase;
mod project;
mod run_state;

pub use config::{
    ConfigError, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, ModelProfile, RunConfig,
    ensure_spec_available,
};
pub use history::{IterationRecord, RunHistory};
pub use log_index::{
    CommandPostProcessor, LogIndexer, LogPostProcessor, NoopPostProcessor, cleanup_logs,
};
pub use phase::{Phase, PhaseError, select_phase};
pub use project::{
    DATE_PLACEHOLDER, FEATURE_LIST_FILE_NAME, FEATURE_NAME_PLACEHOLDER, ITERATIONS_DIR_NAME,
    METADATA_DIR_CANDIDATES, PROMPTS_DIR_NAME, ProjectState, SPEC_FILE_NAME, TODO_FILE_NAME,
    resolve_project_state,
};
pub use run_state::{FailureDisposition, RunState};
