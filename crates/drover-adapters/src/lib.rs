//! # drover-adapters
//!
//! The agent CLI boundary for the drover iteration engine: backend command
//! construction and the async process supervisor that runs one agent
//! invocation with liveness monitoring, sentinel detection, and timeout
//! enforcement.

mod agent_backend;
mod supervisor;

pub use agent_backend::AgentBackend;
pub use supervisor::{
    OutputSink, SENTINEL_NO_ASSISTANT, SENTINEL_PROVIDER_ERROR, Supervisor, SupervisorError,
};
