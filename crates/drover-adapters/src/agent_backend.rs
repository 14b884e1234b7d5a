//! Agent CLI backend definition.
//!
//! The backend describes how to invoke the coding agent: the command, its
//! fixed non-interactive flags, and how the per-run timeout and model
//! selection are passed. The prompt itself always travels over stdin and
//! the stream is closed to signal end-of-input.

/// A CLI backend configuration for executing one prompt.
#[derive(Debug, Clone)]
pub struct AgentBackend {
    /// The command to execute.
    pub command: String,
    /// Fixed arguments before the dynamic ones.
    pub args: Vec<String>,
    /// Whether to append `--timeout <secs>` to the invocation.
    pub passes_timeout: bool,
}

impl AgentBackend {
    /// The default agent invocation: headless chat mode with all tools
    /// trusted, prompt on stdin.
    pub fn default_agent() -> Self {
        Self {
            command: "kiro-cli".to_string(),
            args: vec![
                "chat".to_string(),
                "--no-interactive".to_string(),
                "--trust-all-tools".to_string(),
            ],
            passes_timeout: true,
        }
    }

    /// A custom agent command with no implicit flags. Used when the user
    /// drives a wrapper script or a different agent CLI.
    pub fn custom(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            passes_timeout: false,
        }
    }

    /// Creates the backend from an optional custom command override.
    pub fn from_override(command: Option<&str>) -> Self {
        match command {
            Some(cmd) => Self::custom(cmd, Vec::new()),
            None => Self::default_agent(),
        }
    }

    /// Builds the full argument list for one invocation.
    pub fn build_args(&self, model: Option<&str>, timeout_secs: u64) -> Vec<String> {
        let mut args = self.args.clone();
        if self.passes_timeout {
            args.push("--timeout".to_string());
            args.push(timeout_secs.to_string());
        }
        if let Some(model) = model {
            args.push("--model".to_string());
            args.push(model.to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_invocation() {
        let backend = AgentBackend::default_agent();
        let args = backend.build_args(None, 600);

        assert_eq!(backend.command, "kiro-cli");
        assert_eq!(
            args,
            vec![
                "chat",
                "--no-interactive",
                "--trust-all-tools",
                "--timeout",
                "600"
            ]
        );
    }

    #[test]
    fn model_flag_is_appended() {
        let backend = AgentBackend::default_agent();
        let args = backend.build_args(Some("sonnet"), 120);

        assert_eq!(args[args.len() - 2], "--model");
        assert_eq!(args[args.len() - 1], "sonnet");
    }

    #[test]
    fn custom_backend_has_no_implicit_flags() {
        let backend = AgentBackend::custom("my-agent", vec!["--fast".to_string()]);
        let args = backend.build_args(None, 600);

        assert_eq!(backend.command, "my-agent");
        assert_eq!(args, vec!["--fast"]);
    }

    #[test]
    fn custom_backend_still_accepts_model() {
        let backend = AgentBackend::custom("my-agent", Vec::new());
        let args = backend.build_args(Some("opus"), 600);

        assert_eq!(args, vec!["--model", "opus"]);
    }

    #[test]
    fn override_selects_custom_or_default() {
        assert_eq!(AgentBackend::from_override(None).command, "kiro-cli");
        assert_eq!(
            AgentBackend::from_override(Some("wrapper.sh")).command,
            "wrapper.sh"
        );
    }
}
