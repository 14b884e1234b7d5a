//! Reserved exit codes for supervised agent invocations.
//!
//! The supervisor classifies every invocation into one of these codes or
//! the child's real exit status. The controller and the abort policy key
//! off the same constants.

/// Successful iteration.
pub const SUCCESS: i32 = 0;

/// Hard per-iteration timeout, the conventional `timeout(1)` code.
pub const HARD_TIMEOUT: i32 = 124;

/// The "no assistant messages returned" sentinel was seen in agent output.
pub const NO_ASSISTANT_OUTPUT: i32 = 101;

/// The "provider returned an error" sentinel was seen in agent output.
pub const PROVIDER_ERROR: i32 = 102;

/// The agent produced no output for longer than the idle timeout and was
/// killed. Distinct from [`HARD_TIMEOUT`].
pub const IDLE_TIMEOUT: i32 = 125;

/// The agent process could not be launched at all.
pub const LAUNCH_FAILURE: i32 = 127;

/// Fatal configuration error; no iteration was attempted.
pub const CONFIG_ERROR: i32 = 2;

/// External interrupt (SIGINT/SIGTERM), 128 + 2.
pub const INTERRUPTED: i32 = 130;

/// True for the two liveness codes that `--continue-on-timeout` exempts
/// from the failure streak.
pub fn is_timeout_code(code: i32) -> bool {
    code == HARD_TIMEOUT || code == IDLE_TIMEOUT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_codes_are_exemptable() {
        assert!(is_timeout_code(HARD_TIMEOUT));
        assert!(is_timeout_code(IDLE_TIMEOUT));
        assert!(!is_timeout_code(NO_ASSISTANT_OUTPUT));
        assert!(!is_timeout_code(PROVIDER_ERROR));
        assert!(!is_timeout_code(SUCCESS));
        assert!(!is_timeout_code(1));
    }
}
