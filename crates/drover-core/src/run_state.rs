//! Controller run state.
//!
//! A single explicit value owned by the iteration controller: the streak of
//! consecutive non-exempt failures and the last failing exit code. The
//! streak resets on any successful iteration and is compared against the
//! `--quit-on-abort` threshold after every iteration.

use crate::exit_code;

/// How an iteration's exit code affected the failure streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Exit code 0: the streak was reset.
    Reset,
    /// A timeout code with `--continue-on-timeout` enabled: the streak was
    /// left unchanged.
    Exempt,
    /// Any other non-zero code: the streak grew to the contained value.
    Counted(u32),
}

/// Process-lifetime failure accounting for one run.
#[derive(Debug, Default)]
pub struct RunState {
    failure_streak: u32,
    last_failure_code: i32,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current consecutive-failure streak.
    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }

    /// Exit code of the most recent counted failure. Meaningful only when
    /// the streak is non-zero.
    pub fn last_failure_code(&self) -> i32 {
        self.last_failure_code
    }

    /// Records one iteration's exit code.
    ///
    /// Zero resets the streak. The two timeout codes (hard and idle) leave
    /// the streak untouched when `continue_on_timeout` is set. Everything
    /// else increments it.
    pub fn record(&mut self, code: i32, continue_on_timeout: bool) -> FailureDisposition {
        if code == exit_code::SUCCESS {
            self.failure_streak = 0;
            return FailureDisposition::Reset;
        }

        if continue_on_timeout && exit_code::is_timeout_code(code) {
            return FailureDisposition::Exempt;
        }

        self.failure_streak += 1;
        self.last_failure_code = code;
        FailureDisposition::Counted(self.failure_streak)
    }

    /// True when the streak has reached a non-zero abort threshold.
    pub fn should_abort(&self, quit_on_abort: u32) -> bool {
        quit_on_abort > 0 && self.failure_streak >= quit_on_abort
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_code::{HARD_TIMEOUT, IDLE_TIMEOUT, NO_ASSISTANT_OUTPUT, PROVIDER_ERROR};

    /// The streak always equals the length of the longest suffix of
    /// non-zero, non-exempt codes in the processed sequence.
    fn streak_of(codes: &[i32], continue_on_timeout: bool) -> u32 {
        let mut state = RunState::new();
        for &code in codes {
            state.record(code, continue_on_timeout);
        }
        state.failure_streak()
    }

    #[test]
    fn streak_counts_longest_failing_suffix() {
        assert_eq!(streak_of(&[0, 0, 0], false), 0);
        assert_eq!(streak_of(&[1, 1, 0], false), 0);
        assert_eq!(streak_of(&[0, 1, 1], false), 2);
        assert_eq!(streak_of(&[1, 0, 1, 2, 3], false), 3);
    }

    #[test]
    fn timeouts_are_exempt_only_with_flag() {
        assert_eq!(streak_of(&[HARD_TIMEOUT, IDLE_TIMEOUT], true), 0);
        assert_eq!(streak_of(&[HARD_TIMEOUT, IDLE_TIMEOUT], false), 2);
        // An exempt code neither grows nor resets the streak.
        assert_eq!(streak_of(&[1, HARD_TIMEOUT, 1], true), 2);
    }

    #[test]
    fn sentinel_codes_are_never_exempt() {
        assert_eq!(streak_of(&[NO_ASSISTANT_OUTPUT, PROVIDER_ERROR], true), 2);
    }

    #[test]
    fn dispositions_are_reported() {
        let mut state = RunState::new();
        assert_eq!(state.record(0, false), FailureDisposition::Reset);
        assert_eq!(state.record(1, false), FailureDisposition::Counted(1));
        assert_eq!(state.record(HARD_TIMEOUT, true), FailureDisposition::Exempt);
        assert_eq!(state.record(2, false), FailureDisposition::Counted(2));
        assert_eq!(state.last_failure_code(), 2);
    }

    #[test]
    fn abort_threshold_zero_is_disabled() {
        let mut state = RunState::new();
        for _ in 0..100 {
            state.record(1, false);
        }
        assert!(!state.should_abort(0));
        assert!(state.should_abort(100));
        assert!(state.should_abort(3));
    }

    #[test]
    fn continue_past_timeout_never_reaches_threshold() {
        // Success, then timeout with the flag set: streak stays at zero.
        let mut state = RunState::new();
        state.record(0, true);
        state.record(HARD_TIMEOUT, true);
        assert!(!state.should_abort(2));
        assert_eq!(state.failure_streak(), 0);
    }
}
