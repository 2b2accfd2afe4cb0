//! Processing job states and their state machine.
//!
//! ```text
//! Idle -> Running -> { Completed, Cancelled, Failed }
//! ```
//!
//! Terminal states have no outgoing transitions.

use std::fmt;

use serde::Serialize;

/// Consecutive inference failures after which a job is failed.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Lifecycle state of a processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Cancelled,
    Completed,
    Failed,
}

impl JobState {
    /// States reachable from `self` in one step.
    pub fn valid_transitions(self) -> &'static [JobState] {
        match self {
            JobState::Idle => &[JobState::Running],
            JobState::Running => &[JobState::Completed, JobState::Cancelled, JobState::Failed],
            JobState::Cancelled | JobState::Completed | JobState::Failed => &[],
        }
    }

    pub fn can_transition(self, to: JobState) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(self, to: JobState) -> Result<(), String> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(format!("Invalid transition: {self} -> {to}"))
        }
    }

    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Cancelled => "cancelled",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
