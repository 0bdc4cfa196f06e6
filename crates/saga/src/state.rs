//! Coordinator state machine.

use serde::{Deserialize, Serialize};

/// The state of one saga run in its lifecycle.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──────────────────────────────────► Completed
///                          └──► Aborting ──► Compensating ──────► Completed
/// ```
/// Recovery of an interrupted run starts from `NotStarted` and moves to
/// `Aborting` directly, or to `Running` when every step already succeeded.
/// No state is left once `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CoordinatorState {
    /// The coordinator has been built but not played.
    #[default]
    NotStarted,

    /// Forward steps are being executed.
    Running,

    /// A step failed; the steps to compensate are being looked up.
    Aborting,

    /// Compensations are being invoked.
    Compensating,

    /// `SagaComplete` has been logged (terminal state).
    Completed,
}

impl CoordinatorState {
    /// Returns true if the run can begin executing steps.
    pub fn can_run(&self) -> bool {
        matches!(self, CoordinatorState::NotStarted)
    }

    /// Returns true if the run can begin aborting.
    pub fn can_abort(&self) -> bool {
        matches!(self, CoordinatorState::NotStarted | CoordinatorState::Running)
    }

    /// Returns true if compensations can start.
    pub fn can_compensate(&self) -> bool {
        matches!(self, CoordinatorState::Aborting)
    }

    /// Returns true if `SagaComplete` can close the run from here.
    pub fn can_complete(&self) -> bool {
        matches!(self, CoordinatorState::Running | CoordinatorState::Compensating)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CoordinatorState::Completed)
    }

    /// Returns true if the lifecycle allows moving from this state to `next`.
    pub fn can_transition_to(&self, next: CoordinatorState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            CoordinatorState::NotStarted => false,
            CoordinatorState::Running => self.can_run(),
            CoordinatorState::Aborting => self.can_abort(),
            CoordinatorState::Compensating => self.can_compensate(),
            CoordinatorState::Completed => self.can_complete(),
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatorState::NotStarted => "NotStarted",
            CoordinatorState::Running => "Running",
            CoordinatorState::Aborting => "Aborting",
            CoordinatorState::Compensating => "Compensating",
            CoordinatorState::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
