//! Saga error types.

use common::ExecutionId;
use saga_log::LogStoreError;
use thiserror::Error;

use crate::signature::Signature;
use crate::state::CoordinatorState;

/// Error type returned by step and compensation functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A step's forward function and its compensation do not fit together.
///
/// Raised by [`Saga::add_step`](crate::Saga::add_step); the step is not added.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The compensation takes a different number of parameters than the
    /// forward function returns values.
    #[error(
        "forward returns {} value(s) {forward} but compensate accepts {} parameter(s) {compensate}",
        .forward.len(),
        .compensate.len()
    )]
    ArityMismatch {
        forward: Signature,
        compensate: Signature,
    },

    /// A compensation parameter has a different type than the forward value
    /// in the same position. Positions count from 1 and exclude the context.
    #[error(
        "parameter {position} not matched between forward and compensate: \
         forward returns {forward}, compensate expects {compensate}"
    )]
    ParameterMismatch {
        position: usize,
        forward: &'static str,
        compensate: &'static str,
    },
}

/// Failure to move step outputs through the log.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// A forward output could not be serialized.
    #[error("failed to encode output {position} ({type_name}): {source}")]
    Encode {
        position: usize,
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A logged value could not be turned back into a compensation argument.
    #[error("failed to decode argument {position} as {type_name}: {source}")]
    Decode {
        position: usize,
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The logged payload is not a JSON array.
    #[error("step payload must be a JSON array, found {0}")]
    NotAnArray(&'static str),
}

/// Fatal errors that halt a saga run.
///
/// These never describe a step's own failure (see [`StepFailure`]); they mean
/// the engine could not keep a durable record of what it was doing, so it
/// stopped rather than act on unlogged state.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The log store failed an append or a query.
    #[error("Log store error: {0}")]
    Store(#[from] LogStoreError),

    /// The coordinator was asked to make a move its lifecycle does not allow.
    #[error("Execution {execution_id} cannot move from {from} to {to}")]
    InvalidTransition {
        execution_id: ExecutionId,
        from: CoordinatorState,
        to: CoordinatorState,
    },

    /// A log entry names a step position the saga does not have.
    #[error("Execution {execution_id} references unknown step {index}")]
    UnknownStep {
        execution_id: ExecutionId,
        index: usize,
    },

    /// A log entry names a different step than the saga defines at that position.
    #[error("Execution {execution_id} logged step {index} as '{logged}' but the saga defines '{defined}'")]
    StepMismatch {
        execution_id: ExecutionId,
        index: usize,
        logged: String,
        defined: String,
    },

    /// A log entry is missing a field its type requires.
    #[error("Corrupt log for execution {execution_id}: {reason}")]
    CorruptLog {
        execution_id: ExecutionId,
        reason: String,
    },

    /// Recovery found no log entries for the execution.
    #[error("Execution not found: {0}")]
    ExecutionNotFound(ExecutionId),

    /// Recovery found a run that already finished.
    #[error("Execution already completed: {0}")]
    AlreadyCompleted(ExecutionId),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

/// The error a step or compensation returned, tagged with the step it came from.
///
/// Displays exactly as the underlying error.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct StepFailure {
    /// Zero-based position of the step in the saga.
    pub step_index: usize,
    /// Name of the step.
    pub step_name: String,
    /// The error the function returned.
    #[source]
    pub source: BoxError,
}

impl StepFailure {
    pub(crate) fn new(step_index: usize, step_name: impl Into<String>, source: BoxError) -> Self {
        Self {
            step_index,
            step_name: step_name.into(),
            source,
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> String {
        self.source.to_string()
    }
}
