use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExecutionId, LogStoreError};

/// The kind of event a log entry records.
///
/// A run always starts with `StartSaga` and ends with `SagaComplete`. In
/// between there is one `SagaStepExec` per attempted step and, if a step
/// failed, one `SagaAbort` followed by one `SagaStepCompensate` per
/// compensation attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogType {
    StartSaga,
    SagaStepExec,
    SagaAbort,
    SagaStepCompensate,
    SagaComplete,
}

impl LogType {
    /// Returns the persisted name of this log type.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::StartSaga => "StartSaga",
            LogType::SagaStepExec => "SagaStepExec",
            LogType::SagaAbort => "SagaAbort",
            LogType::SagaStepCompensate => "SagaStepCompensate",
            LogType::SagaComplete => "SagaComplete",
        }
    }
}

impl std::fmt::Display for LogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogType {
    type Err = LogStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "StartSaga" => Ok(LogType::StartSaga),
            "SagaStepExec" => Ok(LogType::SagaStepExec),
            "SagaAbort" => Ok(LogType::SagaAbort),
            "SagaStepCompensate" => Ok(LogType::SagaStepCompensate),
            "SagaComplete" => Ok(LogType::SagaComplete),
            other => Err(LogStoreError::InvalidLogType(other.to_string())),
        }
    }
}

/// One immutable record in a saga execution log.
///
/// The optional fields are populated depending on [`LogType`]:
///
/// | type                 | step_index          | step_name | step_error | step_payload | step_duration |
/// |----------------------|---------------------|-----------|------------|--------------|---------------|
/// | `StartSaga`          | -                   | -         | -          | -            | -             |
/// | `SagaStepExec`       | step position       | yes       | on failure | on success   | yes           |
/// | `SagaAbort`          | compensation count  | -         | -          | -            | -             |
/// | `SagaStepCompensate` | step position       | yes       | -          | -            | -             |
/// | `SagaComplete`       | -                   | -         | -          | -            | -             |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The run this entry belongs to.
    pub execution_id: ExecutionId,

    /// Name of the saga being executed.
    pub saga_name: String,

    /// What happened.
    pub log_type: LogType,

    /// When the entry was created.
    pub timestamp: DateTime<Utc>,

    /// Zero-based step position; for `SagaAbort`, the number of steps to compensate.
    pub step_index: Option<usize>,

    /// Name of the step.
    pub step_name: Option<String>,

    /// Error message of a failed step. Present if and only if the step failed.
    pub step_error: Option<String>,

    /// The step's non-error outputs as a JSON array, in declaration order.
    pub step_payload: Option<serde_json::Value>,

    /// How long the forward call took.
    pub step_duration: Option<Duration>,
}

impl LogEntry {
    fn base(execution_id: &ExecutionId, saga_name: &str, log_type: LogType) -> Self {
        Self {
            execution_id: execution_id.clone(),
            saga_name: saga_name.to_string(),
            log_type,
            timestamp: Utc::now(),
            step_index: None,
            step_name: None,
            step_error: None,
            step_payload: None,
            step_duration: None,
        }
    }

    /// Creates a `StartSaga` entry.
    pub fn start_saga(execution_id: &ExecutionId, saga_name: &str) -> Self {
        Self::base(execution_id, saga_name, LogType::StartSaga)
    }

    /// Creates a `SagaStepExec` entry for a step that completed successfully.
    pub fn step_succeeded(
        execution_id: &ExecutionId,
        saga_name: &str,
        step_index: usize,
        step_name: &str,
        payload: serde_json::Value,
        duration: Duration,
    ) -> Self {
        Self {
            step_index: Some(step_index),
            step_name: Some(step_name.to_string()),
            step_payload: Some(payload),
            step_duration: Some(duration),
            ..Self::base(execution_id, saga_name, LogType::SagaStepExec)
        }
    }

    /// Creates a `SagaStepExec` entry for a step whose forward call failed.
    pub fn step_failed(
        execution_id: &ExecutionId,
        saga_name: &str,
        step_index: usize,
        step_name: &str,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            step_index: Some(step_index),
            step_name: Some(step_name.to_string()),
            step_error: Some(error.into()),
            step_duration: Some(duration),
            ..Self::base(execution_id, saga_name, LogType::SagaStepExec)
        }
    }

    /// Creates a `SagaAbort` entry recording how many steps will be compensated.
    pub fn saga_abort(execution_id: &ExecutionId, saga_name: &str, to_compensate: usize) -> Self {
        Self {
            step_index: Some(to_compensate),
            ..Self::base(execution_id, saga_name, LogType::SagaAbort)
        }
    }

    /// Creates a `SagaStepCompensate` entry.
    pub fn step_compensate(
        execution_id: &ExecutionId,
        saga_name: &str,
        step_index: usize,
        step_name: &str,
    ) -> Self {
        Self {
            step_index: Some(step_index),
            step_name: Some(step_name.to_string()),
            ..Self::base(execution_id, saga_name, LogType::SagaStepCompensate)
        }
    }

    /// Creates a `SagaComplete` entry.
    pub fn saga_complete(execution_id: &ExecutionId, saga_name: &str) -> Self {
        Self::base(execution_id, saga_name, LogType::SagaComplete)
    }

    /// Returns true for a `SagaStepExec` entry without an error, i.e. a step
    /// that must be undone if the run aborts.
    pub fn is_compensable(&self) -> bool {
        self.log_type == LogType::SagaStepExec && self.step_error.is_none()
    }

    /// For a `SagaAbort` entry, the number of compensations it announced.
    pub fn compensation_count(&self) -> Option<usize> {
        match self.log_type {
            LogType::SagaAbort => self.step_index,
            _ => None,
        }
    }
}
