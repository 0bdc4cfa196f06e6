use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{ExecutionId, LogEntry, LogType, Result};

/// Core trait for saga log storage.
///
/// A log store persists [`LogEntry`] values and answers queries scoped to one
/// execution id. All implementations must be thread-safe (Send + Sync) and
/// must isolate distinct execution ids from each other; a single id is only
/// ever written by one coordinator at a time.
///
/// Cancellation follows the usual async rule: dropping a returned future
/// abandons the operation.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Durably persists one entry.
    ///
    /// Entries for the same execution id must be returned by the query
    /// methods in the order they were appended.
    async fn append_log(&self, entry: LogEntry) -> Result<()>;

    /// Returns all entries for an execution, oldest first.
    ///
    /// An unknown execution id yields an empty list.
    async fn get_all_logs_by_execution_id(&self, execution_id: &ExecutionId)
    -> Result<Vec<LogEntry>>;

    /// Returns the `SagaStepExec` entries without a `step_error`, most recent
    /// first, ready to be compensated in that order.
    async fn get_step_logs_to_compensate(&self, execution_id: &ExecutionId)
    -> Result<Vec<LogEntry>>;
}

#[async_trait]
impl<S: LogStore + ?Sized> LogStore for Arc<S> {
    async fn append_log(&self, entry: LogEntry) -> Result<()> {
        (**self).append_log(entry).await
    }

    async fn get_all_logs_by_execution_id(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<LogEntry>> {
        (**self).get_all_logs_by_execution_id(execution_id).await
    }

    async fn get_step_logs_to_compensate(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<LogEntry>> {
        (**self).get_step_logs_to_compensate(execution_id).await
    }
}

/// Extension trait providing convenience queries over a log store.
#[async_trait]
pub trait LogStoreExt: LogStore {
    /// Returns true if the execution has a `SagaComplete` entry.
    async fn is_complete(&self, execution_id: &ExecutionId) -> Result<bool> {
        let logs = self.get_all_logs_by_execution_id(execution_id).await?;
        Ok(logs.iter().any(|e| e.log_type == LogType::SagaComplete))
    }

    /// Returns the positions of the steps that already have a
    /// `SagaStepCompensate` entry.
    async fn compensated_step_indices(&self, execution_id: &ExecutionId) -> Result<HashSet<usize>> {
        let logs = self.get_all_logs_by_execution_id(execution_id).await?;
        Ok(logs
            .iter()
            .filter(|e| e.log_type == LogType::SagaStepCompensate)
            .filter_map(|e| e.step_index)
            .collect())
    }
}

// Blanket implementation for all LogStore implementations
impl<T: LogStore + ?Sized> LogStoreExt for T {}
