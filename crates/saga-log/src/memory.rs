use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{ExecutionId, LogEntry, Result, store::LogStore};

/// In-memory log store implementation.
///
/// Entries are kept per execution id in append order. Cloning the store is
/// cheap and every clone shares the same underlying map, so a test can hand
/// one clone to a coordinator and inspect the log through another.
#[derive(Clone, Default)]
pub struct InMemoryLogStore {
    logs: Arc<RwLock<HashMap<ExecutionId, Vec<LogEntry>>>>,
}

impl InMemoryLogStore {
    /// Creates a new empty in-memory log store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of distinct executions that have entries.
    pub async fn execution_count(&self) -> usize {
        self.logs.read().await.len()
    }

    /// Returns the total number of entries across all executions.
    pub async fn entry_count(&self) -> usize {
        self.logs.read().await.values().map(Vec::len).sum()
    }

    /// Clears all entries.
    pub async fn clear(&self) {
        self.logs.write().await.clear();
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn append_log(&self, entry: LogEntry) -> Result<()> {
        let mut logs = self.logs.write().await;
        logs.entry(entry.execution_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn get_all_logs_by_execution_id(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<LogEntry>> {
        let logs = self.logs.read().await;
        Ok(logs.get(execution_id).cloned().unwrap_or_default())
    }

    async fn get_step_logs_to_compensate(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<LogEntry>> {
        let logs = self.logs.read().await;
        let entries = logs
            .get(execution_id)
            .map(|entries| {
                entries
                    .iter()
                    .rev()
                    .filter(|e| e.is_compensable())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::LogType;

    fn succeeded(id: &ExecutionId, index: usize, name: &str) -> LogEntry {
        LogEntry::step_succeeded(
            id,
            "test-saga",
            index,
            name,
            serde_json::json!([index]),
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn append_and_read_back_in_order() {
        let store = InMemoryLogStore::new();
        let id = ExecutionId::new();

        store
            .append_log(LogEntry::start_saga(&id, "test-saga"))
            .await
            .unwrap();
        store.append_log(succeeded(&id, 0, "first")).await.unwrap();
        store
            .append_log(LogEntry::saga_complete(&id, "test-saga"))
            .await
            .unwrap();

        let logs = store.get_all_logs_by_execution_id(&id).await.unwrap();
        let types: Vec<_> = logs.iter().map(|e| e.log_type).collect();
        assert_eq!(
            types,
            vec![
                LogType::StartSaga,
                LogType::SagaStepExec,
                LogType::SagaComplete
            ]
        );
    }

    #[tokio::test]
    async fn unknown_execution_has_no_logs() {
        let store = InMemoryLogStore::new();
        let id = ExecutionId::from("missing");

        assert!(store.get_all_logs_by_execution_id(&id).await.unwrap().is_empty());
        assert!(store.get_step_logs_to_compensate(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn steps_to_compensate_are_successful_steps_most_recent_first() {
        let store = InMemoryLogStore::new();
        let id = ExecutionId::new();

        store
            .append_log(LogEntry::start_saga(&id, "test-saga"))
            .await
            .unwrap();
        store.append_log(succeeded(&id, 0, "first")).await.unwrap();
        store.append_log(succeeded(&id, 1, "second")).await.unwrap();
        store
            .append_log(LogEntry::step_failed(
                &id,
                "test-saga",
                2,
                "third",
                "boom",
                Duration::ZERO,
            ))
            .await
            .unwrap();

        let to_compensate = store.get_step_logs_to_compensate(&id).await.unwrap();
        let indices: Vec<_> = to_compensate.iter().map(|e| e.step_index).collect();
        assert_eq!(indices, vec![Some(1), Some(0)]);
    }

    #[tokio::test]
    async fn executions_are_isolated() {
        let store = InMemoryLogStore::new();
        let id1 = ExecutionId::from("one");
        let id2 = ExecutionId::from("two");

        store.append_log(succeeded(&id1, 0, "a")).await.unwrap();
        store.append_log(succeeded(&id2, 0, "b")).await.unwrap();
        store.append_log(succeeded(&id2, 1, "c")).await.unwrap();

        assert_eq!(store.execution_count().await, 2);
        assert_eq!(store.entry_count().await, 3);
        assert_eq!(
            store.get_all_logs_by_execution_id(&id1).await.unwrap().len(),
            1
        );
        assert_eq!(
            store.get_step_logs_to_compensate(&id2).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn concurrent_appends_to_distinct_executions() {
        let store = InMemoryLogStore::new();

        let mut handles = Vec::new();
        for n in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = ExecutionId::from(format!("exec-{n}"));
                for i in 0..10 {
                    store.append_log(succeeded(&id, i, "step")).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.execution_count().await, 8);
        let logs = store
            .get_all_logs_by_execution_id(&ExecutionId::from("exec-3"))
            .await
            .unwrap();
        let indices: Vec<_> = logs.iter().filter_map(|e| e.step_index).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryLogStore::new();
        let id = ExecutionId::new();
        store.append_log(succeeded(&id, 0, "a")).await.unwrap();

        store.clear().await;
        assert_eq!(store.execution_count().await, 0);
    }
}
