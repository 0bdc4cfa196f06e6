//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a Docker daemon,
//! so they are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p saga-log --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use saga_log::{ExecutionId, LogEntry, LogStore, LogStoreExt, LogType, PostgresLogStore};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresLogStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresLogStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE saga_logs")
        .execute(&pool)
        .await
        .unwrap();

    PostgresLogStore::new(pool)
}

fn succeeded(id: &ExecutionId, index: usize, name: &str) -> LogEntry {
    LogEntry::step_succeeded(
        id,
        "pg-saga",
        index,
        name,
        serde_json::json!([{"amount": 10}, "note", null]),
        Duration::from_micros(1500),
    )
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn append_and_retrieve_entries_in_order() {
    let store = get_test_store().await;
    let id = ExecutionId::new();

    store
        .append_log(LogEntry::start_saga(&id, "pg-saga"))
        .await
        .unwrap();
    store.append_log(succeeded(&id, 0, "first")).await.unwrap();
    store
        .append_log(LogEntry::saga_complete(&id, "pg-saga"))
        .await
        .unwrap();

    let logs = store.get_all_logs_by_execution_id(&id).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].log_type, LogType::StartSaga);
    assert_eq!(logs[1].log_type, LogType::SagaStepExec);
    assert_eq!(logs[2].log_type, LogType::SagaComplete);

    let step = &logs[1];
    assert_eq!(step.execution_id, id);
    assert_eq!(step.step_index, Some(0));
    assert_eq!(step.step_name.as_deref(), Some("first"));
    assert_eq!(
        step.step_payload,
        Some(serde_json::json!([{"amount": 10}, "note", null]))
    );
    assert_eq!(step.step_duration, Some(Duration::from_micros(1500)));
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn payload_strings_with_nul_characters_are_stored() {
    let store = get_test_store().await;
    let id = ExecutionId::from("nul-payload");
    let payload = serde_json::json!(["a\u{0000}b", 7]);

    store
        .append_log(LogEntry::step_succeeded(
            &id,
            "pg-saga",
            0,
            "first",
            payload.clone(),
            Duration::ZERO,
        ))
        .await
        .unwrap();

    let logs = store.get_step_logs_to_compensate(&id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].step_payload, Some(payload));
    assert_eq!(
        logs[0].step_payload.as_ref().and_then(|p| p[0].as_str()),
        Some("a\0b")
    );
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn unknown_execution_returns_empty_lists() {
    let store = get_test_store().await;
    let id = ExecutionId::from("nonexistent");

    assert!(store.get_all_logs_by_execution_id(&id).await.unwrap().is_empty());
    assert!(store.get_step_logs_to_compensate(&id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn steps_to_compensate_are_most_recent_first_and_skip_failures() {
    let store = get_test_store().await;
    let id = ExecutionId::new();

    store.append_log(succeeded(&id, 0, "first")).await.unwrap();
    store.append_log(succeeded(&id, 1, "second")).await.unwrap();
    store
        .append_log(LogEntry::step_failed(
            &id,
            "pg-saga",
            2,
            "third",
            "declined",
            Duration::ZERO,
        ))
        .await
        .unwrap();
    store
        .append_log(LogEntry::saga_abort(&id, "pg-saga", 2))
        .await
        .unwrap();

    let logs = store.get_step_logs_to_compensate(&id).await.unwrap();
    let indices: Vec<_> = logs.iter().map(|e| e.step_index).collect();
    assert_eq!(indices, vec![Some(1), Some(0)]);

    let all = store.get_all_logs_by_execution_id(&id).await.unwrap();
    assert_eq!(all[2].step_error.as_deref(), Some("declined"));
    assert_eq!(all[3].compensation_count(), Some(2));
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn executions_are_isolated() {
    let store = get_test_store().await;
    let id1 = ExecutionId::new();
    let id2 = ExecutionId::new();

    store.append_log(succeeded(&id1, 0, "a")).await.unwrap();
    store.append_log(succeeded(&id2, 0, "b")).await.unwrap();
    store
        .append_log(LogEntry::step_compensate(&id2, "pg-saga", 0, "b"))
        .await
        .unwrap();
    store
        .append_log(LogEntry::saga_complete(&id2, "pg-saga"))
        .await
        .unwrap();

    assert_eq!(store.get_all_logs_by_execution_id(&id1).await.unwrap().len(), 1);
    assert!(!store.is_complete(&id1).await.unwrap());
    assert!(store.is_complete(&id2).await.unwrap());
    assert!(store.compensated_step_indices(&id2).await.unwrap().contains(&0));
}
