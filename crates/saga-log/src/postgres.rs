use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    ExecutionId, LogEntry, LogStoreError, LogType, PostgresConfig, Result, store::LogStore,
};

const SELECT_COLUMNS: &str = "execution_id, saga_name, log_type, timestamp, step_index, \
     step_name, step_error, step_payload, step_duration_us";

/// PostgreSQL-backed log store implementation.
///
/// Entries live in the `saga_logs` table. Append order is the `seq`
/// identity column, so queries order by it rather than by timestamp.
#[derive(Clone)]
pub struct PostgresLogStore {
    pool: PgPool,
}

impl PostgresLogStore {
    /// Creates a new PostgreSQL log store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using `config`, running migrations if it asks for them.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| LogStoreError::Backend("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;
        let store = Self::new(pool);

        if config.run_migrations {
            store.run_migrations().await?;
        }
        tracing::info!(
            max_connections = config.max_connections,
            "connected to postgres log store"
        );
        Ok(store)
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_entry(row: PgRow) -> Result<LogEntry> {
        let execution_id = ExecutionId::from(row.try_get::<String, _>("execution_id")?);
        let log_type: LogType = row.try_get::<String, _>("log_type")?.parse()?;

        let step_index = row
            .try_get::<Option<i64>, _>("step_index")?
            .map(usize::try_from)
            .transpose()
            .map_err(|_| LogStoreError::Corrupt {
                execution_id: execution_id.clone(),
                reason: "negative step_index".to_string(),
            })?;
        let step_duration = row
            .try_get::<Option<i64>, _>("step_duration_us")?
            .map(u64::try_from)
            .transpose()
            .map_err(|_| LogStoreError::Corrupt {
                execution_id: execution_id.clone(),
                reason: "negative step_duration_us".to_string(),
            })?
            .map(Duration::from_micros);
        let step_payload = row
            .try_get::<Option<Vec<u8>>, _>("step_payload")?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?;

        Ok(LogEntry {
            execution_id,
            saga_name: row.try_get("saga_name")?,
            log_type,
            timestamp: row.try_get("timestamp")?,
            step_index,
            step_name: row.try_get("step_name")?,
            step_error: row.try_get("step_error")?,
            step_payload,
            step_duration,
        })
    }
}

#[async_trait]
impl LogStore for PostgresLogStore {
    async fn append_log(&self, entry: LogEntry) -> Result<()> {
        let step_index = entry
            .step_index
            .map(i64::try_from)
            .transpose()
            .map_err(|_| LogStoreError::Backend("step_index out of range".to_string()))?;
        let step_duration_us = entry
            .step_duration
            .map(|d| i64::try_from(d.as_micros()))
            .transpose()
            .map_err(|_| LogStoreError::Backend("step_duration out of range".to_string()))?;
        let step_payload = entry
            .step_payload
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO saga_logs (execution_id, saga_name, log_type, timestamp, step_index,
                                   step_name, step_error, step_payload, step_duration_us)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.execution_id.as_str())
        .bind(&entry.saga_name)
        .bind(entry.log_type.as_str())
        .bind(entry.timestamp)
        .bind(step_index)
        .bind(&entry.step_name)
        .bind(&entry.step_error)
        .bind(step_payload)
        .bind(step_duration_us)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_all_logs_by_execution_id(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<LogEntry>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM saga_logs WHERE execution_id = $1 ORDER BY seq ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(execution_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn get_step_logs_to_compensate(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<LogEntry>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM saga_logs \
             WHERE execution_id = $1 AND log_type = $2 AND step_error IS NULL \
             ORDER BY seq DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(execution_id.as_str())
            .bind(LogType::SagaStepExec.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }
}
