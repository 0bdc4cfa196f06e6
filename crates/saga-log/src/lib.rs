//! Durable, append-only log of saga executions.
//!
//! Every run of a saga writes a bracketed sequence of [`LogEntry`] values
//! (`StartSaga` … `SagaComplete`) keyed by its [`ExecutionId`]. The log is the
//! source of truth for which steps completed and therefore which ones must be
//! compensated, and it carries the serialized step outputs that compensations
//! are replayed with.

pub mod config;
pub mod entry;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::ExecutionId;
pub use config::PostgresConfig;
pub use entry::{LogEntry, LogType};
pub use error::{LogStoreError, Result};
pub use memory::InMemoryLogStore;
pub use postgres::PostgresLogStore;
pub use store::{LogStore, LogStoreExt};
