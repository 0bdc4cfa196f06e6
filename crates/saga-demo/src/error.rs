//! Demo error types.

use saga::{ConfigurationError, SagaError};
use saga_log::LogStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemoError {
    /// The transfer saga could not be assembled.
    #[error("Saga configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The run was halted by the engine.
    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),

    /// Reading the log back failed.
    #[error("Log store error: {0}")]
    Store(#[from] LogStoreError),
}
