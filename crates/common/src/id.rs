//! Execution id generation.
//!
//! Id generation is a capability handed to the coordinator rather than a
//! process-wide random source, so tests can pin ids down.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ExecutionId;

/// Produces fresh execution ids.
pub trait IdGenerator: Send + Sync {
    /// Returns a new id. Implementations must not hand out the same id twice.
    fn next_id(&self) -> ExecutionId;
}

/// Random UUIDv4 ids. This is the default generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> ExecutionId {
        ExecutionId::new()
    }
}

/// Deterministic ids of the form `{prefix}-{n}`, counting from 1.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    /// Creates a generator whose ids start with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> ExecutionId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        ExecutionId::from(format!("{}-{}", self.prefix, n))
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for std::sync::Arc<G> {
    fn next_id(&self) -> ExecutionId {
        (**self).next_id()
    }
}
