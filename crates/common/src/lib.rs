pub mod id;
pub mod types;

pub use id::{IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use types::ExecutionId;
