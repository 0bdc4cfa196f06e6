//! Log-driven saga execution engine.
//!
//! A [`Saga`] is an ordered list of [`Step`]s, each a forward function paired
//! with a compensation that undoes it. An [`ExecutionCoordinator`] runs the
//! steps in order against a [`LogStore`](saga_log::LogStore). If a step
//! fails, every step that completed before it is compensated in reverse
//! order, with arguments rebuilt from the outputs recorded in the log.
//!
//! ```no_run
//! use saga::{BoxError, ExecutionCoordinator, Saga};
//! use saga_log::InMemoryLogStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut saga = Saga::new("transfer");
//! saga.add_step(
//!     "debit",
//!     |amount: i64| async move { Ok::<_, BoxError>((amount,)) },
//!     |_amount: i64, (debited,): (i64,)| async move {
//!         println!("refunding {debited}");
//!         Ok::<(), BoxError>(())
//!     },
//! )?;
//!
//! let outcome = ExecutionCoordinator::new(100, 100, &saga, InMemoryLogStore::new())
//!     .play()
//!     .await?;
//! assert!(outcome.is_success());
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod error;
pub mod outcome;
pub mod payload;
pub mod saga;
pub mod signature;
pub mod state;
pub mod step;

pub use common::{ExecutionId, IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use coordinator::{CoordinatorBuilder, ExecutionCoordinator};
pub use error::{BoxError, ConfigurationError, PayloadError, Result, SagaError, StepFailure};
pub use outcome::Outcome;
pub use payload::{CompensateArgs, StepOutput};
pub use saga::Saga;
pub use signature::{Signature, TypeSlot};
pub use state::CoordinatorState;
pub use step::{Step, StepOptions};
