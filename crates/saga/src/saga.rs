//! Saga definition: an ordered list of validated steps.

use std::future::Future;

use crate::error::{BoxError, ConfigurationError};
use crate::payload::{CompensateArgs, StepOutput};
use crate::signature::Signature;
use crate::step::Step;

/// An ordered, named sequence of steps.
///
/// Steps run in the order they were added and are compensated in reverse.
/// Steps can only be appended, and only once their compensation has been
/// checked against their forward function. A coordinator borrows the saga
/// for the length of a run, so it cannot change while it executes.
///
/// `Ctx` is the context type handed to every forward function and
/// compensation; it is cloned for each call.
pub struct Saga<Ctx> {
    name: String,
    steps: Vec<Step<Ctx>>,
}

impl<Ctx> Saga<Ctx>
where
    Ctx: Send + 'static,
{
    /// Creates an empty saga.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Builds a step from `forward` and `compensate` and appends it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if `compensate`'s parameters do not
    /// match `forward`'s outputs in number and type; the step is not added.
    pub fn add_step<F, FFut, O, C, CFut, A>(
        &mut self,
        name: impl Into<String>,
        forward: F,
        compensate: C,
    ) -> Result<(), ConfigurationError>
    where
        F: Fn(Ctx) -> FFut + Send + Sync + 'static,
        FFut: Future<Output = Result<O, BoxError>> + Send + 'static,
        O: StepOutput,
        C: Fn(Ctx, A) -> CFut + Send + Sync + 'static,
        CFut: Future<Output = Result<(), BoxError>> + Send + 'static,
        A: CompensateArgs,
    {
        self.add(Step::new(name, forward, compensate))
    }

    /// Appends a prebuilt step.
    ///
    /// # Errors
    ///
    /// Same as [`add_step`](Self::add_step).
    pub fn add(&mut self, step: Step<Ctx>) -> Result<(), ConfigurationError> {
        if let Err(error) =
            Signature::check_compatible(step.output_signature(), step.args_signature())
        {
            tracing::warn!(saga = %self.name, step = step.name(), %error, "rejected saga step");
            return Err(error);
        }
        self.steps.push(step);
        Ok(())
    }
}

impl<Ctx> Saga<Ctx> {
    /// The saga's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The steps, in execution order.
    pub fn steps(&self) -> &[Step<Ctx>] {
        &self.steps
    }

    /// The step at `index`, if any.
    pub fn step(&self, index: usize) -> Option<&Step<Ctx>> {
        self.steps.get(index)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the saga has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<Ctx> std::fmt::Debug for Saga<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Saga")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::step::StepOptions;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Reservation {
        sku: String,
        quantity: u32,
    }

    async fn reserve(_ctx: ()) -> Result<(Reservation, u64), BoxError> {
        Ok((
            Reservation {
                sku: "SKU-1".to_string(),
                quantity: 2,
            },
            7,
        ))
    }

    async fn release(_ctx: (), _args: (Reservation, u64)) -> Result<(), BoxError> {
        Ok(())
    }

    async fn release_wrong_order(_ctx: (), _args: (u64, Reservation)) -> Result<(), BoxError> {
        Ok(())
    }

    async fn release_reservation_only(_ctx: (), _args: (Reservation,)) -> Result<(), BoxError> {
        Ok(())
    }

    async fn release_with_string(_ctx: (), _args: (Reservation, String)) -> Result<(), BoxError> {
        Ok(())
    }

    #[test]
    fn matching_step_is_added() {
        let mut saga = Saga::new("order");
        saga.add_step("reserve", reserve, release).unwrap();

        assert_eq!(saga.name(), "order");
        assert_eq!(saga.len(), 1);
        assert_eq!(saga.step(0).map(Step::name), Some("reserve"));
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let mut saga = Saga::new("order");
        let err = saga
            .add_step("reserve", reserve, release_reservation_only)
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::ArityMismatch { .. }));
        assert!(saga.is_empty());
    }

    #[test]
    fn positional_type_mismatch_is_rejected() {
        let mut saga = Saga::new("order");

        let err = saga
            .add_step("reserve", reserve, release_wrong_order)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::ParameterMismatch { position: 1, .. }
        ));

        let err = saga
            .add_step("reserve", reserve, release_with_string)
            .unwrap_err();
        assert!(
            err.to_string()
                .starts_with("parameter 2 not matched between forward and compensate")
        );
        assert!(saga.is_empty());
    }

    #[test]
    fn step_object_form_is_validated_too() {
        let mut saga = Saga::new("order");
        saga.add(Step::new("reserve", reserve, release).with_options(StepOptions::default()))
            .unwrap();
        assert!(
            saga.add(Step::new("again", reserve, release_wrong_order))
                .is_err()
        );
        assert_eq!(saga.len(), 1);
    }

    #[test]
    fn steps_keep_insertion_order() {
        let mut saga = Saga::new("order");
        for name in ["a", "b", "c"] {
            saga.add_step(name, reserve, release).unwrap();
        }
        let names: Vec<_> = saga.steps().iter().map(Step::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
