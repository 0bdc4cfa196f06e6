//! Saga steps: a forward function paired with its compensation.

use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::error::{BoxError, PayloadError};
use crate::payload::{CompensateArgs, StepOutput};
use crate::signature::Signature;

/// Per-step configuration. Currently has no settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct StepOptions {}

/// What a forward call produced.
pub(crate) enum Invocation {
    /// The step succeeded; its outputs encoded as a JSON array.
    Succeeded(Value),
    /// The step returned an error, or its outputs could not be encoded.
    Failed(BoxError),
}

type ForwardFn<Ctx> = Box<dyn Fn(Ctx) -> BoxFuture<'static, Invocation> + Send + Sync>;

type CompensateFn<Ctx> = Box<
    dyn Fn(Ctx, &Value) -> Result<BoxFuture<'static, Result<(), BoxError>>, PayloadError>
        + Send
        + Sync,
>;

/// A named forward action and the compensation that undoes it.
///
/// The forward function receives the execution context and returns a tuple of
/// outputs (`()`, `(A,)`, `(A, B)`, ...) or an error. The compensation receives
/// the compensation context followed by those same outputs, rebuilt from the
/// log, and returns `Ok(())` or an error.
///
/// Constructing a step does not check that the two sides fit; that happens
/// when the step is added to a [`Saga`](crate::Saga).
pub struct Step<Ctx> {
    name: String,
    forward: ForwardFn<Ctx>,
    compensate: CompensateFn<Ctx>,
    output_signature: Signature,
    args_signature: Signature,
    options: StepOptions,
}

impl<Ctx> Step<Ctx>
where
    Ctx: Send + 'static,
{
    /// Creates a step from its forward function and compensation.
    pub fn new<F, FFut, O, C, CFut, A>(name: impl Into<String>, forward: F, compensate: C) -> Self
    where
        F: Fn(Ctx) -> FFut + Send + Sync + 'static,
        FFut: Future<Output = Result<O, BoxError>> + Send + 'static,
        O: StepOutput,
        C: Fn(Ctx, A) -> CFut + Send + Sync + 'static,
        CFut: Future<Output = Result<(), BoxError>> + Send + 'static,
        A: CompensateArgs,
    {
        let forward: ForwardFn<Ctx> = Box::new(move |ctx: Ctx| {
            let call = forward(ctx);
            async move {
                match call.await.map(|outputs| outputs.encode()) {
                    Ok(Ok(payload)) => Invocation::Succeeded(payload),
                    Ok(Err(error)) => Invocation::Failed(error.into()),
                    Err(error) => Invocation::Failed(error),
                }
            }
            .boxed()
        });

        let compensate: CompensateFn<Ctx> = Box::new(move |ctx: Ctx, payload: &Value| {
            let args = A::decode(payload)?;
            Ok(compensate(ctx, args).boxed())
        });

        Self {
            name: name.into(),
            forward,
            compensate,
            output_signature: O::signature(),
            args_signature: A::signature(),
            options: StepOptions::default(),
        }
    }

    /// Replaces the step's options.
    pub fn with_options(mut self, options: StepOptions) -> Self {
        self.options = options;
        self
    }
}

impl<Ctx> Step<Ctx> {
    /// The step's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The step's options.
    pub fn options(&self) -> &StepOptions {
        &self.options
    }

    /// Types the forward function returns, in order.
    pub fn output_signature(&self) -> &Signature {
        &self.output_signature
    }

    /// Types the compensation takes after its context, in order.
    pub fn args_signature(&self) -> &Signature {
        &self.args_signature
    }

    /// Runs the forward function and encodes its outputs.
    ///
    /// Outputs that cannot be encoded count as the step's failure; the side
    /// effects of the call are not undone.
    pub(crate) fn invoke_forward(&self, ctx: Ctx) -> BoxFuture<'static, Invocation> {
        (self.forward)(ctx)
    }

    /// Decodes `payload` into the compensation's arguments and starts the call.
    pub(crate) fn invoke_compensate(
        &self,
        ctx: Ctx,
        payload: &Value,
    ) -> Result<BoxFuture<'static, Result<(), BoxError>>, PayloadError> {
        (self.compensate)(ctx, payload)
    }
}

impl<Ctx> std::fmt::Debug for Step<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("output_signature", &self.output_signature)
            .field("args_signature", &self.args_signature)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
