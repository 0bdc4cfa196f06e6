//! Execution coordinator: drives one run of a saga against a log store.

use std::collections::HashSet;
use std::time::Instant;

use common::{ExecutionId, IdGenerator, UuidGenerator};
use saga_log::{LogEntry, LogStore, LogStoreError, LogStoreExt, LogType};
use serde_json::Value;

use crate::error::{BoxError, Result, SagaError, StepFailure};
use crate::outcome::Outcome;
use crate::saga::Saga;
use crate::state::CoordinatorState;
use crate::step::{Invocation, Step};

const INTERRUPTED: &str = "execution interrupted before step completed";

/// Drives a single execution of a [`Saga`].
///
/// Every action the coordinator takes is preceded by a durable log entry:
/// `StartSaga`, one `SagaStepExec` per attempted step, `SagaAbort` and one
/// `SagaStepCompensate` per compensation on failure, and always `SagaComplete`
/// at the end. If the store rejects an append the run stops immediately with
/// [`SagaError::Store`] instead of acting on unlogged state.
///
/// Steps run with the execution context; compensations run with the
/// compensation context, which may differ (for example, one that is still
/// usable after the execution context was cancelled).
pub struct ExecutionCoordinator<'a, Ctx, S> {
    execution_id: ExecutionId,
    saga: &'a Saga<Ctx>,
    store: S,
    exec_ctx: Ctx,
    compensate_ctx: Ctx,
    state: CoordinatorState,
    aborted: bool,
    execution_error: Option<StepFailure>,
    compensate_errors: Vec<StepFailure>,
}

impl<'a, Ctx, S> ExecutionCoordinator<'a, Ctx, S>
where
    Ctx: Clone + Send + Sync + 'static,
    S: LogStore,
{
    /// Creates a coordinator with a fresh random execution id.
    pub fn new(exec_ctx: Ctx, compensate_ctx: Ctx, saga: &'a Saga<Ctx>, store: S) -> Self {
        Self::builder(exec_ctx, saga, store)
            .compensate_context(compensate_ctx)
            .build()
    }

    /// Starts building a coordinator.
    pub fn builder(exec_ctx: Ctx, saga: &'a Saga<Ctx>, store: S) -> CoordinatorBuilder<'a, Ctx, S> {
        CoordinatorBuilder {
            saga,
            store,
            exec_ctx,
            compensate_ctx: None,
            execution_id: None,
            id_generator: None,
        }
    }

    /// The id correlating this run's log entries.
    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    /// The current lifecycle state.
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Runs the saga to completion.
    ///
    /// Returns the run's [`Outcome`] once `SagaComplete` has been logged, or a
    /// [`SagaError`] if the run had to stop before that.
    #[tracing::instrument(
        skip(self),
        fields(execution_id = %self.execution_id, saga = %self.saga.name())
    )]
    pub async fn play(mut self) -> Result<Outcome> {
        metrics::counter!("saga_executions_total").increment(1);
        let started = Instant::now();

        self.transition(CoordinatorState::Running)?;
        self.append(LogEntry::start_saga(&self.execution_id, self.saga.name()))
            .await?;

        let saga = self.saga;
        for (index, step) in saga.steps().iter().enumerate() {
            if self.aborted {
                break;
            }
            self.exec_step(index, step).await?;
        }

        self.finish(started).await
    }

    /// Finishes a run that was interrupted, using only its log.
    ///
    /// No forward step is executed again. If every step had already
    /// succeeded, only `SagaComplete` is logged. Otherwise the run is aborted
    /// (unless its log already shows the abort) and every successful step
    /// without a `SagaStepCompensate` entry is compensated from its logged
    /// payload, most recent first.
    ///
    /// Build the coordinator with the interrupted run's
    /// [`execution_id`](CoordinatorBuilder::execution_id).
    #[tracing::instrument(
        skip(self),
        fields(execution_id = %self.execution_id, saga = %self.saga.name())
    )]
    pub async fn recover(mut self) -> Result<Outcome> {
        let started = Instant::now();

        let logs = self
            .store
            .get_all_logs_by_execution_id(&self.execution_id)
            .await
            .map_err(|e| self.store_error("load execution log", e))?;
        let Some(first) = logs.first() else {
            return Err(SagaError::ExecutionNotFound(self.execution_id.clone()));
        };
        if first.saga_name != self.saga.name() {
            return Err(SagaError::CorruptLog {
                execution_id: self.execution_id.clone(),
                reason: format!("log belongs to saga '{}'", first.saga_name),
            });
        }
        if self
            .store
            .is_complete(&self.execution_id)
            .await
            .map_err(|e| self.store_error("check completion", e))?
        {
            return Err(SagaError::AlreadyCompleted(self.execution_id.clone()));
        }

        let failed = logs
            .iter()
            .find(|e| e.log_type == LogType::SagaStepExec && e.step_error.is_some());
        let abort_logged = logs.iter().any(|e| e.log_type == LogType::SagaAbort);
        let succeeded = logs.iter().filter(|e| e.is_compensable()).count();

        if failed.is_none() && !abort_logged && succeeded == self.saga.len() {
            tracing::info!("all steps were logged as succeeded, completing run");
            self.transition(CoordinatorState::Running)?;
            return self.finish(started).await;
        }

        self.execution_error = Some(match failed {
            Some(entry) => {
                let (index, step) = self.resolve_step(entry)?;
                let message = entry.step_error.clone().unwrap_or_default();
                StepFailure::new(index, step.name(), BoxError::from(message))
            }
            None => {
                let name = self.saga.step(succeeded).map(Step::name).unwrap_or_default();
                StepFailure::new(succeeded, name, BoxError::from(INTERRUPTED))
            }
        });
        tracing::warn!(
            abort_logged,
            succeeded,
            error = ?self.execution_error.as_ref().map(StepFailure::message),
            "recovering interrupted run"
        );

        self.transition(CoordinatorState::Aborting)?;
        let done = self
            .store
            .compensated_step_indices(&self.execution_id)
            .await
            .map_err(|e| self.store_error("load compensated steps", e))?;
        let pending = self.pending_compensations(&done).await?;

        if !abort_logged && !pending.is_empty() {
            self.log_abort(pending.len()).await?;
        }
        self.aborted = true;
        self.compensate_all(pending).await?;

        self.finish(started).await
    }

    async fn exec_step(&mut self, index: usize, step: &'a Step<Ctx>) -> Result<()> {
        tracing::info!(step = step.name(), index, "executing step");
        let started = Instant::now();
        let invocation = step.invoke_forward(self.exec_ctx.clone()).await;
        let duration = started.elapsed();
        metrics::histogram!("saga_step_duration_seconds", "step" => step.name().to_string())
            .record(duration.as_secs_f64());

        match invocation {
            Invocation::Succeeded(payload) => {
                self.append(LogEntry::step_succeeded(
                    &self.execution_id,
                    self.saga.name(),
                    index,
                    step.name(),
                    payload,
                    duration,
                ))
                .await?;
                tracing::info!(step = step.name(), index, ?duration, "step completed");
                Ok(())
            }
            Invocation::Failed(error) => {
                let message = error.to_string();
                tracing::warn!(step = step.name(), index, error = %message, "step failed");
                self.append(LogEntry::step_failed(
                    &self.execution_id,
                    self.saga.name(),
                    index,
                    step.name(),
                    message,
                    duration,
                ))
                .await?;
                self.execution_error = Some(StepFailure::new(index, step.name(), error));
                self.abort().await
            }
        }
    }

    async fn abort(&mut self) -> Result<()> {
        self.transition(CoordinatorState::Aborting)?;
        let pending = self.pending_compensations(&HashSet::new()).await?;
        if !pending.is_empty() {
            self.log_abort(pending.len()).await?;
        }
        self.aborted = true;
        self.compensate_all(pending).await
    }

    async fn log_abort(&mut self, to_compensate: usize) -> Result<()> {
        self.append(LogEntry::saga_abort(
            &self.execution_id,
            self.saga.name(),
            to_compensate,
        ))
        .await?;
        metrics::counter!("saga_aborted").increment(1);
        tracing::warn!(to_compensate, "saga aborted");
        Ok(())
    }

    /// Successful steps not in `done`, most recent first.
    async fn pending_compensations(&self, done: &HashSet<usize>) -> Result<Vec<LogEntry>> {
        let entries = self
            .store
            .get_step_logs_to_compensate(&self.execution_id)
            .await
            .map_err(|e| self.store_error("load steps to compensate", e))?;

        Ok(entries
            .into_iter()
            .filter(|e| e.step_index.is_none_or(|i| !done.contains(&i)))
            .collect())
    }

    async fn compensate_all(&mut self, entries: Vec<LogEntry>) -> Result<()> {
        self.transition(CoordinatorState::Compensating)?;
        for entry in entries {
            self.compensate_step(entry).await?;
        }
        Ok(())
    }

    async fn compensate_step(&mut self, entry: LogEntry) -> Result<()> {
        let (index, step) = self.resolve_step(&entry)?;
        self.append(LogEntry::step_compensate(
            &self.execution_id,
            self.saga.name(),
            index,
            step.name(),
        ))
        .await?;
        metrics::counter!("saga_compensations_total").increment(1);
        tracing::info!(step = step.name(), index, "compensating step");

        let payload = entry.step_payload.unwrap_or(Value::Null);
        let result = match step.invoke_compensate(self.compensate_ctx.clone(), &payload) {
            Ok(call) => call.await,
            Err(e) => Err(BoxError::from(e)),
        };

        if let Err(error) = result {
            tracing::warn!(step = step.name(), index, %error, "compensation failed");
            metrics::counter!("saga_compensation_failures_total").increment(1);
            self.compensate_errors
                .push(StepFailure::new(index, step.name(), error));
        }
        Ok(())
    }

    /// Maps a step entry back to the step the saga defines at its position.
    fn resolve_step(&self, entry: &LogEntry) -> Result<(usize, &'a Step<Ctx>)> {
        let index = entry.step_index.ok_or_else(|| SagaError::CorruptLog {
            execution_id: self.execution_id.clone(),
            reason: format!("{} entry without a step index", entry.log_type),
        })?;

        let saga = self.saga;
        let step = saga.step(index).ok_or_else(|| SagaError::UnknownStep {
            execution_id: self.execution_id.clone(),
            index,
        })?;

        match entry.step_name.as_deref() {
            Some(logged) if logged != step.name() => Err(SagaError::StepMismatch {
                execution_id: self.execution_id.clone(),
                index,
                logged: logged.to_string(),
                defined: step.name().to_string(),
            }),
            _ => Ok((index, step)),
        }
    }

    async fn finish(mut self, started: Instant) -> Result<Outcome> {
        self.append(LogEntry::saga_complete(&self.execution_id, self.saga.name()))
            .await?;
        self.transition(CoordinatorState::Completed)?;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);

        let outcome = Outcome {
            execution_error: self.execution_error.take(),
            compensate_errors: std::mem::take(&mut self.compensate_errors),
        };
        if outcome.is_success() {
            metrics::counter!("saga_completed").increment(1);
            tracing::info!(duration, "saga completed successfully");
        } else {
            tracing::warn!(
                duration,
                compensate_errors = outcome.compensate_errors.len(),
                "saga completed after compensation"
            );
        }
        Ok(outcome)
    }

    async fn append(&self, entry: LogEntry) -> Result<()> {
        let log_type = entry.log_type;
        self.store
            .append_log(entry)
            .await
            .map_err(|e| self.store_error(log_type.as_str(), e))
    }

    fn store_error(&self, operation: &str, error: LogStoreError) -> SagaError {
        tracing::error!(operation, %error, state = %self.state, "log store failed, halting run");
        SagaError::Store(error)
    }

    fn transition(&mut self, to: CoordinatorState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            tracing::error!(from = %self.state, to = %to, "rejected coordinator state change");
            return Err(SagaError::InvalidTransition {
                execution_id: self.execution_id.clone(),
                from: self.state,
                to,
            });
        }
        tracing::debug!(from = %self.state, to = %to, "coordinator state change");
        self.state = to;
        Ok(())
    }
}

/// Builder for [`ExecutionCoordinator`].
pub struct CoordinatorBuilder<'a, Ctx, S> {
    saga: &'a Saga<Ctx>,
    store: S,
    exec_ctx: Ctx,
    compensate_ctx: Option<Ctx>,
    execution_id: Option<ExecutionId>,
    id_generator: Option<&'a dyn IdGenerator>,
}

impl<'a, Ctx, S> CoordinatorBuilder<'a, Ctx, S>
where
    Ctx: Clone + Send + Sync + 'static,
    S: LogStore,
{
    /// Context for compensations. Defaults to a clone of the execution context.
    pub fn compensate_context(mut self, ctx: Ctx) -> Self {
        self.compensate_ctx = Some(ctx);
        self
    }

    /// Uses a fixed execution id. Takes precedence over
    /// [`id_generator`](Self::id_generator).
    pub fn execution_id(mut self, id: impl Into<ExecutionId>) -> Self {
        self.execution_id = Some(id.into());
        self
    }

    /// Draws the execution id from `generator`.
    pub fn id_generator(mut self, generator: &'a dyn IdGenerator) -> Self {
        self.id_generator = Some(generator);
        self
    }

    /// Builds the coordinator.
    pub fn build(self) -> ExecutionCoordinator<'a, Ctx, S> {
        let execution_id = match (self.execution_id, self.id_generator) {
            (Some(id), _) => id,
            (None, Some(generator)) => generator.next_id(),
            (None, None) => UuidGenerator.next_id(),
        };
        let compensate_ctx = self
            .compensate_ctx
            .unwrap_or_else(|| self.exec_ctx.clone());

        ExecutionCoordinator {
            execution_id,
            saga: self.saga,
            store: self.store,
            exec_ctx: self.exec_ctx,
            compensate_ctx,
            state: CoordinatorState::NotStarted,
            aborted: false,
            execution_error: None,
            compensate_errors: Vec::new(),
        }
    }
}
