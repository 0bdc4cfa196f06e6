//! End-to-end demo of the saga engine.
//!
//! Moves money between two ledger accounts in three steps (debit the source,
//! credit the destination, issue a receipt). Any step can be made to fail
//! through [`DemoConfig`], in which case the completed steps are undone from
//! the execution log.

pub mod config;
pub mod error;
pub mod ledger;

use std::collections::BTreeMap;
use std::fmt;

use saga::{BoxError, ConfigurationError, ExecutionCoordinator, ExecutionId, Outcome, Saga};
use saga_log::{LogEntry, LogStore};

pub use config::DemoConfig;
pub use error::DemoError;
pub use ledger::{Ledger, LedgerError, Posting};

/// Everything a transfer step needs. Cloned for every call.
#[derive(Debug, Clone)]
pub struct TransferContext {
    pub ledger: Ledger,
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub fail_at: Option<String>,
    pub fail_compensation: bool,
}

impl TransferContext {
    fn injected_failure(&self, step: &str) -> Result<(), BoxError> {
        match self.fail_at.as_deref() {
            Some(target) if target == step => Err(format!("{step} failed on request").into()),
            _ => Ok(()),
        }
    }

    fn injected_compensation_failure(&self, step: &str) -> Result<(), BoxError> {
        if self.fail_compensation {
            return Err(format!("undoing {step} failed on request").into());
        }
        Ok(())
    }
}

async fn debit(ctx: TransferContext) -> Result<(Posting,), BoxError> {
    ctx.injected_failure("debit")?;
    let amount = ctx
        .amount
        .checked_neg()
        .ok_or_else(|| format!("cannot debit {} from {}", ctx.amount, ctx.from))?;
    let posting = ctx.ledger.post(&ctx.from, amount).await?;
    Ok((posting,))
}

async fn credit(ctx: TransferContext) -> Result<(Posting,), BoxError> {
    ctx.injected_failure("credit")?;
    let posting = ctx.ledger.post(&ctx.to, ctx.amount).await?;
    Ok((posting,))
}

async fn reverse_posting(ctx: TransferContext, (posting,): (Posting,)) -> Result<(), BoxError> {
    ctx.injected_compensation_failure(&posting.id)?;
    ctx.ledger.reverse(&posting).await?;
    Ok(())
}

async fn receipt(ctx: TransferContext) -> Result<(String, i64), BoxError> {
    ctx.injected_failure("receipt")?;
    let id = ctx.ledger.issue_receipt().await;
    Ok((id, ctx.amount))
}

async fn void_receipt(ctx: TransferContext, (id, _amount): (String, i64)) -> Result<(), BoxError> {
    ctx.injected_compensation_failure(&id)?;
    ctx.ledger.void_receipt(&id).await?;
    Ok(())
}

/// Builds the three-step transfer saga.
pub fn transfer_saga() -> Result<Saga<TransferContext>, ConfigurationError> {
    let mut saga = Saga::new("transfer");
    saga.add_step("debit", debit, reverse_posting)?;
    saga.add_step("credit", credit, reverse_posting)?;
    saga.add_step("receipt", receipt, void_receipt)?;
    Ok(saga)
}

/// What a demo run produced.
#[derive(Debug)]
pub struct DemoReport {
    pub execution_id: ExecutionId,
    pub outcome: Outcome,
    pub logs: Vec<LogEntry>,
    pub balances: BTreeMap<String, i64>,
}

/// Runs one transfer against `store` and reads its log back.
pub async fn run_transfer<S>(config: &DemoConfig, store: S) -> Result<DemoReport, DemoError>
where
    S: LogStore + Clone,
{
    let ledger = Ledger::with_balances([
        (config.from.clone(), config.opening_balance),
        (config.to.clone(), 0),
    ]);
    let ctx = TransferContext {
        ledger: ledger.clone(),
        from: config.from.clone(),
        to: config.to.clone(),
        amount: config.amount,
        fail_at: config.fail_at.clone(),
        fail_compensation: config.fail_compensation,
    };
    let saga = transfer_saga()?;

    let mut builder = ExecutionCoordinator::builder(ctx.clone(), &saga, store.clone())
        .compensate_context(ctx);
    if let Some(id) = &config.execution_id {
        builder = builder.execution_id(id.as_str());
    }
    let coordinator = builder.build();
    let execution_id = coordinator.execution_id().clone();

    tracing::info!(
        %execution_id,
        from = %config.from,
        to = %config.to,
        amount = config.amount,
        "starting transfer"
    );
    let outcome = coordinator.play().await?;
    let logs = store.get_all_logs_by_execution_id(&execution_id).await?;

    Ok(DemoReport {
        execution_id,
        outcome,
        logs,
        balances: ledger.balances().await,
    })
}

impl fmt::Display for DemoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "execution {}", self.execution_id)?;
        match &self.outcome.execution_error {
            None => writeln!(f, "  result: completed")?,
            Some(e) => writeln!(f, "  result: failed at '{}': {}", e.step_name, e)?,
        }
        for e in &self.outcome.compensate_errors {
            writeln!(f, "  compensation of '{}' failed: {}", e.step_name, e)?;
        }

        writeln!(f, "  log:")?;
        for entry in &self.logs {
            write!(f, "    {:<20}", entry.log_type.as_str())?;
            if let Some(index) = entry.step_index {
                write!(f, " #{index}")?;
            }
            if let Some(name) = &entry.step_name {
                write!(f, " {name}")?;
            }
            if let Some(error) = &entry.step_error {
                write!(f, " error={error}")?;
            }
            if let Some(payload) = &entry.step_payload {
                write!(f, " payload={payload}")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "  balances:")?;
        for (account, balance) in &self.balances {
            writeln!(f, "    {account}: {balance}")?;
        }
        Ok(())
    }
}
