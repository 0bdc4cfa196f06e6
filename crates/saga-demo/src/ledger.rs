//! In-memory ledger the demo transfer saga operates on.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// A balance change recorded in the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub id: String,
    pub account: String,
    pub amount: i64,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient funds in {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: String,
        balance: i64,
        requested: u64,
    },

    #[error("posting {amount} to {account} would overflow its balance {balance}")]
    Overflow {
        account: String,
        balance: i64,
        amount: i64,
    },

    #[error("unknown posting {0}")]
    UnknownPosting(String),

    #[error("unknown receipt {0}")]
    UnknownReceipt(String),
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<String, i64>,
    postings: Vec<Posting>,
    receipts: Vec<String>,
    next_id: u64,
}

impl LedgerState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// Account balances, postings and issued receipts. Cloning shares the ledger.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    state: Arc<Mutex<LedgerState>>,
}

impl Ledger {
    /// Creates a ledger with the given opening balances.
    pub fn with_balances<I, K>(balances: I) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        let state = LedgerState {
            balances: balances.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ..LedgerState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Adds `amount` (negative for a debit) to `account`.
    pub async fn post(&self, account: &str, amount: i64) -> Result<Posting, LedgerError> {
        let mut state = self.state.lock().await;
        let balance = state.balances.get(account).copied().unwrap_or(0);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                account: account.to_string(),
                balance,
                amount,
            })?;
        if updated < 0 {
            return Err(LedgerError::InsufficientFunds {
                account: account.to_string(),
                balance,
                requested: amount.unsigned_abs(),
            });
        }

        let posting = Posting {
            id: state.next_id("p"),
            account: account.to_string(),
            amount,
        };
        state.balances.insert(account.to_string(), updated);
        state.postings.push(posting.clone());
        Ok(posting)
    }

    /// Undoes a posting.
    pub async fn reverse(&self, posting: &Posting) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        let position = state
            .postings
            .iter()
            .position(|p| p.id == posting.id)
            .ok_or_else(|| LedgerError::UnknownPosting(posting.id.clone()))?;

        let stored = &state.postings[position];
        let balance = state.balances.get(&stored.account).copied().unwrap_or(0);
        let updated = balance
            .checked_sub(stored.amount)
            .ok_or_else(|| LedgerError::Overflow {
                account: stored.account.clone(),
                balance,
                amount: stored.amount,
            })?;

        let removed = state.postings.remove(position);
        state.balances.insert(removed.account, updated);
        Ok(())
    }

    /// Issues a receipt for a transfer and returns its id.
    pub async fn issue_receipt(&self) -> String {
        let mut state = self.state.lock().await;
        let id = state.next_id("r");
        state.receipts.push(id.clone());
        id
    }

    /// Withdraws a previously issued receipt.
    pub async fn void_receipt(&self, id: &str) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        let before = state.receipts.len();
        state.receipts.retain(|r| r != id);
        if state.receipts.len() == before {
            return Err(LedgerError::UnknownReceipt(id.to_string()));
        }
        Ok(())
    }

    pub async fn balance(&self, account: &str) -> i64 {
        self.state
            .lock()
            .await
            .balances
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    /// All balances, sorted by account.
    pub async fn balances(&self) -> BTreeMap<String, i64> {
        self.state
            .lock()
            .await
            .balances
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub async fn receipt_count(&self) -> usize {
        self.state.lock().await.receipts.len()
    }
}
