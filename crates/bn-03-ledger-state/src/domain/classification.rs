//! Classification results.

use shared_types::TxInventory;

use super::errors::LedgerError;

/// Running value of a mint: outputs may create any amount.
pub const MINT_RUNNING_VALUE: i64 = i64::MAX;

/// Outcome of classifying one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Every badge input was resolved.
    Resolved(TxInventory),
    /// A badge input's source is not classified yet.
    Deferred {
        /// The unresolved ancestor.
        source_txid: String,
    },
}

/// Outcome of classifying and persisting one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Stored and marked `CLOSED`.
    Closed(TxInventory),
    /// Marked `OPEN`, waiting for `source_txid`.
    Open {
        /// The unresolved ancestor.
        source_txid: String,
    },
}

impl ProcessOutcome {
    /// The inventory if the transaction was closed.
    pub fn inventory(&self) -> Option<&TxInventory> {
        match self {
            ProcessOutcome::Closed(inventory) => Some(inventory),
            ProcessOutcome::Open { .. } => None,
        }
    }
}

/// Result of resolving a batch of transactions.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Per-transaction outcomes, in processing order.
    pub outcomes: Vec<(String, ProcessOutcome)>,
    /// Per-transaction failures.
    pub errors: Vec<(String, LedgerError)>,
}

impl BatchResult {
    /// Txids that ended `CLOSED`.
    pub fn closed_txids(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|(txid, outcome)| match outcome {
            ProcessOutcome::Closed(_) => Some(txid.as_str()),
            ProcessOutcome::Open { .. } => None,
        })
    }

    /// Outcome for `txid`, if it was processed.
    pub fn outcome(&self, txid: &str) -> Option<&ProcessOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == txid)
            .map(|(_, outcome)| outcome)
    }

    /// Failure for `txid`, if any.
    pub fn error(&self, txid: &str) -> Option<&LedgerError> {
        self.errors
            .iter()
            .find(|(id, _)| id == txid)
            .map(|(_, error)| error)
    }
}
