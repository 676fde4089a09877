//! # Ledger Service
//!
//! Classifies transactions, persists their points and drives the
//! `NEW -> OPEN | CLOSED` resolution state.

use std::collections::BTreeMap;
use std::sync::Arc;

use bitcoin::Transaction;
use bn_01_script_codec::{decode, is_badge_input};
use shared_types::{Network, PointKind, TxInventory, TxPoint, TxState};
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::domain::{
    dependency_order, BatchResult, Classification, LedgerError, ProcessOutcome,
    MINT_RUNNING_VALUE,
};
use crate::ports::{TxInfoRepository, TxPointRepository};

/// Ledger state machine over the point and record repositories.
pub struct LedgerService {
    config: LedgerConfig,
    txs: Arc<dyn TxInfoRepository>,
    points: Arc<dyn TxPointRepository>,
}

impl LedgerService {
    /// Create a service.
    pub fn new(
        config: LedgerConfig,
        txs: Arc<dyn TxInfoRepository>,
        points: Arc<dyn TxPointRepository>,
    ) -> Self {
        Self {
            config,
            txs,
            points,
        }
    }

    /// Network used for output addresses.
    pub fn network(&self) -> Network {
        self.config.network
    }

    /// Derive the inventory of `tx` without writing anything.
    pub fn classify(&self, tx: &Transaction, timestamp: i64) -> Result<Classification, LedgerError> {
        let txid = tx.compute_txid().to_string();

        let mut vins = Vec::new();
        let mut totals: BTreeMap<String, i64> = BTreeMap::new();
        for (index, input) in tx.input.iter().enumerate() {
            if !is_badge_input(input.script_sig.as_bytes()) {
                continue;
            }
            let prev_txid = input.previous_output.txid.to_string();
            let prev_index = input.previous_output.vout as i32;

            let Some(spent) = self.points.point(&prev_txid, prev_index, PointKind::Vout)? else {
                return match self.txs.brief_info(&prev_txid)? {
                    Some(source) if source.is_closed() => Err(LedgerError::UnknownUtxo {
                        txid,
                        prev_txid,
                        prev_index,
                    }),
                    _ => Ok(Classification::Deferred {
                        source_txid: prev_txid,
                    }),
                };
            };

            let total = totals.entry(spent.badge_code.clone()).or_insert(0);
            *total = total
                .checked_add(spent.value)
                .ok_or_else(|| LedgerError::ValueOverflow { txid: txid.clone() })?;
            vins.push(TxPoint::vin(&txid, index as i32, &spent, timestamp));
        }

        if totals.len() > 1 {
            debug!("[bn-03] {} mixes {} badge codes, ignored", txid, totals.len());
            return Ok(Classification::Resolved(TxInventory::empty(txid)));
        }
        let (badge_code, mut remaining) = totals
            .into_iter()
            .next()
            .unwrap_or_else(|| (txid.clone(), MINT_RUNNING_VALUE));

        let mut vouts = Vec::new();
        for (index, output) in tx.output.iter().enumerate() {
            let Ok(badge) = decode(output.script_pubkey.as_bytes(), self.config.network) else {
                continue;
            };
            if badge.amount > remaining {
                warn!(
                    "[bn-03] {} outputs exceed inputs at vout {}, value burned",
                    txid, index
                );
                vouts.clear();
                break;
            }
            remaining -= badge.amount;
            vouts.push(TxPoint::vout(
                &txid,
                index as i32,
                badge.address.to_string(),
                badge.amount,
                &badge_code,
                timestamp,
            ));
        }

        vins.extend(vouts);
        Ok(Classification::Resolved(TxInventory { txid, points: vins }))
    }

    /// Insert every point of `inventory`; already-present points are skipped.
    pub fn persist_inventory(&self, inventory: &TxInventory) -> Result<(), LedgerError> {
        for point in &inventory.points {
            match self.points.insert_point(point) {
                Ok(()) => {}
                Err(e) if e.is_duplicate() => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Classify, persist and record the resulting state of a stored tx.
    ///
    /// On error the stored state is left as it was.
    pub fn process(&self, tx: &Transaction, timestamp: i64) -> Result<ProcessOutcome, LedgerError> {
        let txid = tx.compute_txid().to_string();
        match self.classify(tx, timestamp)? {
            Classification::Resolved(inventory) => {
                self.persist_inventory(&inventory)?;
                self.txs.set_state(&txid, TxState::Closed)?;
                Ok(ProcessOutcome::Closed(inventory))
            }
            Classification::Deferred { source_txid } => {
                debug!("[bn-03] {} waits for {}", txid, source_txid);
                self.txs.set_state(&txid, TxState::Open)?;
                Ok(ProcessOutcome::Open { source_txid })
            }
        }
    }

    /// Process a batch in dependency order, collecting per-tx failures.
    pub fn resolve_batch(&self, txs: Vec<Transaction>, timestamp: i64) -> BatchResult {
        let mut result = BatchResult::default();
        for tx in dependency_order(txs) {
            let txid = tx.compute_txid().to_string();
            match self.process(&tx, timestamp) {
                Ok(outcome) => result.outcomes.push((txid, outcome)),
                Err(e) => {
                    warn!("[bn-03] classification of {} failed: {}", txid, e);
                    result.errors.push((txid, e));
                }
            }
        }
        result
    }
}
