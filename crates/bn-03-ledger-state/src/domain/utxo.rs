//! UTXO netting over a set of points.

use std::collections::HashSet;

use shared_types::{PointKind, TxPoint};

/// VOUT points not consumed by any VIN in `points`.
///
/// Pure; the caller chooses the scope (address, badge code, state).
pub fn compute_utxos(points: &[TxPoint]) -> Vec<TxPoint> {
    let spent: HashSet<(&str, i32)> = points
        .iter()
        .filter(|p| p.kind == PointKind::Vin)
        .map(|p| (p.pre_txid.as_str(), p.pre_index))
        .collect();
    points
        .iter()
        .filter(|p| p.kind == PointKind::Vout && !spent.contains(&(p.txid.as_str(), p.index)))
        .cloned()
        .collect()
}

/// Sum of point values, saturating.
pub fn total_value(points: &[TxPoint]) -> i64 {
    points.iter().fold(0i64, |acc, p| acc.saturating_add(p.value))
}
