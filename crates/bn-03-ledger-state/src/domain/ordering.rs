//! # Dependency Ordering
//!
//! A batch fetched from a peer arrives in arbitrary order. Processing a
//! child before its parent would defer it needlessly, so the batch is
//! sorted depth-first with every in-batch ancestor ahead of its spenders.

use std::collections::HashMap;

use bitcoin::{Transaction, Txid};

/// Order `txs` so that in-batch parents precede their children.
///
/// Duplicates are dropped, keeping the first occurrence. Unrelated
/// transactions keep their relative input order.
pub fn dependency_order(txs: Vec<Transaction>) -> Vec<Transaction> {
    let ids: Vec<Txid> = txs.iter().map(Transaction::compute_txid).collect();
    let mut first: HashMap<Txid, usize> = HashMap::with_capacity(ids.len());
    for (position, id) in ids.iter().enumerate() {
        first.entry(*id).or_insert(position);
    }

    let mut seen = vec![false; txs.len()];
    let mut order = Vec::with_capacity(first.len());
    for root in 0..txs.len() {
        if seen[root] || first.get(&ids[root]) != Some(&root) {
            continue;
        }
        seen[root] = true;
        let mut stack = vec![(root, 0usize)];
        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            if cursor < txs[node].input.len() {
                top.1 += 1;
                let parent = txs[node].input[cursor].previous_output.txid;
                if let Some(&p) = first.get(&parent) {
                    if !seen[p] {
                        seen[p] = true;
                        stack.push((p, 0));
                    }
                }
            } else {
                order.push(node);
                stack.pop();
            }
        }
    }

    let mut slots: Vec<Option<Transaction>> = txs.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|position| slots[position].take())
        .collect()
}
