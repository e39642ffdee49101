//! Transaction grouping and backward balance reconstruction.

use std::collections::{HashMap, HashSet};

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tracing::{trace, warn};

use crate::error::AssetResult;
use crate::models::{Asset, GroupedTransfer, RawTransferEvent};

/// Group raw events per transaction and rebuild the balance after each one.
///
/// Events are stable-sorted newest block first, then grouped by transaction
/// id in order of first appearance. The newest group ends at
/// `current_balance`; every older group ends at the newer group's balance
/// minus the newer group's delta.
///
/// Exact duplicates (same transaction id and non-zero global sequence, as
/// produced by overlapping pages) are counted once. Every quantity must use
/// the symbol of `current_balance`.
pub fn group_transfers(
    account: &str,
    events: &[RawTransferEvent],
    current_balance: &Asset,
) -> AssetResult<Vec<GroupedTransfer>> {
    let mut sorted: Vec<&RawTransferEvent> = Vec::with_capacity(events.len());
    let mut seen = HashSet::new();
    for event in events {
        let global = event.sequence.global;
        if global != 0 && !seen.insert((event.transaction_id.as_str(), global)) {
            trace!(trx = %event.transaction_id, global, "Duplicate event dropped");
            continue;
        }
        sorted.push(event);
    }
    sorted.sort_by(|a, b| b.block_number.cmp(&a.block_number));

    let mut groups: Vec<Vec<&RawTransferEvent>> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for event in sorted {
        let slot = *positions
            .entry(event.transaction_id.as_str())
            .or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
        groups[slot].push(event);
    }

    let symbol = &current_balance.symbol;
    let mut running = current_balance.clone();
    let mut transfers = Vec::with_capacity(groups.len());

    for legs in groups {
        let first = legs[0];
        let mut delta = Asset::zero(symbol.clone());
        let mut counterparty = String::new();
        let mut largest_leg = BigInt::zero();

        for leg in &legs {
            delta = if leg.is_incoming(account) {
                delta.try_add(&leg.quantity)?
            } else {
                delta.try_sub(&leg.quantity)?
            };

            let magnitude = leg.quantity.amount.abs();
            if magnitude > largest_leg {
                largest_leg = magnitude;
                counterparty = leg.other_party(account).to_string();
            }
        }

        let balance_after = running.clone();
        running = running.try_sub(&delta)?;

        transfers.push(GroupedTransfer {
            transaction_id: first.transaction_id.clone(),
            block_number: first.block_number,
            timestamp: first.timestamp,
            delta_quantity: delta,
            balance_after,
            counterparty,
            impact_bucket: 0,
        });
    }

    if running.is_negative() {
        warn!(
            balance_before_oldest = %running,
            transactions = transfers.len(),
            "⚠️  Reconstructed balance went negative, history is probably incomplete"
        );
    }

    Ok(transfers)
}
