//! Minimum-balance filter.

use std::cmp::Ordering;

use crate::error::AssetResult;
use crate::models::{Asset, GroupedTransfer};

/// Drop transactions whose absolute delta is below `threshold`.
///
/// The newest transaction (index 0) is always kept so the displayed trail
/// still ends at the current balance. Balances of kept entries are left as
/// reconstructed; dropped transactions simply leave gaps.
pub fn filter_min_balance(
    transfers: Vec<GroupedTransfer>,
    threshold: &Asset,
) -> AssetResult<Vec<GroupedTransfer>> {
    let mut kept = Vec::with_capacity(transfers.len());

    for (index, transfer) in transfers.into_iter().enumerate() {
        let significant = transfer.delta_quantity.abs().try_cmp(threshold)? != Ordering::Less;
        if index == 0 || significant {
            kept.push(transfer);
        }
    }

    Ok(kept)
}
