//! Domain models for transfer history.
//!
//! These models are source-agnostic and represent the canonical
//! form of transfer data within the domain layer.

mod asset;

pub use asset::{Asset, Symbol};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Raw Events
// =============================================================================

/// Ordering numbers assigned by the chain to an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceNumbers {
    /// Chain-wide action sequence.
    pub global: u64,
    /// Sequence within the receiving account.
    pub receive: u64,
}

/// A single token transfer action as delivered by the source.
///
/// Immutable once observed. Several events may share one transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransferEvent {
    /// Block containing the action.
    pub block_number: u64,
    /// Block timestamp.
    pub timestamp: DateTime<Utc>,
    /// Id of the enclosing transaction.
    pub transaction_id: String,
    /// Sender account.
    pub from: String,
    /// Recipient account.
    pub to: String,
    /// Transferred quantity (always non-negative upstream).
    pub quantity: Asset,
    pub sequence: SequenceNumbers,
}

impl RawTransferEvent {
    /// Whether the action credits `account`.
    pub fn is_incoming(&self, account: &str) -> bool {
        self.to == account
    }

    /// The party on the other side of the action, seen from `account`.
    pub fn other_party(&self, account: &str) -> &str {
        if self.is_incoming(account) {
            &self.from
        } else {
            &self.to
        }
    }
}

// =============================================================================
// Grouped Transfers
// =============================================================================

/// Net effect of one transaction on the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedTransfer {
    /// Transaction id (unique within a ledger).
    pub transaction_id: String,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    /// Signed net change caused by the transaction.
    pub delta_quantity: Asset,
    /// Account balance right after the transaction.
    pub balance_after: Asset,
    /// Other party of the largest single leg.
    pub counterparty: String,
    /// Relative importance of `delta_quantity` within its sign group.
    pub impact_bucket: usize,
}

impl GroupedTransfer {
    /// Whether the transaction increased the balance (zero counts as incoming).
    pub fn is_incoming(&self) -> bool {
        !self.delta_quantity.is_negative()
    }
}

// =============================================================================
// Derived Views
// =============================================================================

/// Value handed to the impact bucketer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramInput {
    /// Position of the transfer in the filtered list.
    pub index: usize,
    pub value: f64,
}

/// One point of the balance chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    /// Balance in whole token units.
    pub balance: f64,
}
