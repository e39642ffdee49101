//! Port trait for the transfer data source.
//!
//! This trait defines the interface for reading the current balance and
//! searching transfer actions of an account. Implementations live in the
//! infrastructure layer (e.g., `ledgerscope-fixture`).

use async_trait::async_trait;

use crate::error::SourceResult;
use crate::models::{Asset, RawTransferEvent};
use crate::ports::pagination::{Cursor, TransferQuery};

/// Balance of an account as seen at a given block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub balance: Asset,
    /// Block the balance was read at; transfer searches stop here.
    pub reference_block: u64,
}

/// One page of a transfer search.
#[derive(Debug, Clone, Default)]
pub struct TransferPage {
    /// Events in the order delivered by the upstream (newest first).
    pub events: Vec<RawTransferEvent>,
    /// Cursor of the next page; empty when the search is exhausted.
    pub cursor: String,
}

impl TransferPage {
    /// Cursor to continue from, `None` once exhausted.
    pub fn next_cursor(&self) -> Option<Cursor> {
        Cursor::next(&self.cursor)
    }
}

/// Port trait for the remote transfer index.
///
/// Implementations only perform single requests: timeouts, retries and
/// pagination are driven by [`crate::services::TransferStream`].
#[async_trait]
pub trait TransferSource: Send + Sync {
    /// Read the current balance of `account` and the block it was read at.
    async fn fetch_balance(&self, account: &str) -> SourceResult<BalanceSnapshot>;

    /// Fetch one page of transfers matching `query`, starting at `cursor`
    /// (`None` for the first page).
    async fn fetch_page(
        &self,
        query: &TransferQuery,
        cursor: Option<&Cursor>,
    ) -> SourceResult<TransferPage>;
}
