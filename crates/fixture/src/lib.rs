//! Recorded transfer history adapter for ledgerscope.
//!
//! This crate implements the [`TransferSource`] port from `ledgerscope-core`
//! on top of a JSON file holding account balances and transfer actions. It
//! answers the same questions as the remote transfer index: the balance of
//! an account at the head block, and reverse-chronological pages of the
//! transfers touching that account.
//!
//! # Usage
//!
//! ```ignore
//! use ledgerscope_fixture::FixtureSource;
//!
//! let source = FixtureSource::load("data/alice.json").await?;
//! let snapshot = source.fetch_balance("alice").await?;
//! ```
//!
//! # File format
//!
//! ```json
//! {
//!   "head_block": 120,
//!   "symbol": { "precision": 4, "code": "EOS" },
//!   "account_balances": { "alice": "0.1000 EOS" },
//!   "actions": [
//!     { "block_num": 100, "timestamp": "2024-01-01T00:00:00Z", "trx_id": "A",
//!       "from": "bob", "to": "alice", "quantity": "0.0500 EOS",
//!       "global_sequence": 7, "receiver_sequence": 3 }
//!   ]
//! }
//! ```
//!
//! Page cursors are decimal offsets into the filtered action list.
//!
//! [`TransferSource`]: ledgerscope_core::ports::TransferSource

mod source;

pub use source::{FixtureSource, FixtureSourceConfig};
