//! Core domain layer for the ledgerscope engine.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! services that turn a paginated stream of token transfers into a
//! reconstructed balance history. It follows hexagonal architecture
//! principles - this is the innermost layer with no dependencies on
//! infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   ledgerscope (binary)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  ledgerscope-fixture                        │
//! │              (recorded transfer history)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  ledgerscope-core  ← YOU ARE HERE           │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (Asset, RawTransferEvent, GroupedTransfer)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Engine logic (LedgerService and its pipeline stages)
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Ports
//!
//! - [`ports::TransferSource`] - Read a balance and search transfer pages
//!
//! ## Ledger Lifecycle
//!
//! 1. Read the current balance and the block it was read at
//! 2. Stream transfer pages backward from that block, retrying failures
//! 3. Group events per transaction and walk the balance backward
//! 4. Drop transactions below the minimum-balance filter
//! 5. Rank survivors into impact buckets and derive chart data

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
