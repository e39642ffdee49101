//! Error types for the ledger engine.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`AssetError`] - Fixed-precision arithmetic and parsing errors
//! - [`SourceError`] - Errors reported by a transfer source adapter
//! - [`EngineError`] - Top-level errors of one fetch-to-display cycle
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::time::Duration;

use thiserror::Error;

// =============================================================================
// Asset Errors
// =============================================================================

/// Fixed-precision arithmetic and parsing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    /// Two assets with different symbols were combined.
    ///
    /// Indicates an engine invariant violation, never a user error.
    #[error("Precision mismatch: cannot combine {left} with {right}")]
    PrecisionMismatch {
        /// Symbol of the left operand.
        left: String,
        /// Symbol of the right operand.
        right: String,
    },

    /// Asset text could not be parsed.
    #[error("Invalid asset '{0}'")]
    InvalidAsset(String),

    /// Decimal threshold could not be parsed or is negative.
    #[error("Invalid threshold '{0}'")]
    InvalidThreshold(String),
}

// =============================================================================
// Source Errors
// =============================================================================

/// Errors reported by a [`crate::ports::TransferSource`] implementation.
///
/// Transient variants are retried by the transfer stream; malformed
/// responses abort the fetch.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The upstream did not answer in time.
    #[error("Upstream timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or request failure (retryable).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The upstream answered with data that could not be decoded.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Whether the failed request may be retried with the same cursor.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Timeout(_) | SourceError::Transport(_))
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Timeout(_) => "timeout",
            SourceError::Transport(_) => "transport",
            SourceError::Malformed(_) => "malformed",
        }
    }
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Top-level errors of a fetch-to-display cycle.
///
/// This is the error type returned by [`crate::services::LedgerService`].
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// No account is selected; checked before any fetch begins.
    #[error("Must enter an account name first")]
    NoAccountSelected,

    /// A page or balance fetch timed out.
    ///
    /// Absorbed by the retry loop; only visible through [`EngineError::RetriesExhausted`].
    #[error("Upstream timeout")]
    UpstreamTimeout,

    /// The upstream returned an unparseable response.
    #[error("Malformed upstream response: {0}")]
    UpstreamMalformedResponse(String),

    /// The transport failed before any response was read.
    #[error("Upstream transport error: {0}")]
    UpstreamTransport(String),

    /// The retry budget for a single page was used up.
    #[error("Upstream failed {attempts} times, giving up: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made for the page.
        attempts: u32,
        /// Message of the last failure.
        last_error: String,
    },

    /// Arithmetic or parsing failure on fixed-precision values.
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

impl From<SourceError> for EngineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Timeout(_) => EngineError::UpstreamTimeout,
            SourceError::Transport(message) => EngineError::UpstreamTransport(message),
            SourceError::Malformed(message) => EngineError::UpstreamMalformedResponse(message),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: la chaîne de conversion d'erreurs fonctionne
    #[test]
    fn test_error_conversion_chain() {
        let asset_err = AssetError::PrecisionMismatch {
            left: "4,EOS".into(),
            right: "8,WAX".into(),
        };
        let engine_err: EngineError = asset_err.into();
        let msg = engine_err.to_string();
        assert!(msg.contains("4,EOS") && msg.contains("8,WAX"));

        let source_err = SourceError::Malformed("bad json".into());
        let engine_err: EngineError = source_err.into();
        assert!(matches!(engine_err, EngineError::UpstreamMalformedResponse(_)));
        assert!(engine_err.to_string().contains("bad json"));
    }

    // Seules les erreurs transitoires sont rejouées
    #[test]
    fn test_transient_classification() {
        assert!(SourceError::Timeout(Duration::from_secs(20)).is_transient());
        assert!(SourceError::Transport("reset".into()).is_transient());
        assert!(!SourceError::Malformed("x".into()).is_transient());
    }

    // Une erreur de transport ne prétend pas avoir épuisé les tentatives
    #[test]
    fn test_transport_error_keeps_its_kind() {
        let engine_err: EngineError = SourceError::Transport("connection reset".into()).into();
        assert!(matches!(engine_err, EngineError::UpstreamTransport(ref m) if m == "connection reset"));
        assert!(!matches!(engine_err, EngineError::RetriesExhausted { .. }));

        let engine_err: EngineError = SourceError::Timeout(Duration::from_secs(20)).into();
        assert!(matches!(engine_err, EngineError::UpstreamTimeout));
    }
}
