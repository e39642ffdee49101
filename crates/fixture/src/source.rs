//! JSON-backed transfer source.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use ledgerscope_core::error::{SourceError, SourceResult};
use ledgerscope_core::models::{Asset, RawTransferEvent, SequenceNumbers, Symbol};
use ledgerscope_core::ports::{
    BalanceSnapshot, Cursor, OrderDirection, TransferPage, TransferQuery, TransferSource,
};

/// Configuration for the fixture source.
#[derive(Debug, Clone)]
pub struct FixtureSourceConfig {
    /// Path of the recorded history.
    pub path: PathBuf,
    /// Artificial delay added to every request.
    pub latency: Duration,
}

impl Default for FixtureSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/history.json"),
            latency: Duration::ZERO,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    head_block: u64,
    symbol: Symbol,
    #[serde(default)]
    account_balances: HashMap<String, String>,
    #[serde(default)]
    actions: Vec<FixtureAction>,
}

#[derive(Debug, Deserialize)]
struct FixtureAction {
    block_num: u64,
    timestamp: DateTime<Utc>,
    trx_id: String,
    #[serde(default = "default_contract")]
    contract: String,
    #[serde(default = "default_action")]
    action: String,
    from: String,
    to: String,
    quantity: String,
    #[serde(default)]
    global_sequence: u64,
    #[serde(default)]
    receiver_sequence: u64,
}

fn default_contract() -> String {
    "eosio.token".to_string()
}

fn default_action() -> String {
    "transfer".to_string()
}

impl FixtureAction {
    fn matches(&self, query: &TransferQuery) -> bool {
        (self.from == query.account || self.to == query.account)
            && self.contract == query.contract
            && self.action == query.action
            && query.to_block.is_none_or(|to| self.block_num <= to)
    }

    fn to_event(&self) -> SourceResult<RawTransferEvent> {
        let quantity: Asset = self.quantity.parse().map_err(|e| {
            SourceError::Malformed(format!("action in trx {}: {}", self.trx_id, e))
        })?;

        Ok(RawTransferEvent {
            block_number: self.block_num,
            timestamp: self.timestamp,
            transaction_id: self.trx_id.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            quantity,
            sequence: SequenceNumbers {
                global: self.global_sequence,
                receive: self.receiver_sequence,
            },
        })
    }
}

/// Transfer source adapter replaying a recorded history.
pub struct FixtureSource {
    file: FixtureFile,
    latency: Duration,
}

impl FixtureSource {
    /// Read and parse the history file.
    #[instrument(skip_all, fields(path = %config.path.display()))]
    pub async fn load(config: FixtureSourceConfig) -> SourceResult<Self> {
        debug!("Loading transfer history");

        let raw = tokio::fs::read_to_string(&config.path)
            .await
            .map_err(|e| SourceError::Transport(format!("{}: {}", config.path.display(), e)))?;
        let source = Self::from_json(&raw)?.with_latency(config.latency);

        debug!(
            actions = source.file.actions.len(),
            head_block = source.file.head_block,
            "Transfer history loaded"
        );
        Ok(source)
    }

    /// Parse a history from its JSON text.
    pub fn from_json(raw: &str) -> SourceResult<Self> {
        let file: FixtureFile =
            serde_json::from_str(raw).map_err(|e| SourceError::Malformed(e.to_string()))?;
        Ok(Self {
            file,
            latency: Duration::ZERO,
        })
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl TransferSource for FixtureSource {
    async fn fetch_balance(&self, account: &str) -> SourceResult<BalanceSnapshot> {
        self.simulate_latency().await;

        let balance = match self.file.account_balances.get(account) {
            Some(text) => text
                .parse::<Asset>()
                .map_err(|e| SourceError::Malformed(format!("balance of {account}: {e}")))?,
            // No balance row means the account never held the token
            None => Asset::zero(self.file.symbol.clone()),
        };

        Ok(BalanceSnapshot {
            balance,
            reference_block: self.file.head_block,
        })
    }

    async fn fetch_page(
        &self,
        query: &TransferQuery,
        cursor: Option<&Cursor>,
    ) -> SourceResult<TransferPage> {
        self.simulate_latency().await;

        let offset = match cursor {
            Some(cursor) => cursor
                .value
                .parse::<usize>()
                .map_err(|_| SourceError::Malformed(format!("invalid cursor '{cursor}'")))?,
            None => 0,
        };

        let mut matching: Vec<&FixtureAction> =
            self.file.actions.iter().filter(|a| a.matches(query)).collect();
        match query.order {
            OrderDirection::Desc => matching.sort_by(|a, b| b.block_num.cmp(&a.block_num)),
            OrderDirection::Asc => matching.sort_by(|a, b| a.block_num.cmp(&b.block_num)),
        }

        let limit = query.limit.max(1) as usize;
        let end = offset.saturating_add(limit).min(matching.len());
        let events = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|a| a.to_event())
            .collect::<SourceResult<Vec<_>>>()?;

        let cursor = if end < matching.len() {
            end.to_string()
        } else {
            String::new()
        };

        trace!(
            search = %query.search_string(),
            offset,
            events = events.len(),
            next = %cursor,
            "Fixture page served"
        );

        Ok(TransferPage { events, cursor })
    }
}
