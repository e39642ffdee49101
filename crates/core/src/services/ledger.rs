//! Ledger service - runs one fetch-to-display cycle per account.
//!
//! The service owns the only mutable state of the engine: the last
//! committed [`LedgerState`], the minimum-balance filter, and the
//! cancellation handle of the fetch in progress. Everything shown to the
//! user is a [`LedgerView`] derived from that state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::error::{EngineError, EngineResult};
use crate::metrics::{FetchTimer, record_transfers_grouped};
use crate::models::{Asset, RawTransferEvent};
use crate::ports::{BalanceSnapshot, TransferQuery, TransferSource};
use crate::services::cancel::FetchControl;
use crate::services::filter::filter_min_balance;
use crate::services::grouping::group_transfers;
use crate::services::histogram::{NUM_BUCKETS, assign_impact_buckets};
use crate::services::stream::{RetryPolicy, TransferStream};
use crate::services::view::{LedgerView, NUM_TICKS, axis_ticks, chart_points, chart_range};

/// Filter applied until the user picks another one.
pub const DEFAULT_MIN_BALANCE: &str = "0.01";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the ledger service.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Events requested per page.
    pub page_size: u32,
    /// Upper bound for one upstream request.
    pub page_timeout: Duration,
    /// Retries allowed per request after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub retry_delay: Duration,
    /// Cap for the doubling retry delay.
    pub max_retry_delay: Duration,
    pub num_buckets: usize,
    /// Axis intervals; `tick_count + 1` ticks are produced.
    pub tick_count: usize,
    /// Token contract whose transfers are searched.
    pub contract: String,
    pub action: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            page_timeout: Duration::from_secs(20),
            max_retries: 5,
            retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(30),
            num_buckets: NUM_BUCKETS,
            tick_count: NUM_TICKS,
            contract: "eosio.token".to_string(),
            action: "transfer".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: self.page_timeout,
            max_retries: self.max_retries,
            initial_delay: self.retry_delay,
            max_delay: self.max_retry_delay,
        }
    }

    /// Transfer search for `account`, bounded by the balance block.
    pub fn query(&self, account: &str, reference_block: u64) -> TransferQuery {
        TransferQuery::new(account, self.contract.as_str(), self.action.as_str())
            .with_limit(self.page_size)
            .with_to_block(Some(reference_block))
    }
}

// =============================================================================
// LedgerState
// =============================================================================

/// Raw result of one fetch, kept so views can be rebuilt without refetching.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerState {
    pub account: String,
    pub snapshot: BalanceSnapshot,
    /// Events as collected, in arrival order.
    pub events: Vec<RawTransferEvent>,
    pub pages_fetched: usize,
    /// Whether the stream stopped before the history was exhausted.
    pub cancelled: bool,
}

impl LedgerState {
    /// Group, filter and bucket the collected events.
    pub fn view(&self, min_balance: &str, config: &EngineConfig) -> EngineResult<LedgerView> {
        self.build(min_balance, config).map(|(view, _)| view)
    }

    /// Build the view along with the number of grouped transactions
    /// before filtering.
    fn build(&self, min_balance: &str, config: &EngineConfig) -> EngineResult<(LedgerView, usize)> {
        let balance = &self.snapshot.balance;

        let grouped = group_transfers(&self.account, &self.events, balance)?;
        let grouped_count = grouped.len();

        let threshold = Asset::from_decimal_str(min_balance, &balance.symbol)?;
        let mut transfers = filter_min_balance(grouped, &threshold)?;
        assign_impact_buckets(&mut transfers, config.num_buckets);

        let points = chart_points(&transfers);
        let ticks = axis_ticks(&points, config.tick_count);
        let range = chart_range(&points);

        let view = LedgerView {
            account: self.account.clone(),
            balance: balance.clone(),
            transfers,
            chart_points: points,
            ticks,
            chart_range: range,
        };
        Ok((view, grouped_count))
    }
}

// =============================================================================
// LedgerService
// =============================================================================

/// Clears the fetching indicator unless a newer fetch took it over.
struct FetchingGuard<'a> {
    fetching: &'a AtomicU64,
    generation: u64,
}

impl Drop for FetchingGuard<'_> {
    fn drop(&mut self) {
        let _ = self.fetching.compare_exchange(
            self.generation,
            0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

/// State holder for the transfer history of one account at a time.
///
/// # Flow
///
/// 1. Cancel the fetch in progress, if any
/// 2. Read the balance and its reference block
/// 3. Stream transfer pages up to that block
/// 4. Group, filter and bucket into a [`LedgerView`]
/// 5. Commit the new state unless a newer fetch was started meanwhile
///
/// A failed cycle leaves the previously committed state in place.
pub struct LedgerService<S: TransferSource> {
    config: EngineConfig,
    source: Arc<S>,
    control: FetchControl,
    /// Generation of the fetch in progress, 0 when idle.
    fetching: AtomicU64,
    state: watch::Sender<Option<Arc<LedgerState>>>,
    min_balance: watch::Sender<String>,
}

impl<S: TransferSource> LedgerService<S> {
    pub fn new(config: EngineConfig, source: Arc<S>) -> Self {
        let (state, _) = watch::channel(None);
        let (min_balance, _) = watch::channel(DEFAULT_MIN_BALANCE.to_string());
        Self {
            config,
            source,
            control: FetchControl::new(),
            fetching: AtomicU64::new(0),
            state,
            min_balance,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fetch the full history of `account` and rebuild the ledger.
    ///
    /// Starting a refresh cancels the one in progress. A refresh that was
    /// superseded still returns its view but never commits it; one stopped
    /// through [`LedgerService::cancel_fetching`] commits what it gathered.
    #[instrument(skip(self))]
    pub async fn refresh(&self, account: Option<&str>) -> EngineResult<LedgerView> {
        let account = account
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(EngineError::NoAccountSelected)?;

        let flag = self.control.begin();
        self.fetching.store(flag.generation(), Ordering::SeqCst);
        let _fetching = FetchingGuard {
            fetching: &self.fetching,
            generation: flag.generation(),
        };
        let _timer = FetchTimer::new();

        info!("🔍 Fetching transfer history");

        let policy = self.config.retry_policy();
        let source = &self.source;
        let snapshot = policy
            .run("fetch_balance", move || source.fetch_balance(account))
            .await?;
        debug!(
            balance = %snapshot.balance,
            block = snapshot.reference_block,
            "Balance fetched"
        );

        let reference_block = snapshot.reference_block;
        let query = self.config.query(account, reference_block);
        let mut stream = TransferStream::new(self.source.clone(), query, policy, flag.clone());
        let mut events = stream.collect_events().await?;

        let collected = events.len();
        events.retain(|e| e.block_number <= reference_block);
        if events.len() < collected {
            debug!(
                ignored = collected - events.len(),
                reference_block, "Events past the balance block ignored"
            );
        }

        let state = LedgerState {
            account: account.to_string(),
            snapshot,
            events,
            pages_fetched: stream.pages_fetched(),
            cancelled: stream.was_cancelled(),
        };
        let min_balance = self.min_balance.borrow().clone();
        let (view, grouped) = state.build(&min_balance, &self.config)?;
        record_transfers_grouped(grouped);

        let pages = state.pages_fetched;
        let cancelled = state.cancelled;
        let committed = self.state.send_if_modified(|current| {
            if self.control.is_latest(&flag) {
                *current = Some(Arc::new(state));
                true
            } else {
                false
            }
        });

        if committed {
            info!(
                pages,
                transfers = view.transfers.len(),
                cancelled,
                "✅ Ledger updated"
            );
        } else {
            debug!("Fetch superseded, result discarded");
        }

        Ok(view)
    }

    /// Stop the fetch in progress at its next page boundary.
    pub fn cancel_fetching(&self) {
        debug!("Cancellation requested");
        self.control.cancel();
    }

    /// Whether a fetch is in progress.
    pub fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::SeqCst) != 0
    }

    /// Replace the minimum-balance filter; invalid input keeps the old one.
    pub fn set_min_balance_filter(&self, value: &str) -> EngineResult<()> {
        Asset::validate_decimal_str(value)?;
        self.min_balance.send_replace(value.to_string());
        debug!(min_balance = value, "Minimum balance filter changed");
        Ok(())
    }

    pub fn min_balance_filter(&self) -> String {
        self.min_balance.borrow().clone()
    }

    /// Last committed state, `None` before the first successful fetch.
    pub fn current_state(&self) -> Option<Arc<LedgerState>> {
        self.state.borrow().clone()
    }

    /// Watch committed states.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<LedgerState>>> {
        self.state.subscribe()
    }

    /// Rebuild the view of the committed state with the current filter.
    pub fn view(&self) -> EngineResult<Option<LedgerView>> {
        let Some(state) = self.current_state() else {
            return Ok(None);
        };
        let min_balance = self.min_balance_filter();
        state.view(&min_balance, &self.config).map(Some)
    }
}
