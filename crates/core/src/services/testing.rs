//! In-memory transfer source used by the service tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::oneshot;

use crate::error::{SourceError, SourceResult};
use crate::models::{Asset, RawTransferEvent, SequenceNumbers, Symbol};
use crate::ports::{BalanceSnapshot, Cursor, TransferPage, TransferQuery, TransferSource};

pub(crate) const ACCOUNT: &str = "alice";

pub(crate) fn eos_symbol() -> Symbol {
    Symbol::new(4, "EOS")
}

pub(crate) fn eos(amount: i64) -> Asset {
    Asset::new(amount, eos_symbol())
}

pub(crate) fn ts(block: u64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + block as i64 * 60, 0)
        .single()
        .expect("valid timestamp")
}

/// Transfer leg seen from [`ACCOUNT`]: positive amounts are incoming.
pub(crate) fn leg(tx: &str, block: u64, party: &str, amount: i64) -> RawTransferEvent {
    let (from, to) = if amount >= 0 {
        (party, ACCOUNT)
    } else {
        (ACCOUNT, party)
    };
    RawTransferEvent {
        block_number: block,
        timestamp: ts(block),
        transaction_id: tx.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        quantity: eos(amount.abs()),
        sequence: SequenceNumbers::default(),
    }
}

pub(crate) fn page(events: Vec<RawTransferEvent>, cursor: &str) -> TransferPage {
    TransferPage {
        events,
        cursor: cursor.to_string(),
    }
}

/// Scripted response for one `fetch_page` call.
pub(crate) enum Step {
    Page(TransferPage),
    Fail(SourceError),
    /// Never answers; relies on the caller's timeout.
    Hang,
    /// Signals `reached`, then waits for `proceed` before answering.
    Gated {
        page: TransferPage,
        reached: oneshot::Sender<()>,
        proceed: oneshot::Receiver<()>,
    },
}

pub(crate) struct ScriptedSource {
    balance: BalanceSnapshot,
    balance_failures: Mutex<VecDeque<SourceError>>,
    steps: Mutex<VecDeque<Step>>,
    cursors: Mutex<Vec<Option<String>>>,
}

impl ScriptedSource {
    pub(crate) fn new(balance: Asset, reference_block: u64, steps: Vec<Step>) -> Self {
        Self {
            balance: BalanceSnapshot {
                balance,
                reference_block,
            },
            balance_failures: Mutex::new(VecDeque::new()),
            steps: Mutex::new(steps.into()),
            cursors: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_pages(balance: Asset, reference_block: u64, pages: Vec<TransferPage>) -> Self {
        Self::new(
            balance,
            reference_block,
            pages.into_iter().map(Step::Page).collect(),
        )
    }

    pub(crate) fn fail_balance_with(self, errors: Vec<SourceError>) -> Self {
        *self.balance_failures.lock().unwrap() = errors.into();
        self
    }

    /// Cursors passed to `fetch_page`, in call order.
    pub(crate) fn cursors_seen(&self) -> Vec<Option<String>> {
        self.cursors.lock().unwrap().clone()
    }

    pub(crate) fn page_calls(&self) -> usize {
        self.cursors.lock().unwrap().len()
    }
}

#[async_trait]
impl TransferSource for ScriptedSource {
    async fn fetch_balance(&self, _account: &str) -> SourceResult<BalanceSnapshot> {
        let failure = self.balance_failures.lock().unwrap().pop_front();
        match failure {
            Some(err) => Err(err),
            None => Ok(self.balance.clone()),
        }
    }

    async fn fetch_page(
        &self,
        _query: &TransferQuery,
        cursor: Option<&Cursor>,
    ) -> SourceResult<TransferPage> {
        self.cursors
            .lock()
            .unwrap()
            .push(cursor.map(|c| c.value.clone()));

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Page(page)) => Ok(page),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Gated {
                page,
                reached,
                proceed,
            }) => {
                let _ = reached.send(());
                let _ = proceed.await;
                Ok(page)
            }
            None => Ok(TransferPage::default()),
        }
    }
}
