//! Lazy, cursor-paginated transfer stream.
//!
//! Pages are fetched strictly one after another. Each request runs under a
//! fixed timeout; transient failures are retried with the same cursor and an
//! exponential backoff until the retry budget is used up. Cancellation is
//! checked once per page boundary. A cursor the upstream already returned ends
//! the stream with a malformed-response error.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tracing::{debug, error, trace, warn};

use crate::error::{EngineError, EngineResult, SourceError, SourceResult};
use crate::metrics::{record_fetch_cancelled, record_page_fetched, record_page_retry};
use crate::models::RawTransferEvent;
use crate::ports::{Cursor, TransferQuery, TransferSource};
use crate::services::cancel::CancelFlag;

// =============================================================================
// Retry Policy
// =============================================================================

/// Timeout and retry settings for a single upstream request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Upper bound for one request.
    pub timeout: Duration,
    /// Retries allowed after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap for the doubling backoff.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Run `request` under the timeout, retrying transient failures.
    ///
    /// Malformed responses are returned immediately; once the retry budget is
    /// exhausted the last failure is surfaced as [`EngineError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut request: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SourceResult<T>>,
    {
        let mut retry_delay = self.initial_delay;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let failure = match tokio::time::timeout(self.timeout, request()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if !e.is_transient() => {
                    error!(operation, error = %e, "❌ Upstream returned an unusable response");
                    return Err(e.into());
                }
                Ok(Err(e)) => e,
                Err(_) => SourceError::Timeout(self.timeout),
            };

            if attempts > self.max_retries {
                error!(
                    operation,
                    attempts,
                    error = %failure,
                    "❌ Retry budget exhausted"
                );
                return Err(EngineError::RetriesExhausted {
                    attempts,
                    last_error: failure.to_string(),
                });
            }

            record_page_retry(failure.kind());
            warn!(
                operation,
                attempt = attempts,
                error = %failure,
                retry_in_ms = retry_delay.as_millis(),
                "⚠️  Upstream request failed, retrying..."
            );

            tokio::time::sleep(retry_delay).await;
            retry_delay = (retry_delay * 2).min(self.max_delay);
        }
    }
}

// =============================================================================
// TransferStream
// =============================================================================

/// Lazy stream of non-empty transfer pages.
pub type TransferPageStream =
    Pin<Box<dyn Stream<Item = EngineResult<Vec<RawTransferEvent>>> + Send>>;

enum Position {
    Start,
    At(Cursor),
    Done,
}

/// Walks a transfer search page by page, newest first.
///
/// A retried request always reuses the cursor of the failed one, so no
/// event is skipped. The stream ends when the upstream cursor is empty,
/// the cancellation flag is raised, or a fatal error was yielded.
pub struct TransferStream<S: TransferSource> {
    source: Arc<S>,
    query: TransferQuery,
    policy: RetryPolicy,
    cancel: CancelFlag,
    position: Position,
    /// Cursors handed out by the upstream so far.
    visited: HashSet<Cursor>,
    pages_fetched: usize,
    cancelled: bool,
}

impl<S: TransferSource> TransferStream<S> {
    pub fn new(source: Arc<S>, query: TransferQuery, policy: RetryPolicy, cancel: CancelFlag) -> Self {
        Self {
            source,
            query,
            policy,
            cancel,
            position: Position::Start,
            visited: HashSet::new(),
            pages_fetched: 0,
            cancelled: false,
        }
    }

    /// Number of non-empty pages returned so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Whether the stream stopped because its cancellation flag was raised.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Fetch the next non-empty page, `None` once the stream is over.
    pub async fn next_page(&mut self) -> Option<EngineResult<Vec<RawTransferEvent>>> {
        loop {
            let cursor = match &self.position {
                Position::Done => return None,
                Position::Start => None,
                Position::At(cursor) => Some(cursor.clone()),
            };

            if self.cancel.is_cancelled() {
                debug!(pages = self.pages_fetched, "🛑 Transfer stream cancelled");
                record_fetch_cancelled();
                self.cancelled = true;
                self.position = Position::Done;
                return None;
            }

            let source = &self.source;
            let query = &self.query;
            let position = cursor.as_ref();
            let result = self
                .policy
                .run("fetch_page", move || source.fetch_page(query, position))
                .await;

            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    self.position = Position::Done;
                    return Some(Err(e));
                }
            };

            let next = page.next_cursor();
            if let Some(next_cursor) = &next
                && !self.visited.insert(next_cursor.clone())
            {
                self.position = Position::Done;
                return Some(Err(EngineError::UpstreamMalformedResponse(format!(
                    "cursor '{}' was already visited",
                    page.cursor
                ))));
            }
            self.position = next.map_or(Position::Done, Position::At);

            if page.events.is_empty() {
                trace!("Empty page skipped");
                continue;
            }

            self.pages_fetched += 1;
            record_page_fetched(page.events.len());
            debug!(
                page = self.pages_fetched,
                events = page.events.len(),
                more = matches!(self.position, Position::At(_)),
                "📄 Transfer page fetched"
            );
            return Some(Ok(page.events));
        }
    }

    /// Drain the stream into one list, stopping at the first fatal error.
    ///
    /// A cancelled stream returns the events gathered so far.
    pub async fn collect_events(&mut self) -> EngineResult<Vec<RawTransferEvent>> {
        let mut events = Vec::new();
        while let Some(page) = self.next_page().await {
            events.extend(page?);
        }
        Ok(events)
    }
}

impl<S: TransferSource + 'static> TransferStream<S> {
    /// Turn the walker into a boxed [`Stream`] of pages.
    pub fn into_stream(self) -> TransferPageStream {
        Box::pin(futures::stream::unfold(self, |mut walker| async move {
            walker.next_page().await.map(|page| (page, walker))
        }))
    }
}
