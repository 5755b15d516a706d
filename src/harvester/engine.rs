//! Pagination engine - the fetch, normalize, persist cycle
//!
//! The engine keeps at most one fetch outstanding. As soon as a page arrives
//! and its items are normalized, the fetch for the following page is spawned
//! with the token the page carried, and only then is the page persisted. The
//! network latency of page n+1 overlaps with the store write of page n, and
//! because the next fetch can only start once its token is known, pages are
//! always persisted in request order.
//!
//! Stop requests are observed at cycle boundaries and while waiting for a
//! fetch. A page whose fetch completed is always persisted; an outstanding
//! lookahead fetch is drained and its page discarded, so the checkpoint
//! replays it on resume.

use crate::config::Config;
use crate::harvester::{ShutdownCoordinator, StopReason};
use crate::listing::{fetch_with_retry, FetchError, ListingPage, PageSource, RetryPolicy};
use crate::normalize::{normalize_value, Record};
use crate::state::RunState;
use crate::store::CheckpointStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};

type FetchHandle = JoinHandle<Result<ListingPage, FetchError>>;

/// Tunables of the pagination engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub retry: RetryPolicy,

    /// Consecutive store write failures tolerated before halting
    pub max_persist_failures: u32,

    /// How long a stopping run waits for an outstanding fetch
    pub drain_timeout: Duration,

    /// Log progress every N persisted pages
    pub progress_interval: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::none(),
            max_persist_failures: 3,
            drain_timeout: Duration::from_secs(30),
            progress_interval: 1,
        }
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            retry: RetryPolicy::from(&config.retry),
            max_persist_failures: config.retry.max_persist_failures.max(1),
            drain_timeout: Duration::from_secs(config.retry.drain_timeout_secs),
            progress_interval: config.paging.progress_interval.max(1),
        }
    }
}

/// What the engine hands back once it has stopped scheduling
#[derive(Debug)]
pub struct EngineOutcome {
    /// The drained store, ready to be finalized
    pub store: CheckpointStore,

    pub stop_reason: StopReason,

    /// Page fetches issued, including a discarded lookahead
    pub fetches: u64,
}

/// Outcome of waiting on the outstanding fetch
enum Wait {
    Fetched(Result<Result<ListingPage, FetchError>, JoinError>),
    Stopped,
}

/// Drives the fetch -> normalize -> persist cycle
pub struct PaginationEngine {
    source: Arc<dyn PageSource>,
    state: Arc<RunState>,
    coordinator: ShutdownCoordinator,
    options: EngineOptions,
}

impl PaginationEngine {
    pub fn new(
        source: Arc<dyn PageSource>,
        state: Arc<RunState>,
        coordinator: ShutdownCoordinator,
        options: EngineOptions,
    ) -> Self {
        Self {
            source,
            state,
            coordinator,
            options,
        }
    }

    /// Runs until the budget is met, the listing ends, a stop is requested,
    /// or a fetch or store failure halts scheduling
    ///
    /// The first fetch uses the run state's current token. At least one page
    /// is always requested unless a stop was requested before the run began.
    pub async fn run(&self, mut store: CheckpointStore) -> EngineOutcome {
        let stopping = self.state.stopping_token();
        let mut fetches = 0u64;
        let mut persist_failures = 0u32;

        tracing::info!(
            "Starting harvest: page size {}, budget {}, cursor {}",
            self.state.page_size(),
            self.state
                .budget()
                .limit()
                .map_or_else(|| "unbounded".to_string(), |limit| limit.to_string()),
            self.state.next_token().as_deref().unwrap_or("<start>")
        );

        if self.state.is_stopping() {
            return EngineOutcome {
                store,
                stop_reason: StopReason::Cancelled,
                fetches,
            };
        }

        // The first page of a resumed run may repeat the tail of the prior run
        let mut already_stored = store.resumed_identifiers(self.state.page_size() as usize);

        let mut pending = self.spawn_fetch(self.state.next_token());
        fetches += 1;

        let stop_reason = loop {
            if self.state.is_stopping() {
                self.drain(pending).await;
                break StopReason::Cancelled;
            }

            let wait = tokio::select! {
                biased;
                joined = &mut pending => Wait::Fetched(joined),
                _ = stopping.cancelled() => Wait::Stopped,
            };

            let page = match wait {
                Wait::Stopped => {
                    self.drain(pending).await;
                    break StopReason::Cancelled;
                }
                Wait::Fetched(Ok(Ok(page))) => page,
                Wait::Fetched(Ok(Err(e))) => {
                    tracing::warn!("Dropping page after failed fetch: {}", e);
                    self.coordinator.begin_finalization(StopReason::TransportFailed);
                    break StopReason::TransportFailed;
                }
                Wait::Fetched(Err(e)) => {
                    tracing::error!("Fetch task failed: {}", e);
                    self.coordinator.begin_finalization(StopReason::TransportFailed);
                    break StopReason::TransportFailed;
                }
            };

            let cursor = page.next_cursor().map(str::to_owned);
            let exhausted = cursor.is_none() || page.scratchpads.is_empty();
            let mut records: Vec<Record> = page
                .scratchpads
                .into_iter()
                .filter_map(normalize_value)
                .collect();
            if !already_stored.is_empty() {
                let received = records.len();
                records.retain(|record| {
                    !record
                        .identifier()
                        .is_some_and(|id| already_stored.contains(id))
                });
                if records.len() < received {
                    tracing::info!(
                        "Skipping {} programs already stored by the previous run",
                        received - records.len()
                    );
                }
                already_stored.clear();
            }
            let count = records.len() as u64;
            let budget_reached = self.state.budget().is_reached(self.state.produced() + count);

            // Schedule the next page before persisting this one
            let lookahead = if exhausted || budget_reached || self.state.is_stopping() {
                None
            } else {
                fetches += 1;
                Some(self.spawn_fetch(cursor.clone()))
            };

            // A page without a token keeps the checkpoint at the token that fetched it
            let checkpoint = cursor.or_else(|| self.state.next_token());

            match store.append(records, checkpoint.clone()) {
                Ok(()) => persist_failures = 0,
                Err(e) => {
                    persist_failures += 1;
                    tracing::warn!(
                        "Failed to write store ({}/{}): {}",
                        persist_failures,
                        self.options.max_persist_failures,
                        e
                    );
                }
            }
            self.state.record_page(count, checkpoint);
            self.report_progress();

            if persist_failures >= self.options.max_persist_failures {
                tracing::error!("Store writes keep failing, halting harvest");
                self.coordinator.begin_finalization(StopReason::PersistenceFailed);
                if let Some(lookahead) = lookahead {
                    self.drain(lookahead).await;
                }
                break StopReason::PersistenceFailed;
            }

            if budget_reached {
                self.coordinator.begin_finalization(StopReason::BudgetReached);
                break StopReason::BudgetReached;
            }

            if exhausted {
                self.coordinator.begin_finalization(StopReason::ListingExhausted);
                break StopReason::ListingExhausted;
            }

            match lookahead {
                Some(next) => pending = next,
                None => break StopReason::Cancelled,
            }
        };

        EngineOutcome {
            store,
            stop_reason,
            fetches,
        }
    }

    fn spawn_fetch(&self, cursor: Option<String>) -> FetchHandle {
        let source = Arc::clone(&self.source);
        let policy = self.options.retry;
        let stopping = self.state.stopping_token();

        tokio::spawn(async move {
            fetch_with_retry(source.as_ref(), cursor.as_deref(), policy, &stopping).await
        })
    }

    /// Waits for an outstanding fetch and discards its page
    async fn drain(&self, mut pending: FetchHandle) {
        match tokio::time::timeout(self.options.drain_timeout, &mut pending).await {
            Ok(Ok(Ok(page))) => {
                tracing::debug!(
                    "Discarding lookahead page with {} items; it will be refetched on resume",
                    page.scratchpads.len()
                );
            }
            Ok(Ok(Err(e))) => tracing::debug!("Lookahead fetch failed while stopping: {}", e),
            Ok(Err(e)) => tracing::debug!("Lookahead fetch task ended while stopping: {}", e),
            Err(_) => {
                pending.abort();
                tracing::warn!(
                    "Lookahead fetch did not finish within {:?}, abandoned",
                    self.options.drain_timeout
                );
            }
        }
    }

    fn report_progress(&self) {
        let pages = self.state.pages();
        if pages % self.options.progress_interval != 0 {
            return;
        }

        let produced = self.state.produced();
        let rate = produced as f64 / self.state.elapsed().as_secs_f64().max(f64::EPSILON);
        match self.state.budget().limit() {
            Some(limit) => tracing::info!(
                "Progress: {}/{} programs scraped ({} pages), {:.1} programs/sec",
                produced,
                limit,
                pages,
                rate
            ),
            None => tracing::info!(
                "Progress: {} programs scraped ({} pages), {:.1} programs/sec",
                produced,
                pages,
                rate
            ),
        }
    }
}
