//! Harvester module for running a complete harvest
//!
//! This module wires the pieces of a run together:
//! - The pagination engine that drives fetch, normalize and persist
//! - The shutdown coordinator that turns stop requests into a finalized store
//! - The run summary reported once the store is finalized

mod engine;
mod shutdown;
mod summary;

pub use engine::{EngineOptions, EngineOutcome, PaginationEngine};
pub use shutdown::{FinalizeReport, ShutdownCoordinator};
pub use summary::{RunSummary, StopReason};

use crate::config::Config;
use crate::listing::{HttpListing, PageSource};
use crate::state::{Budget, RunState};
use crate::store::CheckpointStore;
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;

/// A prepared harvest run
///
/// Construction opens the store and resolves the first token, so a store that
/// cannot be resumed is refused before any request is made.
pub struct Harvester {
    store: CheckpointStore,
    state: Arc<RunState>,
    coordinator: ShutdownCoordinator,
    engine: PaginationEngine,
}

impl Harvester {
    pub fn new(config: &Config, source: Arc<dyn PageSource>) -> Result<Self, HarvestError> {
        let (store, start_token) = CheckpointStore::open_or_reset(
            Path::new(&config.output.path),
            config.output.overwrite,
            config.paging.cursor.clone(),
        )?;

        let state = Arc::new(RunState::new(
            config.paging.page_size,
            Budget::from_limit(config.paging.max_items),
            start_token,
        ));
        let coordinator = ShutdownCoordinator::new(Arc::clone(&state));
        let engine = PaginationEngine::new(
            source,
            Arc::clone(&state),
            coordinator.clone(),
            EngineOptions::from(config),
        );

        Ok(Self {
            store,
            state,
            coordinator,
            engine,
        })
    }

    pub fn coordinator(&self) -> &ShutdownCoordinator {
        &self.coordinator
    }

    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    /// Runs the engine to a stop and finalizes the store
    pub async fn run(self) -> Result<RunSummary, HarvestError> {
        let Self {
            store,
            state,
            coordinator,
            engine,
        } = self;

        let resumed_records = store.resumed_records();
        let outcome = engine.run(store).await;
        let report = coordinator.finalize(outcome.store)?;

        Ok(RunSummary {
            produced: state.produced(),
            pages: state.pages(),
            resumed_records,
            total_records: report.total_records,
            final_token: report.token,
            stop_reason: outcome.stop_reason,
            elapsed: state.elapsed(),
        })
    }
}

/// Runs a complete harvest against the configured listing
///
/// Ctrl-C requests a graceful stop: pages already received are persisted, a
/// page still being fetched is discarded and refetched on resume, and the
/// store is finalized with a resumable checkpoint.
///
/// # Returns
///
/// * `Ok(RunSummary)` - The store was finalized; check `stop_reason` for how the run ended
/// * `Err(HarvestError)` - The run could not start, or the store could not be finalized
pub async fn harvest(config: Config) -> Result<RunSummary, HarvestError> {
    let source = HttpListing::from_config(
        &config.listing,
        &config.user_agent,
        config.paging.page_size,
    )?;
    tracing::debug!("First page URL: {}", source.request().page_url(config.paging.cursor.as_deref()));

    let harvester = Harvester::new(&config, Arc::new(source))?;
    let listener = harvester.coordinator().spawn_signal_listener();

    let result = harvester.run().await;
    listener.abort();

    result
}
