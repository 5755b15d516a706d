//! Shutdown coordination
//!
//! The coordinator turns a stop request (operator interrupt or an
//! engine-originated stop) into the `Running -> Stopping -> Finalizing ->
//! Terminated` sequence. It never writes to the store while the engine runs:
//! the engine hands the store over only after it has drained.

use crate::harvester::StopReason;
use crate::state::{ContinuationToken, RunState, ShutdownPhase};
use crate::store::CheckpointStore;
use crate::HarvestError;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Result of finalizing the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeReport {
    /// Records in the finalized store
    pub total_records: usize,

    /// Token written to the trailing checkpoint
    pub token: Option<ContinuationToken>,
}

/// Coordinates graceful shutdown of a harvest run
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    state: Arc<RunState>,
}

impl ShutdownCoordinator {
    pub fn new(state: Arc<RunState>) -> Self {
        Self { state }
    }

    /// Handles an operator interrupt
    ///
    /// Only the first call has an effect; a signal received while the run is
    /// already stopping is logged and ignored.
    pub fn on_cancel_signal(&self) -> bool {
        if self.state.request_stop() {
            tracing::info!(
                "Interrupt received, saving received pages; the page being fetched will be refetched on resume (further interrupts are ignored)"
            );
            true
        } else {
            tracing::debug!(
                "Interrupt ignored, run is already {}",
                self.state.phase()
            );
            false
        }
    }

    /// Stops scheduling on behalf of the engine (budget, exhaustion, failure)
    pub fn begin_finalization(&self, reason: StopReason) -> bool {
        let first = self.state.request_stop();
        if first {
            tracing::info!("Stopping harvest: {}", reason);
        }
        first
    }

    /// Listens for Ctrl-C for the rest of the run
    ///
    /// The listener keeps running after the first interrupt so later ones are
    /// swallowed instead of killing the process mid-finalize. Abort the
    /// returned handle once the run has terminated.
    pub fn spawn_signal_listener(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for interrupts: {}", e);
                    return;
                }
                coordinator.on_cancel_signal();
            }
        })
    }

    pub fn phase(&self) -> ShutdownPhase {
        self.state.phase()
    }

    /// Finalizes the drained store with the last persisted token
    ///
    /// Must be called once the engine has returned the store. A run that is
    /// still `Running` is first moved to `Stopping` so no phase is skipped.
    pub fn finalize(&self, store: CheckpointStore) -> Result<FinalizeReport, HarvestError> {
        if self.state.phase() == ShutdownPhase::Running {
            self.state.transition(ShutdownPhase::Stopping)?;
        }
        self.state.transition(ShutdownPhase::Finalizing)?;

        let token = self.state.next_token();
        let total_records = store.finalize(token.clone())?;

        self.state.transition(ShutdownPhase::Terminated)?;

        tracing::info!(
            "Store finalized: {} records, {} produced this run in {:?}",
            total_records,
            self.state.produced(),
            self.state.elapsed()
        );
        if let Some(token) = &token {
            tracing::info!("Last API cursor: {}", token);
        }

        Ok(FinalizeReport {
            total_records,
            token,
        })
    }
}
