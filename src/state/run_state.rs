//! Process-local run state shared by the engine and the shutdown coordinator
//!
//! The engine is the only writer of the counters and the continuation token.
//! The coordinator reads them and owns the phase transitions. The `stopping`
//! flag is a cancellation token so the engine can await it at its suspension
//! points instead of polling.

use crate::state::ShutdownPhase;
use crate::HarvestError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Opaque position in the remote listing; never interpreted, only replayed
pub type ContinuationToken = String;

/// Maximum number of records a run should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Budget {
    #[default]
    Unbounded,
    Items(u64),
}

impl Budget {
    pub fn from_limit(limit: Option<u64>) -> Self {
        limit.map_or(Self::Unbounded, Self::Items)
    }

    /// Returns true once `produced` records satisfy the budget
    pub fn is_reached(&self, produced: u64) -> bool {
        match self {
            Self::Unbounded => false,
            Self::Items(limit) => produced >= *limit,
        }
    }

    pub fn limit(&self) -> Option<u64> {
        match self {
            Self::Unbounded => None,
            Self::Items(limit) => Some(*limit),
        }
    }
}

/// Counters, position and stop flag of a single harvest run
#[derive(Debug)]
pub struct RunState {
    page_size: u32,
    budget: Budget,
    produced: AtomicU64,
    pages: AtomicU64,
    next_token: Mutex<Option<ContinuationToken>>,
    phase: Mutex<ShutdownPhase>,
    stopping: CancellationToken,
    started: Instant,
}

impl RunState {
    pub fn new(page_size: u32, budget: Budget, initial_token: Option<ContinuationToken>) -> Self {
        Self {
            page_size,
            budget,
            produced: AtomicU64::new(0),
            pages: AtomicU64::new(0),
            next_token: Mutex::new(initial_token.filter(|token| !token.is_empty())),
            phase: Mutex::new(ShutdownPhase::Running),
            stopping: CancellationToken::new(),
            started: Instant::now(),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Records produced by this run (resumed records are not counted)
    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::Acquire)
    }

    /// Pages persisted by this run
    pub fn pages(&self) -> u64 {
        self.pages.load(Ordering::Acquire)
    }

    /// Token of the most recently persisted page, or the start token
    pub fn next_token(&self) -> Option<ContinuationToken> {
        lock(&self.next_token).clone()
    }

    /// Accounts for one persisted page and advances the continuation token
    pub fn record_page(&self, records: u64, token: Option<ContinuationToken>) {
        self.produced.fetch_add(records, Ordering::AcqRel);
        self.pages.fetch_add(1, Ordering::AcqRel);
        *lock(&self.next_token) = token.filter(|token| !token.is_empty());
    }

    pub fn phase(&self) -> ShutdownPhase {
        *lock(&self.phase)
    }

    /// Advances the run phase by exactly one step
    pub fn transition(&self, to: ShutdownPhase) -> Result<(), HarvestError> {
        let mut phase = lock(&self.phase);
        if !phase.can_transition_to(to) {
            return Err(HarvestError::InvalidTransition { from: *phase, to });
        }
        *phase = to;
        if to == ShutdownPhase::Stopping {
            self.stopping.cancel();
        }
        Ok(())
    }

    /// Moves `Running -> Stopping`; returns false if a stop was already requested
    pub fn request_stop(&self) -> bool {
        self.transition(ShutdownPhase::Stopping).is_ok()
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.is_cancelled()
    }

    /// Resolves once a stop has been requested
    pub fn stopping_token(&self) -> CancellationToken {
        self.stopping.clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
