//! Run summary and stop reasons

use crate::state::ContinuationToken;
use std::fmt;
use std::time::Duration;

/// Why the pagination engine stopped scheduling fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The item budget was met
    BudgetReached,

    /// The listing returned an empty page or no continuation token
    ListingExhausted,

    /// An operator interrupt was received
    Cancelled,

    /// A page could not be fetched after all retries
    TransportFailed,

    /// The store could not be written repeatedly
    PersistenceFailed,
}

impl StopReason {
    /// Returns true for stops that count as a normal end of the run
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::BudgetReached | Self::ListingExhausted | Self::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetReached => "budget reached",
            Self::ListingExhausted => "listing exhausted",
            Self::Cancelled => "cancelled",
            Self::TransportFailed => "transport failed",
            Self::PersistenceFailed => "persistence failed",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final counters of a harvest run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Records produced by this run
    pub produced: u64,

    /// Pages persisted by this run
    pub pages: u64,

    /// Records carried over from a prior run
    pub resumed_records: usize,

    /// Records in the finalized store
    pub total_records: usize,

    /// Token written to the trailing checkpoint
    pub final_token: Option<ContinuationToken>,

    pub stop_reason: StopReason,

    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Completed scraping {} programs in {}ms ({}).",
            self.produced,
            self.elapsed.as_millis(),
            self.stop_reason
        )
    }
}
