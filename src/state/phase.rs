/// Run phase definitions for the shutdown protocol
///
/// A run moves strictly forward through these phases; no phase is skipped and
/// a stopping run never returns to `Running`.
use std::fmt;

/// Represents the lifecycle phase of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownPhase {
    /// Pages are being fetched and persisted
    Running,

    /// A stop was requested; no new fetches are scheduled, in-flight work drains
    Stopping,

    /// The store is being finalized with the last persisted token
    Finalizing,

    /// The store is closed and the summary reported
    Terminated,
}

impl ShutdownPhase {
    /// Returns the only phase this one may advance to
    pub fn successor(&self) -> Option<Self> {
        match self {
            Self::Running => Some(Self::Stopping),
            Self::Stopping => Some(Self::Finalizing),
            Self::Finalizing => Some(Self::Terminated),
            Self::Terminated => None,
        }
    }

    /// Returns true if moving to `next` is a legal single step
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.successor() == Some(next)
    }

    /// Returns true once a stop has been requested
    pub fn is_stopping(&self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Finalizing => "finalizing",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
