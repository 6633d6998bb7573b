/// Category phase definitions for tracking a listing crawl
///
/// Each category moves through `Pending -> Active -> {Exhausted | Suspended}`
/// within one run.
use std::fmt;

/// Why a category stopped before reaching its end-of-results page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspendReason {
    /// The per-run page budget was used up
    BudgetSpent,

    /// A page rendered with neither items nor the end-of-results marker
    Anomaly,

    /// The renderer failed or timed out
    FetchFailed,

    /// The run was cancelled
    Cancelled,
}

impl SuspendReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetSpent => "budget_spent",
            Self::Anomaly => "anomaly",
            Self::FetchFailed => "fetch_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Represents where a category is in the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryPhase {
    // ===== Active States =====
    /// Category not yet started this run
    Pending,

    /// Pages are being requested, classified and emitted
    Active,

    // ===== Terminal States =====
    /// End-of-results reached; the cursor holds the exhausted-sentinel
    Exhausted,

    /// Stopped early this run; the cursor keeps its numeric value
    Suspended(SuspendReason),
}

impl CategoryPhase {
    /// Returns true if no further pages will be requested this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Suspended(_))
    }

    /// Returns true if this phase records a problem worth a retry
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Suspended(SuspendReason::Anomaly) | Self::Suspended(SuspendReason::FetchFailed)
        )
    }

    /// Checks whether moving from this phase to `next` is allowed
    ///
    /// Terminal phases never change again within a run.
    pub fn can_transition_to(&self, next: CategoryPhase) -> bool {
        match (self, next) {
            (Self::Pending, Self::Active) => true,
            // An exhausted cursor found at start skips straight to Exhausted
            (Self::Pending, Self::Exhausted) => true,
            (Self::Pending, Self::Suspended(SuspendReason::Cancelled)) => true,
            (Self::Active, Self::Exhausted) => true,
            (Self::Active, Self::Suspended(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Exhausted => "exhausted",
            Self::Suspended(reason) => reason.as_str(),
        }
    }
}

impl fmt::Display for CategoryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suspended(reason) => write!(f, "suspended ({})", reason.as_str()),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
