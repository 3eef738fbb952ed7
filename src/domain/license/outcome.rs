//! Results of license lifecycle operations

use chrono::Duration;
use serde::Serialize;

/// Outcome of presenting a key for redemption
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The key was redeemed; `remaining` is what is left of its window
    Valid { remaining: Duration },
    NotFound,
    AlreadyUsed,
    Expired,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Metric / log label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Valid { .. } => "ok",
            Self::NotFound => "not_found",
            Self::AlreadyUsed => "already_used",
            Self::Expired => "expired",
        }
    }

    /// Human-readable reason shown to callers
    pub fn message(&self) -> &'static str {
        match self {
            Self::Valid { .. } => "License key accepted",
            Self::NotFound => "Unknown license key",
            Self::AlreadyUsed => "License key has already been used",
            Self::Expired => "License key has expired",
        }
    }
}

/// What a replenishment pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceSummary {
    /// Records carried over unchanged
    pub retained: usize,
    /// Used or expired records dropped
    pub pruned: usize,
    /// New records generated to reach the minimum
    pub created: usize,
}

impl MaintenanceSummary {
    /// Whether the pass changed the persisted collection
    pub fn changed(&self) -> bool {
        self.pruned > 0 || self.created > 0
    }
}
