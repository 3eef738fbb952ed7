//! License record entity

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::category::LicenseCategory;

/// Status of a license at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    /// Unused and inside its validity window
    Valid,
    /// Already redeemed
    Used,
    /// Never redeemed and past its cutoff
    Expired,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Used => "used",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single time-limited license key
///
/// Timestamps are persisted as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    key: String,
    category: String,
    /// Validity window in minutes
    duration: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    expires_at: DateTime<Utc>,
    used: bool,
}

impl LicenseRecord {
    /// Create a fresh, unused license for a category
    ///
    /// `created_at` is cut to whole milliseconds to match the stored form.
    pub fn new(key: impl Into<String>, category: &LicenseCategory, created_at: DateTime<Utc>) -> Self {
        let created_at = created_at.trunc_subsecs(3);
        let expires_at = created_at + Duration::milliseconds(category.duration_ms());

        Self {
            key: key.into(),
            category: category.name().to_string(),
            duration: category.duration_minutes(),
            created_at,
            expires_at,
            used: false,
        }
    }

    // Getters

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    /// The cutoff has been reached
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Unused and still inside its window
    pub fn is_consumable(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }

    /// Used, but its window has not elapsed yet
    pub fn is_active_redemption(&self, now: DateTime<Utc>) -> bool {
        self.used && !self.is_expired(now)
    }

    pub fn status(&self, now: DateTime<Utc>) -> LicenseStatus {
        if self.used {
            LicenseStatus::Used
        } else if self.is_expired(now) {
            LicenseStatus::Expired
        } else {
            LicenseStatus::Valid
        }
    }

    /// Time left until the cutoff, clamped at zero
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }

    /// Redeem the license. Never reverts.
    pub(crate) fn mark_used(&mut self) {
        self.used = true;
    }
}
