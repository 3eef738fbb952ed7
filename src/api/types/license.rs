//! License endpoint bodies

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::Verification;

/// `POST /api/verify` body
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub key: String,
}

/// Redemption result; rejections are reported with `valid: false`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Verification> for VerifyResponse {
    fn from(outcome: Verification) -> Self {
        match outcome {
            Verification::Valid { remaining } => Self {
                valid: true,
                remaining_ms: Some(remaining.num_milliseconds()),
                message: None,
            },
            rejected => Self {
                valid: false,
                remaining_ms: None,
                message: Some(rejected.message().to_string()),
            },
        }
    }
}

/// `GET /api/remaining/{key}` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<i64>,
}

impl From<Option<Duration>> for RemainingResponse {
    fn from(remaining: Option<Duration>) -> Self {
        Self {
            valid: remaining.is_some(),
            remaining_ms: remaining.map(|r| r.num_milliseconds()),
        }
    }
}

/// `POST /api/admin/licenses` body
#[derive(Deserialize)]
pub struct AdminReportRequest {
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for AdminReportRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminReportRequest")
            .field("password", &"[REDACTED]")
            .finish()
    }
}
