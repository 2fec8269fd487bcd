//! Sign-in domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of the most recent verification attempt against a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeStatus {
    /// Issued and not yet verified.
    Pending,
    /// Matched; the challenge is cleared right after.
    Verified,
    /// The last attempt did not match. The challenge stays live for retries.
    Failed,
}

/// A one-time passcode issued to the current phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub status: ChallengeStatus,
}

impl OtpChallenge {
    pub fn issue(code: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            issued_at,
            status: ChallengeStatus::Pending,
        }
    }
}

/// Where the sign-in handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthPhase {
    #[default]
    Anonymous,
    OtpPending,
    OtpVerifying,
    Authenticated,
}

/// The single user-facing message slot. Error and success never coexist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Feedback {
    Error(String),
    Success(String),
}

/// Observable sign-in state pushed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuthView {
    pub phase: AuthPhase,
    pub phone: String,
    pub country_code: String,
    pub is_authenticated: bool,
    pub otp_sent: bool,
    pub otp_verified: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub success: Option<String>,
}
