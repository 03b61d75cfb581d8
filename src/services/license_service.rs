//! Domain service for license validation and redemption.
//!
//! Orchestrates the binding policy, expiry classification, and ban/usage
//! checks into a single verdict, used by both the registration flow and the
//! runtime check-license flow.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::License;
use crate::services::binding::{self, BindingDecision};
use crate::services::expiry::{self, ExpiryState};

/// Why a presented key was rejected. Every kind is distinguishable on the
/// wire so callers can show distinct messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    NotFound,
    Banned,
    Expired,
    Exhausted,
    IdentityMismatch,
}

impl Rejection {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotFound => "License not found",
            Self::Banned => "License is banned",
            Self::Expired => "License has expired",
            Self::Exhausted => "License has reached max uses",
            Self::IdentityMismatch => "License locked to another identity",
        }
    }
}

/// Expiry classification as rendered in responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExpiryView {
    Lifetime,
    Expired,
    Valid { remaining_seconds: i64 },
}

impl From<ExpiryState> for ExpiryView {
    fn from(state: ExpiryState) -> Self {
        match state {
            ExpiryState::Lifetime => Self::Lifetime,
            ExpiryState::Expired => Self::Expired,
            ExpiryState::Remaining(d) => Self::Valid {
                remaining_seconds: d.num_seconds(),
            },
        }
    }
}

/// Read-only projection of a license row returned with a valid verdict.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseView {
    pub key: String,
    pub identity: Option<String>,
    /// `uses/allowed_uses`, raw counters (0 allowed = unlimited).
    pub usage: String,
    pub hwid_locked: bool,
    pub expiry: ExpiryView,
    pub banned: bool,
}

impl LicenseView {
    #[must_use]
    pub fn project(license: &License, expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            key: license.key_code.clone(),
            identity: license.hwid.clone(),
            usage: format!("{}/{}", license.uses, license.allowed_uses),
            hwid_locked: license.hwid_locked,
            expiry: expiry::classify(expiry, now).into(),
            banned: license.banned,
        }
    }
}

/// Outcome of a validation or redemption.
#[derive(Debug, Clone)]
pub enum Verdict {
    Valid(LicenseView),
    Rejected(Rejection),
}

impl Verdict {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Infrastructure errors. Rejections are not errors; they travel inside
/// [`Verdict`].
#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for LicenseError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for LicenseError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// The ordered short-circuit checks shared by every call site: ban, expiry,
/// exhaustion, then binding. First failing check wins. `expiry` is the
/// already-parsed expiry column.
pub fn evaluate(
    license: &License,
    expiry: Option<DateTime<Utc>>,
    identity: &str,
    now: DateTime<Utc>,
) -> Result<BindingDecision, Rejection> {
    if license.banned {
        return Err(Rejection::Banned);
    }

    if expiry::classify(expiry, now).is_expired() {
        return Err(Rejection::Expired);
    }

    if license.allowed_uses != 0 && license.uses >= license.allowed_uses {
        return Err(Rejection::Exhausted);
    }

    let decision = binding::evaluate(license.hwid_locked, license.hwid.as_deref(), identity);
    if decision == BindingDecision::Mismatch {
        return Err(Rejection::IdentityMismatch);
    }

    Ok(decision)
}

/// Domain service trait for license entitlement decisions.
#[async_trait::async_trait]
pub trait LicenseService: Send + Sync {
    /// Runtime check-license flow: ordered checks plus the first-use binding
    /// (no use-counter increment). A lost first-bind race is re-evaluated
    /// once internally before surfacing as a mismatch.
    async fn validate(&self, key: &str, identity: &str) -> Result<Verdict, LicenseError>;

    /// Registration flow: ordered checks, then one atomic guarded update
    /// binding the identity, assigning the owner, and incrementing `uses`.
    async fn redeem(&self, key: &str, identity: &str, user_id: i32)
    -> Result<Verdict, LicenseError>;

    /// Read-only evaluation: the same ordered checks with no mutation.
    /// Used to reject a registration before any user row is created.
    async fn precheck(&self, key: &str, identity: &str) -> Result<Verdict, LicenseError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn license(allowed: i32, uses: i32, hwid: Option<&str>, locked: bool) -> License {
        License {
            id: 1,
            key_code: "ABC123".to_string(),
            allowed_uses: allowed,
            uses,
            hwid: hwid.map(ToString::to_string),
            hwid_locked: locked,
            expiry: None,
            banned: false,
            user_id: None,
        }
    }

    #[test]
    fn test_banned_wins_first() {
        let mut l = license(1, 1, Some("other"), true);
        l.banned = true;
        let now = Utc::now();
        // banned outranks both exhaustion and the identity mismatch
        assert_eq!(evaluate(&l, None, "me", now), Err(Rejection::Banned));
    }

    #[test]
    fn test_expired_before_exhausted() {
        let l = license(1, 1, None, true);
        let now = Utc::now();
        assert_eq!(
            evaluate(&l, Some(now - Duration::hours(1)), "me", now),
            Err(Rejection::Expired)
        );
    }

    #[test]
    fn test_exhausted_before_identity() {
        // uses at cap rejects even for the bound identity
        let l = license(1, 1, Some("a@x.com"), true);
        let now = Utc::now();
        assert_eq!(
            evaluate(&l, None, "a@x.com", now),
            Err(Rejection::Exhausted)
        );
    }

    #[test]
    fn test_zero_allowed_never_exhausts() {
        let l = license(0, 10_000, Some("a@x.com"), true);
        let now = Utc::now();
        assert_eq!(
            evaluate(&l, None, "a@x.com", now),
            Ok(BindingDecision::AlreadyBound)
        );
    }

    #[test]
    fn test_one_use_left_passes() {
        let l = license(3, 2, None, true);
        let now = Utc::now();
        assert_eq!(evaluate(&l, None, "me", now), Ok(BindingDecision::NeedsBind));
    }

    #[test]
    fn test_mismatch_rejects() {
        let l = license(0, 0, Some("a@x.com"), true);
        let now = Utc::now();
        assert_eq!(
            evaluate(&l, None, "b@x.com", now),
            Err(Rejection::IdentityMismatch)
        );
    }

    #[test]
    fn test_view_projection() {
        let l = license(3, 1, Some("a@x.com"), true);
        let now = Utc::now();
        let view = LicenseView::project(&l, Some(now + Duration::days(2)), now);
        assert_eq!(view.usage, "1/3");
        assert_eq!(view.identity.as_deref(), Some("a@x.com"));
        assert!(matches!(view.expiry, ExpiryView::Valid { .. }));
    }
}
