//! Expiry classification for license validity windows.

use chrono::{DateTime, Duration, Utc};

/// Where a license sits relative to its expiry timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryState {
    /// No expiry recorded.
    Lifetime,
    Expired,
    /// Still valid, with the exact remaining window. Presentation formatting
    /// ("in 5 days") is the caller's concern.
    Remaining(Duration),
}

impl ExpiryState {
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Classifies an optional expiry against `now`. The boundary is exclusive:
/// a license whose expiry equals `now` is already expired.
#[must_use]
pub fn classify(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ExpiryState {
    match expiry {
        None => ExpiryState::Lifetime,
        Some(at) if at <= now => ExpiryState::Expired,
        Some(at) => ExpiryState::Remaining(at - now),
    }
}

/// Parses a stored RFC 3339 expiry column value.
pub fn parse_stored(
    expiry: Option<&str>,
) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
    expiry
        .map(|s| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_lifetime() {
        assert_eq!(classify(None, Utc::now()), ExpiryState::Lifetime);
    }

    #[test]
    fn test_past_is_expired() {
        let now = Utc::now();
        assert_eq!(
            classify(Some(now - Duration::seconds(1)), now),
            ExpiryState::Expired
        );
    }

    #[test]
    fn test_exactly_now_is_expired() {
        let now = Utc::now();
        assert_eq!(classify(Some(now), now), ExpiryState::Expired);
    }

    #[test]
    fn test_future_returns_exact_remaining() {
        let now = Utc::now();
        let state = classify(Some(now + Duration::days(2)), now);
        assert_eq!(state, ExpiryState::Remaining(Duration::days(2)));
    }

    #[test]
    fn test_parse_stored_round_trip() {
        let now = Utc::now();
        let stored = now.to_rfc3339();
        let parsed = parse_stored(Some(&stored)).unwrap().unwrap();
        assert_eq!(parsed, now);
    }

    #[test]
    fn test_parse_stored_none() {
        assert_eq!(parse_stored(None).unwrap(), None);
    }

    #[test]
    fn test_parse_stored_garbage_fails() {
        assert!(parse_stored(Some("next tuesday")).is_err());
    }
}
