use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid duration '{0}': expected <number><unit> with unit one of s, m, h, d, y")]
pub struct DurationParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Years,
}

impl Unit {
    const fn seconds(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3600,
            Self::Days => 86_400,
            Self::Years => 365 * 86_400,
        }
    }
}

/// Parses a compact duration spec into a validity window.
///
/// `""` and `"0"` mean lifetime (`None`). Everything else must fully match
/// `<number><unit>` with unit `s`/`m`/`h`/`d`/`y`; a spec that does not
/// match is an error, never silently treated as lifetime.
pub fn parse_duration(spec: &str) -> Result<Option<chrono::Duration>, DurationParseError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)^(\d+)\s*([smhdy])$").expect("Invalid regex"));

    let spec = spec.trim();
    if spec.is_empty() || spec == "0" {
        return Ok(None);
    }

    let caps = re
        .captures(spec)
        .ok_or_else(|| DurationParseError(spec.to_string()))?;

    let value: i64 = caps[1]
        .parse()
        .map_err(|_| DurationParseError(spec.to_string()))?;

    let unit = match caps[2].to_ascii_lowercase().as_str() {
        "s" => Unit::Seconds,
        "m" => Unit::Minutes,
        "h" => Unit::Hours,
        "d" => Unit::Days,
        "y" => Unit::Years,
        _ => unreachable!("regex restricts the unit character"),
    };

    value
        .checked_mul(unit.seconds())
        .map(chrono::Duration::seconds)
        .map(Some)
        .ok_or_else(|| DurationParseError(spec.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(
            parse_duration("30s"),
            Ok(Some(chrono::Duration::seconds(30)))
        );
        assert_eq!(parse_duration("5m"), Ok(Some(chrono::Duration::minutes(5))));
        assert_eq!(parse_duration("12h"), Ok(Some(chrono::Duration::hours(12))));
        assert_eq!(parse_duration("2d"), Ok(Some(chrono::Duration::days(2))));
        assert_eq!(parse_duration("1y"), Ok(Some(chrono::Duration::days(365))));
    }

    #[test]
    fn test_lifetime_specs() {
        assert_eq!(parse_duration(""), Ok(None));
        assert_eq!(parse_duration("0"), Ok(None));
        assert_eq!(parse_duration("  0  "), Ok(None));
    }

    #[test]
    fn test_case_and_whitespace() {
        assert_eq!(parse_duration("2D"), Ok(Some(chrono::Duration::days(2))));
        assert_eq!(
            parse_duration(" 10 m "),
            Ok(Some(chrono::Duration::minutes(10)))
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_duration("2 weeks").is_err());
        assert!(parse_duration("d2").is_err());
        assert!(parse_duration("2dd").is_err());
        assert!(parse_duration("-5m").is_err());
        assert!(parse_duration("1.5h").is_err());
        assert!(parse_duration("forever").is_err());
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(parse_duration("99999999999999999999y").is_err());
    }
}
