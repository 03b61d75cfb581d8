use super::ApiError;

/// Collects the names of required fields that are missing or blank and
/// reports them all at once, e.g. `Missing fields: username, key`.
pub fn require_fields(fields: &[(&str, Option<&str>)]) -> Result<(), ApiError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let plural = if missing.len() > 1 { "s" } else { "" };
    Err(ApiError::validation(format!(
        "Missing field{plural}: {}",
        missing.join(", ")
    )))
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Username cannot be empty"));
    }

    if trimmed.len() > 64 {
        return Err(ApiError::validation(
            "Username must be 64 characters or less",
        ));
    }

    Ok(trimmed)
}

pub fn validate_allowed_uses(allowed_uses: i32) -> Result<i32, ApiError> {
    if allowed_uses < 0 {
        return Err(ApiError::validation(format!(
            "Invalid allowed_uses: {}. Must be zero (unlimited) or positive",
            allowed_uses
        )));
    }
    Ok(allowed_uses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_fields_all_present() {
        assert!(require_fields(&[("a", Some("x")), ("b", Some("y"))]).is_ok());
    }

    #[test]
    fn test_require_fields_enumerates_missing() {
        let err = require_fields(&[
            ("username", None),
            ("password", Some("pw")),
            ("key", Some("  ")),
        ])
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Missing fields"));
        assert!(message.contains("username"));
        assert!(message.contains("key"));
        assert!(!message.contains("password,"));
    }

    #[test]
    fn test_require_fields_singular() {
        let err = require_fields(&[("key", None)]).unwrap_err();
        assert!(err.to_string().contains("Missing field: key"));
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("  bob  ").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_allowed_uses() {
        assert!(validate_allowed_uses(0).is_ok());
        assert!(validate_allowed_uses(5).is_ok());
        assert!(validate_allowed_uses(-1).is_err());
    }
}
