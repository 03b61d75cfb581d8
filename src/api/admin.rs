use axum::{Json, extract::State, http::HeaderMap};
use std::sync::Arc;

use super::validation::validate_allowed_uses;
use super::{ApiError, AppState};
use crate::api::types::AdminRequest;
use crate::parser::parse_duration;
use crate::services::{AdminAction, MutationResult};

/// POST /api/admin
/// Token-gated dispatch for administrative mutations. The capability check
/// happens here; the dispatcher itself never sees the secret.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AdminRequest>,
) -> Result<Json<MutationResult>, ApiError> {
    authorize(&state, &headers).await?;

    let action = parse_action(&payload)?;
    let result = state.admin_service().apply(action).await?;

    Ok(Json(result))
}

async fn authorize(state: &Arc<AppState>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.config().await.admin.token else {
        return Err(ApiError::forbidden("Admin API disabled"));
    };

    let presented = headers
        .get("X-Admin-Token")
        .and_then(|v| v.to_str().ok());

    if presented == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Invalid admin token"))
    }
}

fn parse_action(payload: &AdminRequest) -> Result<AdminAction, ApiError> {
    let user_id = || {
        payload
            .user_id
            .ok_or_else(|| ApiError::validation("Missing field: user_id"))
    };
    let license_key = || {
        payload
            .license_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ApiError::validation("Missing field: license_key"))
    };

    let action = match payload.action.as_str() {
        "generate" => {
            let allowed_uses = validate_allowed_uses(payload.allowed_uses.unwrap_or(1))?;
            let duration = parse_duration(payload.duration.as_deref().unwrap_or_default())
                .map_err(|e| ApiError::validation(e.to_string()))?;
            AdminAction::Generate {
                allowed_uses,
                duration,
            }
        }
        "ban_user" => AdminAction::BanUser(user_id()?),
        "unban_user" => AdminAction::UnbanUser(user_id()?),
        "delete_user" => AdminAction::DeleteUser(user_id()?),
        "ban_key" => AdminAction::BanKey(license_key()?),
        "unban_key" => AdminAction::UnbanKey(license_key()?),
        "delete_key" => AdminAction::DeleteKey(license_key()?),
        "list" | "none" => AdminAction::List,
        other => {
            return Err(ApiError::validation(format!("Unknown action '{other}'")));
        }
    };

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(action: &str) -> AdminRequest {
        AdminRequest {
            action: action.to_string(),
            user_id: None,
            license_key: None,
            allowed_uses: None,
            duration: None,
        }
    }

    #[test]
    fn test_generate_defaults() {
        let action = parse_action(&request("generate")).unwrap();
        assert_eq!(
            action,
            AdminAction::Generate {
                allowed_uses: 1,
                duration: None
            }
        );
    }

    #[test]
    fn test_generate_rejects_bad_duration() {
        let mut req = request("generate");
        req.duration = Some("2 weeks".to_string());
        assert!(parse_action(&req).is_err());
    }

    #[test]
    fn test_user_actions_need_user_id() {
        assert!(parse_action(&request("ban_user")).is_err());

        let mut req = request("ban_user");
        req.user_id = Some(3);
        assert_eq!(parse_action(&req).unwrap(), AdminAction::BanUser(3));
    }

    #[test]
    fn test_key_actions_need_key() {
        assert!(parse_action(&request("delete_key")).is_err());

        let mut req = request("delete_key");
        req.license_key = Some("ABC123".to_string());
        assert_eq!(
            parse_action(&req).unwrap(),
            AdminAction::DeleteKey("ABC123".to_string())
        );
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(parse_action(&request("drop_tables")).is_err());
    }

    #[test]
    fn test_list_aliases() {
        assert_eq!(parse_action(&request("list")).unwrap(), AdminAction::List);
        assert_eq!(parse_action(&request("none")).unwrap(), AdminAction::List);
    }
}
