use axum::{Json, extract::State, http::HeaderMap};
use std::sync::Arc;

use super::validation::{require_fields, validate_username};
use super::{ApiError, ApiResponse, AppState};
use crate::api::types::{LoginRequest, RegisterRequest};
use crate::services::{LoginResult, RegisterResult};

/// Client address as reported by a fronting proxy.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /api/register
/// Creates an account by redeeming a license key.
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<RegisterResult>>, ApiError> {
    require_fields(&[
        ("username", payload.username.as_deref()),
        ("password", payload.password.as_deref()),
        ("key", payload.key.as_deref()),
        ("hwid", payload.hwid.as_deref()),
    ])?;

    let username = validate_username(payload.username.as_deref().unwrap_or_default())?;
    let password = payload.password.as_deref().unwrap_or_default();
    let key = payload.key.as_deref().unwrap_or_default();
    let hwid = payload.hwid.as_deref().unwrap_or_default();
    let ip = client_ip(&headers);

    let result = state
        .auth_service()
        .register(username, password, key, hwid, ip.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/login
/// Verifies credentials and returns the account's newest license.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    require_fields(&[
        ("username", payload.username.as_deref()),
        ("password", payload.password.as_deref()),
    ])?;

    let username = payload.username.as_deref().unwrap_or_default();
    let password = payload.password.as_deref().unwrap_or_default();
    let ip = client_ip(&headers);

    let result = state
        .auth_service()
        .login(username, password, ip.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(result)))
}
