use axum::{Json, extract::State};
use std::sync::Arc;

use super::validation::require_fields;
use super::{ApiError, AppState};
use crate::api::types::{CheckLicenseRequest, CheckLicenseResponse};
use crate::services::Verdict;

/// POST /api/license/check
/// Runtime validation: ordered checks plus the first-use binding. Never
/// increments the use counter. Rejections come back as `valid: false` with
/// a distinguishable reason, not as HTTP errors.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckLicenseRequest>,
) -> Result<Json<CheckLicenseResponse>, ApiError> {
    require_fields(&[
        ("key", payload.key.as_deref()),
        ("identity", payload.identity.as_deref()),
    ])?;

    let key = payload.key.as_deref().unwrap_or_default();
    let identity = payload.identity.as_deref().unwrap_or_default();

    let response = match state.license_service().validate(key, identity).await? {
        Verdict::Valid(license) => CheckLicenseResponse {
            valid: true,
            reason: None,
            license: Some(license),
        },
        Verdict::Rejected(rejection) => CheckLicenseResponse {
            valid: false,
            reason: Some(rejection),
            license: None,
        },
    };

    Ok(Json(response))
}
