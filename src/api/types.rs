use serde::{Deserialize, Serialize};

use crate::services::{LicenseView, Rejection};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Fields arrive as options so missing ones can be enumerated in a single
/// error instead of failing on the first.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub key: Option<String>,
    pub hwid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckLicenseRequest {
    pub key: Option<String>,
    pub identity: Option<String>,
}

/// The stable check-license contract: no envelope, `valid` plus either a
/// distinguishable reason or the license view.
#[derive(Debug, Serialize)]
pub struct CheckLicenseResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseView>,
}

#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    pub action: String,
    pub user_id: Option<i32>,
    pub license_key: Option<String>,
    pub allowed_uses: Option<i32>,
    /// Compact duration spec ("30m", "2d", "1y"); empty or "0" = lifetime.
    pub duration: Option<String>,
}
