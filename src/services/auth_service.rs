//! Domain service for account registration and login.
//!
//! Credential verification is consumed as a boolean fact from the user
//! repository; license entitlement decisions are delegated to the
//! [`LicenseService`](crate::services::LicenseService).

use serde::Serialize;
use thiserror::Error;

use crate::services::license_service::{LicenseView, Rejection};

#[derive(Debug, Error)]
pub enum AuthError {
    /// The presented license key was rejected.
    #[error("{}", .0.message())]
    License(Rejection),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("User is banned")]
    UserBanned,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Successful registration: the new account plus the license it redeemed.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterResult {
    pub user_id: i32,
    pub username: String,
    pub license: LicenseView,
    pub register_ip: Option<String>,
}

/// Successful login with the user's newest license, when one is linked.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user_id: i32,
    pub username: String,
    pub last_login_at: String,
    pub last_login_ip: Option<String>,
    pub license: Option<LicenseView>,
}

/// Domain service trait for account flows.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account by redeeming a license key. The key is fully
    /// validated before the user row is created; the redeem itself commits
    /// the binding, owner link, and use increment atomically.
    async fn register(
        &self,
        username: &str,
        password: &str,
        key: &str,
        hwid: &str,
        ip: Option<&str>,
    ) -> Result<RegisterResult, AuthError>;

    /// Verifies credentials, rejects banned users and dead licenses, and
    /// stamps the last-login info.
    async fn login(
        &self,
        username: &str,
        password: &str,
        ip: Option<&str>,
    ) -> Result<LoginResult, AuthError>;
}
