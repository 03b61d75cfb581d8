//! Domain service for administrative mutations on users and licenses.
//!
//! Authorization is a capability check owned by the HTTP layer; the
//! dispatcher never sees or stores the admin secret.

use serde::Serialize;
use thiserror::Error;

use crate::services::license_service::ExpiryView;

/// One administrative mutation. A total match over this enum replaces any
/// string-sniffing dispatch, so adding an action is a compile-time-checked
/// change everywhere it is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    Generate {
        allowed_uses: i32,
        /// None = lifetime.
        duration: Option<chrono::Duration>,
    },
    BanUser(i32),
    UnbanUser(i32),
    DeleteUser(i32),
    BanKey(String),
    UnbanKey(String),
    DeleteKey(String),
    /// No mutation; refresh both projections.
    List,
}

/// User table projection, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub banned: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
    pub last_login_ip: Option<String>,
}

/// Owning user summary embedded in a license row.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerRef {
    pub id: i32,
    pub username: String,
}

/// License table projection, newest first, with the owner resolved.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseRow {
    pub id: i32,
    pub key: String,
    pub allowed_uses: i32,
    pub uses: i32,
    pub identity: Option<String>,
    pub hwid_locked: bool,
    pub expiry: ExpiryView,
    pub banned: bool,
    /// None when the license is unlinked.
    pub owner: Option<OwnerRef>,
}

/// Every mutation returns a refreshed projection of both tables for the
/// caller to render.
#[derive(Debug, Clone, Serialize)]
pub struct MutationResult {
    pub message: String,
    pub users: Vec<UserRow>,
    pub licenses: Vec<LicenseRow>,
}

#[derive(Debug, Error)]
pub enum AdminError {
    /// The mutation matched nothing; reported explicitly, never as a
    /// generic success.
    #[error("Nothing matched: {0}")]
    NothingMatched(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AdminError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Domain service trait for admin mutations.
#[async_trait::async_trait]
pub trait AdminService: Send + Sync {
    /// Applies one action and returns the refreshed projections.
    async fn apply(&self, action: AdminAction) -> Result<MutationResult, AdminError>;
}
