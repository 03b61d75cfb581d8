//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::{CreateUserError, Store};
use crate::services::auth_service::{AuthError, AuthService, LoginResult, RegisterResult};
use crate::services::expiry::{self, ExpiryState};
use crate::services::license_service::{
    LicenseError, LicenseService, LicenseView, Rejection, Verdict,
};

pub struct SeaOrmAuthService {
    store: Store,
    license_service: Arc<dyn LicenseService>,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        license_service: Arc<dyn LicenseService>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            license_service,
            security,
        }
    }
}

impl From<LicenseError> for AuthError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::Conflict(msg) => Self::Conflict(msg),
            LicenseError::Database(msg) => Self::Database(msg),
            LicenseError::Internal(msg) => Self::Internal(msg),
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        username: &str,
        password: &str,
        key: &str,
        hwid: &str,
        ip: Option<&str>,
    ) -> Result<RegisterResult, AuthError> {
        let username = username.trim();

        // Reject dead keys before any user row exists. The redeem below is
        // still the authoritative check; this only keeps failed signups from
        // consuming usernames.
        if let Verdict::Rejected(rejection) = self.license_service.precheck(key, hwid).await? {
            return Err(AuthError::License(rejection));
        }

        if self.store.get_user_by_username(username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }

        let user = match self
            .store
            .create_user(username, password, ip, &self.security)
            .await
        {
            Ok(user) => user,
            Err(CreateUserError::Db(err)) => {
                // Two concurrent signups can both pass the read check; the
                // unique column decides.
                return match err.sql_err() {
                    Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                        Err(AuthError::DuplicateUsername)
                    }
                    _ => Err(err.into()),
                };
            }
            Err(CreateUserError::Internal(err)) => {
                return Err(AuthError::Internal(err.to_string()));
            }
        };

        let verdict = match self.license_service.redeem(key, hwid, user.id).await {
            Ok(verdict) => verdict,
            Err(err) => {
                self.discard_user(user.id).await;
                return Err(err.into());
            }
        };

        match verdict {
            Verdict::Valid(license) => {
                info!("Registered user {username} with license {}", license.key);
                Ok(RegisterResult {
                    user_id: user.id,
                    username: user.username,
                    license,
                    register_ip: ip.map(ToString::to_string),
                })
            }
            Verdict::Rejected(rejection) => {
                // The key was raced away between precheck and redeem; take
                // the half-created account back out.
                self.discard_user(user.id).await;
                Err(AuthError::License(rejection))
            }
        }
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
        ip: Option<&str>,
    ) -> Result<LoginResult, AuthError> {
        let username = username.trim();

        let Some(user) = self.store.get_user_by_username(username).await? else {
            return Err(AuthError::UserNotFound);
        };

        if user.banned {
            return Err(AuthError::UserBanned);
        }

        if !self.store.verify_user_password(username, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let license = match self.store.get_newest_license_for_user(user.id).await? {
            None => None,
            Some(license) => {
                let expiry = expiry::parse_stored(license.expiry.as_deref()).map_err(|e| {
                    AuthError::Internal(format!(
                        "Corrupt expiry on license {}: {e}",
                        license.key_code
                    ))
                })?;

                if license.banned {
                    return Err(AuthError::License(Rejection::Banned));
                }
                if expiry::classify(expiry, now) == ExpiryState::Expired {
                    return Err(AuthError::License(Rejection::Expired));
                }

                Some(LicenseView::project(&license, expiry, now))
            }
        };

        self.store.touch_last_login(user.id, ip).await?;

        Ok(LoginResult {
            user_id: user.id,
            username: user.username,
            last_login_at: now.to_rfc3339(),
            last_login_ip: ip.map(ToString::to_string),
            license,
        })
    }
}

impl SeaOrmAuthService {
    /// Best-effort compensation when a redeem loses after the user row was
    /// created. The account never became usable, so losing the delete only
    /// leaves a licenseless row behind.
    async fn discard_user(&self, user_id: i32) {
        if let Err(err) = self.store.delete_user_cascade(user_id).await {
            warn!("Failed to discard user {user_id} after lost redeem: {err}");
        }
    }
}
