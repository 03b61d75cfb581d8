//! `SeaORM` implementation of the `AdminService` trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::db::{NewLicense, Store};
use crate::services::admin_service::{
    AdminAction, AdminError, AdminService, LicenseRow, MutationResult, OwnerRef, UserRow,
};
use crate::services::expiry;
use crate::services::keygen::generate_key;

/// Attempts before a generate gives up on finding an unused key. With a
/// 15-byte random key this only triggers on a broken RNG.
const KEY_INSERT_ATTEMPTS: u32 = 5;

pub struct SeaOrmAdminService {
    store: Store,
}

impl SeaOrmAdminService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn generate(
        &self,
        allowed_uses: i32,
        duration: Option<chrono::Duration>,
    ) -> Result<String, AdminError> {
        if allowed_uses < 0 {
            return Err(AdminError::InvalidInput(
                "allowed_uses must be zero or positive".to_string(),
            ));
        }

        let expiry = duration.map(|d| (Utc::now() + d).to_rfc3339());

        for _ in 0..KEY_INSERT_ATTEMPTS {
            let key = generate_key();
            let new = NewLicense {
                key_code: key.clone(),
                allowed_uses,
                // Generated keys are always identity-locked.
                hwid_locked: true,
                expiry: expiry.clone(),
            };

            match self.store.insert_license(new).await {
                Ok(license) => {
                    info!("Generated license {}", license.key_code);
                    return Ok(license.key_code);
                }
                Err(err) => match err.sql_err() {
                    // Key collision: constraint violation at insert time,
                    // retried with a fresh value.
                    Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => continue,
                    _ => return Err(err.into()),
                },
            }
        }

        Err(AdminError::Conflict(
            "Could not generate a unique license key".to_string(),
        ))
    }

    /// Re-reads both tables newest-first and resolves each license's owner.
    async fn projections(&self) -> Result<(Vec<UserRow>, Vec<LicenseRow>), AdminError> {
        let now = Utc::now();

        let users = self.store.list_users().await?;
        let licenses = self.store.list_licenses().await?;

        let usernames: HashMap<i32, String> = users
            .iter()
            .map(|u| (u.id, u.username.clone()))
            .collect();

        let user_rows = users
            .into_iter()
            .map(|u| UserRow {
                id: u.id,
                username: u.username,
                banned: u.banned,
                created_at: u.created_at,
                last_login_at: u.last_login_at,
                last_login_ip: u.last_login_ip,
            })
            .collect();

        let license_rows = licenses
            .into_iter()
            .map(|l| {
                let expiry = expiry::parse_stored(l.expiry.as_deref()).map_err(|e| {
                    AdminError::Internal(format!("Corrupt expiry on license {}: {e}", l.key_code))
                })?;
                let owner = l.user_id.and_then(|id| {
                    usernames.get(&id).map(|username| OwnerRef {
                        id,
                        username: username.clone(),
                    })
                });

                Ok(LicenseRow {
                    id: l.id,
                    key: l.key_code,
                    allowed_uses: l.allowed_uses,
                    uses: l.uses,
                    identity: l.hwid,
                    hwid_locked: l.hwid_locked,
                    expiry: expiry::classify(expiry, now).into(),
                    banned: l.banned,
                    owner,
                })
            })
            .collect::<Result<Vec<_>, AdminError>>()?;

        Ok((user_rows, license_rows))
    }

    async fn result(&self, message: String) -> Result<MutationResult, AdminError> {
        let (users, licenses) = self.projections().await?;
        Ok(MutationResult {
            message,
            users,
            licenses,
        })
    }
}

#[async_trait]
impl AdminService for SeaOrmAdminService {
    async fn apply(&self, action: AdminAction) -> Result<MutationResult, AdminError> {
        let message = match action {
            AdminAction::Generate {
                allowed_uses,
                duration,
            } => {
                let key = self.generate(allowed_uses, duration).await?;
                format!("Generated license {key}")
            }
            AdminAction::BanUser(id) | AdminAction::UnbanUser(id) => {
                let banned = matches!(action, AdminAction::BanUser(_));
                let matched = self.store.set_user_banned_cascade(id, banned).await?;
                if matched == 0 {
                    return Err(AdminError::NothingMatched(format!("no user with id {id}")));
                }
                info!("User {id} {}", if banned { "banned" } else { "unbanned" });
                format!(
                    "User {id} {} (licenses updated)",
                    if banned { "banned" } else { "unbanned" }
                )
            }
            AdminAction::DeleteUser(id) => {
                let matched = self.store.delete_user_cascade(id).await?;
                if matched == 0 {
                    return Err(AdminError::NothingMatched(format!("no user with id {id}")));
                }
                info!("User {id} deleted with owned licenses");
                format!("User {id} deleted with owned licenses")
            }
            AdminAction::BanKey(ref key) | AdminAction::UnbanKey(ref key) => {
                let banned = matches!(action, AdminAction::BanKey(_));
                let key = key.trim().to_uppercase();
                let matched = self.store.set_license_banned(&key, banned).await?;
                if matched == 0 {
                    return Err(AdminError::NothingMatched(format!("no license {key}")));
                }
                info!("License {key} {}", if banned { "banned" } else { "unbanned" });
                format!("License {key} {}", if banned { "banned" } else { "unbanned" })
            }
            AdminAction::DeleteKey(ref key) => {
                let key = key.trim().to_uppercase();
                let matched = self.store.delete_license(&key).await?;
                if matched == 0 {
                    return Err(AdminError::NothingMatched(format!("no license {key}")));
                }
                info!("License {key} deleted");
                format!("License {key} deleted")
            }
            AdminAction::List => "OK".to_string(),
        };

        self.result(message).await
    }
}
