use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{licenses, users};

/// User data returned from the repository (without the password hash).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub banned: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
    pub last_login_ip: Option<String>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            banned: model.banned,
            created_at: model.created_at,
            last_login_at: model.last_login_at,
            last_login_ip: model.last_login_ip,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let rows = users::Entity::find()
            .order_by_desc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Creates a user, hashing the password with Argon2id.
    /// Surfaces the raw `DbErr` so the caller can detect a duplicate
    /// username via the unique constraint.
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        register_ip: Option<&str>,
        config: &SecurityConfig,
    ) -> std::result::Result<User, CreateUserError> {
        let password = password.to_string();
        let config = config.clone();

        // Argon2 is CPU-bound; keep it off the async runtime.
        let password_hash = task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .map_err(|e| CreateUserError::Internal(anyhow::anyhow!("Hashing task panicked: {e}")))?
            .map_err(CreateUserError::Internal)?;

        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            banned: Set(false),
            created_at: Set(now),
            last_login_at: Set(None),
            last_login_ip: Set(register_ip.map(ToString::to_string)),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await.map_err(CreateUserError::Db)?;

        Ok(User::from(model))
    }

    /// Verify a password for a user.
    /// Note: this uses `spawn_blocking` because Argon2 verification is
    /// CPU-intensive and would block the async runtime if run directly.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    /// Stamps the last successful login.
    pub async fn touch_last_login(&self, id: i32, ip: Option<&str>) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        users::Entity::update_many()
            .col_expr(users::Column::LastLoginAt, Expr::value(Some(now)))
            .col_expr(
                users::Column::LastLoginIp,
                Expr::value(ip.map(ToString::to_string)),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update last login")?;

        Ok(())
    }

    /// Sets the user's ban flag and cascades it to every owned license in
    /// one transaction, so a concurrent read never observes the user and
    /// its licenses disagreeing. Returns the number of users matched.
    pub async fn set_banned_cascade(&self, id: i32, banned: bool) -> Result<u64> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to open ban-cascade transaction")?;

        let result = users::Entity::update_many()
            .col_expr(users::Column::Banned, Expr::value(banned))
            .filter(users::Column::Id.eq(id))
            .exec(&txn)
            .await
            .context("Failed to update user ban flag")?;

        if result.rows_affected > 0 {
            licenses::Entity::update_many()
                .col_expr(licenses::Column::Banned, Expr::value(banned))
                .filter(licenses::Column::UserId.eq(id))
                .exec(&txn)
                .await
                .context("Failed to cascade ban flag to licenses")?;
        }

        txn.commit()
            .await
            .context("Failed to commit ban-cascade transaction")?;

        Ok(result.rows_affected)
    }

    /// Deletes the user and every owned license, children first, in one
    /// transaction. Returns the number of users matched.
    pub async fn delete_cascade(&self, id: i32) -> Result<u64> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to open delete-cascade transaction")?;

        licenses::Entity::delete_many()
            .filter(licenses::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete owned licenses")?;

        let result = users::Entity::delete_many()
            .filter(users::Column::Id.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete user")?;

        txn.commit()
            .await
            .context("Failed to commit delete-cascade transaction")?;

        Ok(result.rows_affected)
    }
}

/// Insert errors split so callers can map a unique-constraint violation to
/// a duplicate-username conflict without string matching.
#[derive(Debug)]
pub enum CreateUserError {
    Db(sea_orm::DbErr),
    Internal(anyhow::Error),
}

/// Hash a password using Argon2id with params from the security config.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
