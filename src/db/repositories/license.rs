use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::licenses;

/// Fields for a freshly generated license. The key is inserted verbatim,
/// so callers must have normalized it to uppercase already.
#[derive(Debug, Clone)]
pub struct NewLicense {
    pub key_code: String,
    pub allowed_uses: i32,
    pub hwid_locked: bool,
    pub expiry: Option<String>,
}

pub struct LicenseRepository {
    conn: DatabaseConnection,
}

impl LicenseRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_key(&self, key: &str) -> Result<Option<licenses::Model>> {
        let license = licenses::Entity::find()
            .filter(licenses::Column::KeyCode.eq(key))
            .one(&self.conn)
            .await
            .context("Failed to query license by key")?;

        Ok(license)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<licenses::Model>> {
        let license = licenses::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query license by id")?;

        Ok(license)
    }

    /// Newest license owned by a user, if any.
    pub async fn get_newest_by_owner(&self, user_id: i32) -> Result<Option<licenses::Model>> {
        let license = licenses::Entity::find()
            .filter(licenses::Column::UserId.eq(user_id))
            .order_by_desc(licenses::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query newest license for user")?;

        Ok(license)
    }

    pub async fn list_all(&self) -> Result<Vec<licenses::Model>> {
        let rows = licenses::Entity::find()
            .order_by_desc(licenses::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list licenses")?;

        Ok(rows)
    }

    /// Inserts a new license row. Surfaces the raw `DbErr` so the caller can
    /// detect a unique-key collision and retry with a fresh key.
    pub async fn insert(&self, new: NewLicense) -> std::result::Result<licenses::Model, sea_orm::DbErr> {
        let active = licenses::ActiveModel {
            key_code: Set(new.key_code),
            allowed_uses: Set(new.allowed_uses),
            uses: Set(0),
            hwid: Set(None),
            hwid_locked: Set(new.hwid_locked),
            expiry: Set(new.expiry),
            banned: Set(false),
            user_id: Set(None),
            ..Default::default()
        };

        active.insert(&self.conn).await
    }

    /// First-use binding: sets `hwid` only if it is still null. The null
    /// check lives in the WHERE clause, so of N racing callers exactly one
    /// write applies; the others see `false` and must re-read.
    pub async fn conditional_bind(&self, id: i32, identity: &str) -> Result<bool> {
        let result = licenses::Entity::update_many()
            .col_expr(licenses::Column::Hwid, Expr::value(identity))
            .filter(licenses::Column::Id.eq(id))
            .filter(licenses::Column::Hwid.is_null())
            .exec(&self.conn)
            .await
            .context("Failed to bind license identity")?;

        Ok(result.rows_affected > 0)
    }

    /// Registration commit: binds the identity, assigns the owner, and
    /// increments the use counter as one guarded update. The WHERE clause
    /// re-checks the binding and exhaustion preconditions, so a concurrent
    /// redeem against a limited-use key can never lose an increment or
    /// overwrite a foreign binding. `IFNULL` keeps an existing binding in
    /// place; the identity guard is waived for unlocked licenses.
    pub async fn redeem(&self, id: i32, identity: &str, user_id: i32) -> Result<bool> {
        let result = licenses::Entity::update_many()
            .col_expr(
                licenses::Column::Hwid,
                Expr::col(licenses::Column::Hwid).if_null(identity),
            )
            .col_expr(licenses::Column::UserId, Expr::value(user_id))
            .col_expr(
                licenses::Column::Uses,
                Expr::col(licenses::Column::Uses).add(1),
            )
            .filter(licenses::Column::Id.eq(id))
            .filter(licenses::Column::Banned.eq(false))
            .filter(
                Condition::any()
                    .add(licenses::Column::Hwid.is_null())
                    .add(licenses::Column::Hwid.eq(identity))
                    .add(licenses::Column::HwidLocked.eq(false)),
            )
            .filter(
                Condition::any()
                    .add(licenses::Column::AllowedUses.eq(0))
                    .add(
                        Expr::col(licenses::Column::Uses)
                            .lt(Expr::col(licenses::Column::AllowedUses)),
                    ),
            )
            .exec(&self.conn)
            .await
            .context("Failed to redeem license")?;

        Ok(result.rows_affected > 0)
    }

    /// Returns the number of rows matched (0 = no such key).
    pub async fn set_banned(&self, key: &str, banned: bool) -> Result<u64> {
        let result = licenses::Entity::update_many()
            .col_expr(licenses::Column::Banned, Expr::value(banned))
            .filter(licenses::Column::KeyCode.eq(key))
            .exec(&self.conn)
            .await
            .context("Failed to update license ban flag")?;

        Ok(result.rows_affected)
    }

    pub async fn delete_by_key(&self, key: &str) -> Result<u64> {
        let result = licenses::Entity::delete_many()
            .filter(licenses::Column::KeyCode.eq(key))
            .exec(&self.conn)
            .await
            .context("Failed to delete license")?;

        Ok(result.rows_affected)
    }
}
