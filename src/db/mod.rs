use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use crate::entities::licenses::Model as License;
pub use repositories::license::NewLicense;
pub use repositories::user::{CreateUserError, User};

use crate::config::SecurityConfig;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn license_repo(&self) -> repositories::license::LicenseRepository {
        repositories::license::LicenseRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ------------------------------------------------------------------
    // Licenses
    // ------------------------------------------------------------------

    pub async fn get_license_by_key(&self, key: &str) -> Result<Option<License>> {
        self.license_repo().get_by_key(key).await
    }

    pub async fn get_license_by_id(&self, id: i32) -> Result<Option<License>> {
        self.license_repo().get_by_id(id).await
    }

    pub async fn get_newest_license_for_user(&self, user_id: i32) -> Result<Option<License>> {
        self.license_repo().get_newest_by_owner(user_id).await
    }

    pub async fn list_licenses(&self) -> Result<Vec<License>> {
        self.license_repo().list_all().await
    }

    pub async fn insert_license(
        &self,
        new: NewLicense,
    ) -> std::result::Result<License, sea_orm::DbErr> {
        self.license_repo().insert(new).await
    }

    pub async fn conditional_bind(&self, license_id: i32, identity: &str) -> Result<bool> {
        self.license_repo().conditional_bind(license_id, identity).await
    }

    pub async fn redeem_license(
        &self,
        license_id: i32,
        identity: &str,
        user_id: i32,
    ) -> Result<bool> {
        self.license_repo().redeem(license_id, identity, user_id).await
    }

    pub async fn set_license_banned(&self, key: &str, banned: bool) -> Result<u64> {
        self.license_repo().set_banned(key, banned).await
    }

    pub async fn delete_license(&self, key: &str) -> Result<u64> {
        self.license_repo().delete_by_key(key).await
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        register_ip: Option<&str>,
        config: &SecurityConfig,
    ) -> std::result::Result<User, CreateUserError> {
        self.user_repo()
            .create(username, password, register_ip, config)
            .await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn touch_last_login(&self, user_id: i32, ip: Option<&str>) -> Result<()> {
        self.user_repo().touch_last_login(user_id, ip).await
    }

    pub async fn set_user_banned_cascade(&self, user_id: i32, banned: bool) -> Result<u64> {
        self.user_repo().set_banned_cascade(user_id, banned).await
    }

    pub async fn delete_user_cascade(&self, user_id: i32) -> Result<u64> {
        self.user_repo().delete_cascade(user_id).await
    }
}
