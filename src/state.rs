use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AdminService, AuthService, LicenseService, SeaOrmAdminService, SeaOrmAuthService,
    SeaOrmLicenseService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub license_service: Arc<dyn LicenseService>,

    pub admin_service: Arc<dyn AdminService>,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let license_service = Arc::new(SeaOrmLicenseService::new(store.clone()))
            as Arc<dyn LicenseService + Send + Sync + 'static>;

        let admin_service = Arc::new(SeaOrmAdminService::new(store.clone()))
            as Arc<dyn AdminService + Send + Sync + 'static>;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            license_service.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let config = Arc::new(RwLock::new(config));

        Ok(Self {
            config,
            store,
            license_service,
            admin_service,
            auth_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
