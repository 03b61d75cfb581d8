use axum::{
    Json, Router,
    extract::State,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod admin;
pub mod auth;
mod error;
pub mod license;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    pub async fn config(&self) -> Config {
        self.shared.config().await
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn license_service(&self) -> &Arc<dyn crate::services::LicenseService> {
        &self.shared.license_service
    }

    #[must_use]
    pub fn admin_service(&self) -> &Arc<dyn crate::services::AdminService> {
        &self.shared.admin_service
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn crate::services::AuthService> {
        &self.shared.auth_service
    }
}

pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState { shared })
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared))
}

/// GET /api/health
async fn health(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<String>>, ApiError> {
    state
        .store()
        .ping()
        .await
        .map_err(|e| ApiError::internal(format!("Store unavailable: {e}")))?;

    Ok(Json(ApiResponse::success("ok".to_string())))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().await.server.cors_origins;

    let api_router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/license/check", post(license::check))
        .route("/admin", post(admin::dispatch))
        .route("/health", get(health))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
