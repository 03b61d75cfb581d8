use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use keygate::config::Config;
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "test-admin-token";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.admin.token = Some(ADMIN_TOKEN.to_string());

    let state = keygate::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    keygate::api::router(state).await
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn post_admin(body: &serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/admin")
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("X-Admin-Token", token);
    }
    builder
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Generates a key over the admin API and returns it.
async fn generate_key(app: &Router, allowed_uses: i32, duration: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_admin(
            &serde_json::json!({
                "action": "generate",
                "allowed_uses": allowed_uses,
                "duration": duration,
            }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    body["licenses"][0]["key"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_admin_token_gate() {
    let app = spawn_app().await;
    let list = serde_json::json!({ "action": "list" });

    let response = app.clone().oneshot(post_admin(&list, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(post_admin(&list, Some("wrong-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(post_admin(&list, Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], "OK");
    assert!(body["users"].as_array().unwrap().is_empty());
    assert!(body["licenses"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_disabled_without_token() {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.admin.token = None;

    let state = keygate::api::create_app_state_from_config(config).await.unwrap();
    let app = keygate::api::router(state).await;

    let response = app
        .oneshot(post_admin(
            &serde_json::json!({ "action": "list" }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_login_check_flow() {
    let app = spawn_app().await;
    let key = generate_key(&app, 2, "2d").await;

    // register
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/register",
            &serde_json::json!({
                "username": "alice",
                "password": "hunter22",
                "key": key,
                "hwid": "device-1",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["license"]["usage"], "1/2");
    assert_eq!(body["data"]["license"]["identity"], "device-1");
    assert_eq!(body["data"]["license"]["expiry"]["state"], "valid");

    // login
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/login",
            &serde_json::json!({ "username": "alice", "password": "hunter22" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["license"]["key"], key);

    // runtime check, bound identity
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/license/check",
            &serde_json::json!({ "key": key, "identity": "device-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["license"]["usage"], "1/2");

    // runtime check, foreign identity
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/license/check",
            &serde_json::json!({ "key": key, "identity": "device-2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["reason"], "identity_mismatch");
    assert!(body.get("license").is_none());
}

#[tokio::test]
async fn test_register_enumerates_missing_fields() {
    let app = spawn_app().await;

    let response = app
        .oneshot(post_json(
            "/api/register",
            &serde_json::json!({ "username": "alice", "password": "pw" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Missing fields"));
    assert!(error.contains("key"));
    assert!(error.contains("hwid"));
}

#[tokio::test]
async fn test_register_with_unknown_key_is_404() {
    let app = spawn_app().await;

    let response = app
        .oneshot(post_json(
            "/api/register",
            &serde_json::json!({
                "username": "alice",
                "password": "pw",
                "key": "NOSUCHKEY",
                "hwid": "device-1",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_username_is_409() {
    let app = spawn_app().await;
    let key = generate_key(&app, 0, "").await;

    let register = serde_json::json!({
        "username": "alice",
        "password": "pw",
        "key": key,
        "hwid": "device-1",
    });

    let response = app
        .clone()
        .oneshot(post_json("/api/register", &register))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json("/api/register", &register))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_check_license_unknown_key() {
    let app = spawn_app().await;

    let response = app
        .oneshot(post_json(
            "/api/license/check",
            &serde_json::json!({ "key": "NOSUCHKEY", "identity": "x" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["reason"], "not_found");
}

#[tokio::test]
async fn test_admin_generate_rejects_bad_duration() {
    let app = spawn_app().await;

    let response = app
        .oneshot(post_admin(
            &serde_json::json!({ "action": "generate", "duration": "2 fortnights" }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_ban_and_delete_key_lifecycle() {
    let app = spawn_app().await;
    let key = generate_key(&app, 0, "").await;

    // ban
    let response = app
        .clone()
        .oneshot(post_admin(
            &serde_json::json!({ "action": "ban_key", "license_key": key }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["licenses"][0]["banned"], true);

    // a banned key reports banned, not missing
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/license/check",
            &serde_json::json!({ "key": key, "identity": "x" }),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["reason"], "banned");

    // delete
    let response = app
        .clone()
        .oneshot(post_admin(
            &serde_json::json!({ "action": "delete_key", "license_key": key }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["licenses"].as_array().unwrap().is_empty());

    // deleting again matches nothing
    let response = app
        .oneshot(post_admin(
            &serde_json::json!({ "action": "delete_key", "license_key": key }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_projection_embeds_owner() {
    let app = spawn_app().await;
    let key = generate_key(&app, 0, "").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/register",
            &serde_json::json!({
                "username": "alice",
                "password": "pw",
                "key": key,
                "hwid": "device-1",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_admin(
            &serde_json::json!({ "action": "list" }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;

    let license = &body["licenses"][0];
    assert_eq!(license["key"].as_str().unwrap(), key);
    assert_eq!(license["owner"]["username"], "alice");
    assert_eq!(body["users"][0]["username"], "alice");
}

#[tokio::test]
async fn test_unknown_admin_action_rejected() {
    let app = spawn_app().await;

    let response = app
        .oneshot(post_admin(
            &serde_json::json!({ "action": "drop_everything" }),
            Some(ADMIN_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
