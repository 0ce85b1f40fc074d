//! HTTP surface tests
//!
//! Role gate, bearer token handling and error payloads through the router.

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use common::*;
use shared::{ErrorOrigin, NewStockError, CANONICAL_WAREHOUSE};
use stock_ledger_backend::config::Config;
use stock_ledger_backend::middleware::auth::Claims;
use stock_ledger_backend::repository::StockRepository;
use stock_ledger_backend::{create_app, AppState};

fn app(repo: &Arc<dyn StockRepository>) -> (Router, Config) {
    let config = Config::default();
    (create_app(AppState::new(repo.clone(), config.clone())), config)
}

fn token(config: &Config, role: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        role: role.to_string(),
        exp: now + 600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt.secret.as_bytes()),
    )
    .unwrap()
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let repo = memory_repo();
    let (app, _) = app(&repo);

    let response = app
        .oneshot(request("GET", "/api/v1/stock/errors", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let repo = memory_repo();
    let (app, _) = app(&repo);
    let mut forged_config = Config::default();
    forged_config.jwt.secret = "another-secret".to_string();

    let response = app
        .oneshot(request("GET", "/api/v1/teams", Some(&token(&forged_config, "admin")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_public_routes() {
    let repo = memory_repo();
    let (app, _) = app(&repo);

    let response = app
        .clone()
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["database"], "connected");
    assert_eq!(body["pipeline"], "idle");

    let response = app.oneshot(request("GET", "/", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Role gate
// ============================================================================

#[tokio::test]
async fn test_user_role_cannot_reconcile() {
    let repo = memory_repo();
    let (app, config) = app(&repo);

    let response = app
        .oneshot(request("POST", "/api/v1/stock/reconcile", Some(&token(&config, "user")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"]["code"], "INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn test_manager_can_reconcile() {
    let repo = memory_repo();
    let admin = repo.create_team("Admin", &[]).await.unwrap();
    repo.create_warehouse(CANONICAL_WAREHOUSE, &[admin.id]).await.unwrap();
    let (app, config) = app(&repo);

    let response = app
        .oneshot(request("POST", "/api/v1/stock/reconcile", Some(&token(&config, "manager")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["errors_found"], 0);
}

#[tokio::test]
async fn test_user_role_can_increment_but_not_correct() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 3).await;
    let (app, config) = app(&repo);
    let user = token(&config, "user");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/stock/products/{}/increment", product.id),
            Some(&user),
            Some(serde_json::json!({ "warehouse_id": w1.id, "team_id": teams[0].id, "delta": 2 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["quantity"], 5);

    let response = app
        .oneshot(request(
            "PUT",
            &format!("/api/v1/stock/products/{}/correction", product.id),
            Some(&user),
            Some(serde_json::json!({ "warehouse_id": w1.id, "team_id": teams[0].id, "quantity": 0 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Error payloads
// ============================================================================

#[tokio::test]
async fn test_increment_below_zero_is_unprocessable() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 1).await;
    let (app, config) = app(&repo);

    let response = app
        .oneshot(request(
            "POST",
            &format!("/api/v1/stock/products/{}/increment", product.id),
            Some(&token(&config, "user")),
            Some(serde_json::json!({ "warehouse_id": w1.id, "team_id": teams[0].id, "delta": -2 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"]["code"], "INSUFFICIENT_STOCK");
}

#[tokio::test]
async fn test_unknown_error_is_not_found() {
    let repo = memory_repo();
    let (app, config) = app(&repo);

    let response = app
        .oneshot(request(
            "PUT",
            &format!("/api/v1/stock/errors/{}", Uuid::new_v4()),
            Some(&token(&config, "admin")),
            Some(serde_json::json!({ "status": true })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export_conflicts_with_unresolved_errors() {
    let repo = memory_repo();
    repo.replace_stock_errors(vec![NewStockError {
        origin: ErrorOrigin::Team,
        product_ids: vec![],
    }])
    .await
    .unwrap();
    let (app, config) = app(&repo);

    let response = app
        .oneshot(request("GET", "/api/v1/stock/export", Some(&token(&config, "admin")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert!(body["error"]["message_fr"].as_str().is_some());
}

#[tokio::test]
async fn test_export_is_csv() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    stock(&repo, w1.id, teams[0].id, "REF1", 2).await;
    let (app, config) = app(&repo);

    let response = app
        .oneshot(request("GET", "/api/v1/stock/export", Some(&token(&config, "manager")), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("W1;REF1;REF1 item;W1 team 1;2"));
}

#[tokio::test]
async fn test_import_upload_through_multipart() {
    let repo = memory_repo();
    warehouse_with_teams(&repo, "W1", 1).await;
    let (app, config) = app(&repo);

    let boundary = "stock-boundary";
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"stock.csv\"\r\nContent-Type: text/csv\r\n\r\n",
        b = boundary
    )
    .into_bytes();
    body.extend_from_slice(&export_bytes(&[("W1", "REF1", "Widget", 5)]));
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/stock/import")
        .header(header::AUTHORIZATION, format!("Bearer {}", token(&config, "admin")))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = json_body(response).await;
    assert_eq!(summary["created_count"], 2);
    assert_eq!(summary["placeholder_count"], 1);
}
