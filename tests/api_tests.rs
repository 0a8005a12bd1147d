//! REST API 테스트
//!
//! 라우터를 직접 호출(`oneshot`)하여 인증, 상태 코드, 응답 형식을 확인합니다.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{harness, Harness};
use yield_ledger::auth::JwtAuthenticator;
use yield_ledger::ledger::BonusType;
use yield_ledger::server::{build_router, ServerState};

const JWT_SECRET: &str = "api-test-secret";
const ADMIN_SECRET: &str = "admin-test-secret";

fn router(h: &Harness) -> Router {
    let auth = Arc::new(JwtAuthenticator::new(JWT_SECRET));
    build_router(ServerState::new(h.ledger.clone(), auth, ADMIN_SECRET))
}

fn token(user_id: &str) -> String {
    JwtAuthenticator::new(JWT_SECRET)
        .issue(user_id, chrono::Duration::hours(1))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn user_request(method: &str, uri: &str, user_id: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token(user_id)));
    with_body(builder, body)
}

fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-admin-secret", ADMIN_SECRET);
    with_body(builder, body)
}

fn with_body(builder: axum::http::request::Builder, body: Option<Value>) -> Request<Body> {
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_user_routes_require_bearer_token() {
    let h = harness().await;
    let app = router(&h);

    let request = Request::builder()
        .uri("/api/user-summary")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/api/user-summary")
        .header(header::AUTHORIZATION, "Bearer forged")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_secret() {
    let h = harness().await;
    let app = router(&h);

    let request = Request::builder()
        .uri("/api/admin/users")
        .header("x-admin-secret", "wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        admin_request("POST", "/api/admin/users", Some(json!({ "user_id": "alice" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "alice");
}

#[tokio::test]
async fn test_withdraw_flow_over_http() {
    let h = harness().await;
    h.funded_account("alice", dec!(100)).await;
    h.award("alice", BonusType::Referral, dec!(50)).await;
    let app = router(&h);

    let (status, body) = send(
        &app,
        admin_request(
            "POST",
            "/api/admin/bonus/convert",
            Some(json!({ "user_id": "alice", "bonus_type": "referral", "amount": "20" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_balance"], "120");

    let (status, body) = send(
        &app,
        user_request(
            "POST",
            "/api/withdraw",
            "alice",
            Some(json!({ "amount": "50", "network": "TRC20", "wallet_address": "TXyz" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["currency"], "USDT");
    let withdrawal_id = body["id"].as_str().unwrap().to_string();

    let reject_uri = format!("/api/admin/withdrawals/{}/reject", withdrawal_id);
    let (status, body) = send(&app, admin_request("POST", &reject_uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    let (status, body) = send(&app, admin_request("POST", &reject_uri, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INVALID_STATE_TRANSITION");

    let (status, body) = send(&app, user_request("GET", "/api/user-summary", "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["withdrawable_balance"], "120");
    assert_eq!(body["bonus"]["referral"], "30");
}

#[tokio::test]
async fn test_error_statuses_over_http() {
    let h = harness().await;
    h.funded_account("alice", dec!(1)).await;
    let plan = h.active_plan("alice", dec!(5)).await;
    let app = router(&h);

    let (status, body) = send(
        &app,
        user_request(
            "POST",
            "/api/withdraw",
            "alice",
            Some(json!({ "amount": "1", "network": "TRC20", "wallet_address": "TXyz" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        user_request(
            "POST",
            "/api/withdraw",
            "alice",
            Some(json!({ "amount": "5", "network": "TRC20", "wallet_address": "TXyz" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INSUFFICIENT_BALANCE");

    let (status, body) = send(
        &app,
        user_request(
            "POST",
            "/api/claim-daily",
            "alice",
            Some(json!({ "plan_id": plan.id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "CLAIM_NOT_YET_AVAILABLE");
    assert!(body["next_eligible_at"].is_string());

    let (status, body) = send(
        &app,
        admin_request("POST", "/api/admin/withdrawals/missing/approve", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_deposit_and_claim_over_http() {
    let h = harness().await;
    h.funded_account("alice", dec!(0)).await;
    let app = router(&h);

    let (_, product) = send(
        &app,
        admin_request(
            "POST",
            "/api/admin/products",
            Some(json!({ "name": "Silver", "daily_income": "2.5" })),
        ),
    )
    .await;

    let (status, deposit) = send(
        &app,
        user_request(
            "POST",
            "/api/deposits",
            "alice",
            Some(json!({ "amount": "250", "product_id": product["id"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deposit["status"], "pending");

    let confirm_uri = format!(
        "/api/admin/deposits/{}/confirm",
        deposit["id"].as_str().unwrap()
    );
    let (status, confirmation) = send(&app, admin_request("POST", &confirm_uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    let plan_id = confirmation["plan"]["id"].as_str().unwrap().to_string();

    let (_, plans) = send(&app, user_request("GET", "/api/plans", "alice", None)).await;
    assert_eq!(plans.as_array().unwrap().len(), 1);

    h.clock.advance(chrono::Duration::hours(24));
    let (status, receipt) = send(
        &app,
        user_request(
            "POST",
            "/api/claim-daily",
            "alice",
            Some(json!({ "plan_id": plan_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["new_balance"], "2.5");

    let (status, report) = send(
        &app,
        admin_request("GET", "/api/admin/users/alice/reconcile", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["consistent"], true);
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let h = harness().await;
    h.funded_account("alice", dec!(10)).await;
    let app = router(&h);

    let request = Request::builder()
        .method("POST")
        .uri("/api/withdraw")
        .header(header::AUTHORIZATION, format!("Bearer {}", token("alice")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"amount\": "))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["message"].is_string());

    let (status, body) = send(
        &app,
        user_request("POST", "/api/claim-daily", "alice", Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = send(&app, admin_request("POST", "/api/admin/bonus", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_admin_lists_all_bonuses_newest_first() {
    let h = harness().await;
    h.funded_account("alice", dec!(0)).await;
    h.funded_account("bob", dec!(0)).await;
    h.award("alice", BonusType::Signup, dec!(5)).await;
    h.award("bob", BonusType::Referral, dec!(7)).await;
    let app = router(&h);

    let (status, body) = send(&app, admin_request("GET", "/api/admin/bonus", None)).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["user_id"], "bob");
    assert_eq!(entries[0]["amount"], "7");
    assert_eq!(entries[1]["user_id"], "alice");

    let request = Request::builder()
        .uri("/api/admin/bonus")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
