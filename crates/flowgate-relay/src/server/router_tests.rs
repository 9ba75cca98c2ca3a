//! HTTP boundary tests driven through the router with `oneshot`.

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use flowgate_crypto::NodeCipher;
use tower::ServiceExt;

use crate::auth::JwtManager;
use crate::server::{AppState, build_router};
use crate::storage::RelayDatabase;
use crate::test_helpers::{TEST_JWT_SECRET, db_with_node, test_state};

const WS_PATH: &str = "/system-info";

async fn get(state: AppState, uri: &str) -> Response {
    build_router(state, WS_PATH)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post(state: AppState, uri: &str, body: String) -> Response {
    build_router(state, WS_PATH)
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// === Connection admission ===

#[tokio::test]
async fn unknown_role_is_bad_request() {
    let state = test_state(db_with_node(7, "s7").await);
    let response = get(state, "/system-info?type=9&secret=s7").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_role_is_bad_request() {
    let state = test_state(db_with_node(7, "s7").await);
    let response = get(state, "/system-info?secret=s7").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn node_without_secret_is_bad_request() {
    let state = test_state(db_with_node(7, "s7").await);
    let response = get(state, "/system-info?type=1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_node_secret_is_forbidden() {
    let state = test_state(db_with_node(7, "s7").await);
    let response = get(state, "/system-info?type=1&secret=wrong").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_admin_token_is_forbidden() {
    let state = test_state(db_with_node(7, "s7").await);
    let response = get(state, "/system-info?type=0&token=garbage").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn credential_store_failure_is_internal_error() {
    let db = db_with_node(7, "s7").await;
    db.pool().close().await;
    let response = get(test_state(db), "/system-info?type=1&secret=s7").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "internal error");
}

#[tokio::test]
async fn valid_node_without_upgrade_gets_extractor_rejection() {
    let state = test_state(db_with_node(7, "s7").await);
    let response = get(state, "/system-info?type=1&secret=s7").await;

    assert!(response.status().is_client_error());
    assert_ne!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_token_accepted_from_legacy_secret_param() {
    let state = test_state(db_with_node(7, "s7").await);
    let (token, _) = JwtManager::new(TEST_JWT_SECRET, 60)
        .issue_access_token("admin-1", "ops")
        .unwrap();

    let response = get(state, &format!("/system-info?type=0&secret={token}")).await;
    // Authorized; only the missing upgrade headers are left to reject.
    assert_ne!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.status().is_client_error());
}

// === Health ===

#[tokio::test]
async fn health_reports_counts() {
    let state = test_state(RelayDatabase::open_in_memory().await.unwrap());
    let response = get(state, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body, serde_json::json!({ "status": "ok", "nodes": 0, "admins": 0 }));
}

// === Flow upload ===

struct Seeded {
    state: AppState,
    forward_id: i64,
    user_id: i64,
    user_tunnel_id: i64,
}

async fn seeded() -> Seeded {
    let db = db_with_node(7, "s7").await;
    let user = db.create_user("alice", 1 << 30).await.unwrap();
    let tunnel = db.create_tunnel("edge").await.unwrap();
    let user_tunnel = db.create_user_tunnel(user.id, tunnel.id, 0).await.unwrap();
    let forward = db
        .create_forward(user.id, tunnel.id, "web", "10.0.0.2:443")
        .await
        .unwrap();
    Seeded {
        state: test_state(db),
        forward_id: forward.id,
        user_id: user.id,
        user_tunnel_id: user_tunnel.id,
    }
}

#[tokio::test]
async fn flow_upload_applies_delta() {
    let s = seeded().await;
    let body = serde_json::json!({
        "n": format!("{}_{}_{}", s.forward_id, s.user_id, s.user_tunnel_id),
        "u": 100,
        "d": 300,
    });

    let response = post(s.state.clone(), "/flow/upload?secret=s7", body.to_string()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    let db = s.state.controller.db();
    let forward = db.get_forward(s.forward_id).await.unwrap();
    assert_eq!((forward.in_flow, forward.out_flow), (300, 100));
    let user_tunnel = db.get_user_tunnel(s.user_tunnel_id).await.unwrap();
    assert_eq!((user_tunnel.in_flow, user_tunnel.out_flow), (300, 100));
}

#[tokio::test]
async fn flow_upload_accepts_encrypted_envelope() {
    let s = seeded().await;
    let report = serde_json::json!({
        "n": format!("{}_{}_0", s.forward_id, s.user_id),
        "u": 5,
        "d": 7,
    });
    let sealed = NodeCipher::from_secret("s7")
        .unwrap()
        .encrypt(report.to_string().as_bytes())
        .unwrap();
    let body = serde_json::json!({ "encrypted": true, "data": sealed, "timestamp": 1 });

    let response = post(s.state.clone(), "/flow/upload?secret=s7", body.to_string()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = s.state.controller.db().get_user(s.user_id).await.unwrap();
    assert_eq!((user.in_flow, user.out_flow), (7, 5));
}

#[tokio::test]
async fn flow_upload_rejects_unknown_secret() {
    let s = seeded().await;
    let response = post(s.state, "/flow/upload?secret=nope", "{}".into()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn flow_upload_rejects_malformed_body() {
    let s = seeded().await;
    let response = post(s.state.clone(), "/flow/upload?secret=s7", "not json".into()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post(
        s.state,
        "/flow/upload?secret=s7",
        r#"{"n":"web","u":1,"d":1}"#.into(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn flow_upload_ledger_failure_discards_whole_delta() {
    let s = seeded().await;
    let body = serde_json::json!({
        "n": format!("{}_{}_9999", s.forward_id, s.user_id),
        "u": 1,
        "d": 1,
    });

    let response = post(s.state.clone(), "/flow/upload?secret=s7", body.to_string()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let forward = s.state.controller.db().get_forward(s.forward_id).await.unwrap();
    assert_eq!((forward.in_flow, forward.out_flow), (0, 0));
}
