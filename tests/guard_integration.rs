//! End-to-end tests of the guarded HTTP surface.
//!
//! Requests go through the full router with `oneshot`; the peer address the
//! server would get from `into_make_service_with_connect_info` is attached
//! to each request as a `ConnectInfo` extension.
//!
//! Covered:
//!   - GET /health             (never guarded)
//!   - GET /api/v1/rules/stats (guarded)
//!   - static fallback         (guarded)
//!   - JSON / text deny responses, trusted header, store fallback

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt; // for .collect()
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt; // for .oneshot()

use ip_guard::api::{build_app, AppState};
use ip_guard::config::GuardConfig;
use ip_guard::guard::{DenyResponse, GuardState, RawList};
use ip_guard::store::{RuleStore, SqliteRuleStore};

/// In-memory database with migrations applied. One connection, so every
/// query sees the same database.
async fn setup_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    ip_guard::db::migrate(&pool).await.expect("Migration failed");
    pool
}

async fn build_test_app(cfg: GuardConfig, static_dir: &str) -> (Router, Arc<AppState>, SqlitePool) {
    let db = setup_db().await;
    let store: Arc<dyn RuleStore> = Arc::new(SqliteRuleStore::new(db.clone()));
    let guard = Arc::new(GuardState::from_config(&cfg, Some(store)));
    let state = Arc::new(AppState::new(guard, static_dir));
    (build_app(state.clone()), state, db)
}

fn get_from(uri: &str, peer: &str) -> Request<Body> {
    let mut req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let addr: SocketAddr = format!("{}:52000", peer).parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect()
        .await
        .expect("Failed to collect body")
        .to_bytes()
        .to_vec()
}

async fn body_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Body is not valid JSON")
}

const STATS: &str = "/api/v1/rules/stats";

// ═══════════════════════════════════════════════════════════════════════════════
// Health
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_is_not_guarded() {
    let (app, state, _db) = build_test_app(GuardConfig::default(), "./public").await;
    state.admin.add_to_blacklist("*", None).await.unwrap();

    let resp = app.oneshot(get_from("/health", "192.168.1.100")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "ok");
}

#[tokio::test]
async fn test_health_reports_unavailable_store() {
    let (app, _state, db) = build_test_app(GuardConfig::default(), "./public").await;
    db.close().await;

    let resp = app.oneshot(get_from("/health", "10.0.0.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp.into_body()).await["store"], "unavailable");
}

// ═══════════════════════════════════════════════════════════════════════════════
// Allow / deny decisions
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_no_rules_admits_everyone() {
    let (app, _state, _db) = build_test_app(GuardConfig::default(), "./public").await;

    let resp = app.oneshot(get_from(STATS, "203.0.113.9")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_whitelist_admits_only_listed_address() {
    let (app, state, _db) = build_test_app(GuardConfig::default(), "./public").await;
    state.admin.add_to_whitelist("192.168.1.100", Some("office")).await.unwrap();

    let resp = app.clone().oneshot(get_from(STATS, "192.168.1.100")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["whitelist_count"], 1);
    assert_eq!(json["total_active"], 1);

    let resp = app.oneshot(get_from(STATS, "192.168.1.101")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["message"], "Access denied from your IP address.");
}

#[tokio::test]
async fn test_global_deny_beats_whitelist() {
    let (app, state, _db) = build_test_app(GuardConfig::default(), "./public").await;
    state.admin.add_to_whitelist("192.168.1.100", None).await.unwrap();
    state.admin.add_to_blacklist("*", None).await.unwrap();

    let resp = app.oneshot(get_from(STATS, "192.168.1.100")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cidr_and_glob_rules() {
    let (app, state, _db) = build_test_app(GuardConfig::default(), "./public").await;
    state.admin.add_to_whitelist("10.0.0.0/8", None).await.unwrap();
    state.admin.add_to_blacklist("10.66.*", None).await.unwrap();

    for (peer, expected) in [
        ("10.1.2.3", StatusCode::OK),
        ("10.66.0.1", StatusCode::FORBIDDEN),
        ("11.1.2.3", StatusCode::FORBIDDEN),
    ] {
        let resp = app.clone().oneshot(get_from(STATS, peer)).await.unwrap();
        assert_eq!(resp.status(), expected, "peer {peer}");
    }
}

#[tokio::test]
async fn test_toggle_round_trip_restores_behavior() {
    let (app, state, _db) = build_test_app(GuardConfig::default(), "./public").await;
    let rule = state.admin.add_to_blacklist("192.168.1.50", None).await.unwrap();

    let status = |app: Router| async move {
        app.oneshot(get_from(STATS, "192.168.1.50")).await.unwrap().status()
    };

    assert_eq!(status(app.clone()).await, StatusCode::FORBIDDEN);
    assert!(state.admin.toggle_status(rule.id).await.unwrap());
    assert_eq!(status(app.clone()).await, StatusCode::OK);
    assert!(state.admin.toggle_status(rule.id).await.unwrap());
    assert_eq!(status(app).await, StatusCode::FORBIDDEN);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Deny response shape and client address resolution
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_text_deny_response() {
    let cfg = GuardConfig {
        error: DenyResponse {
            status: 451,
            message: "Go away".to_string(),
            json: false,
        },
        ..GuardConfig::default()
    };
    let (app, state, _db) = build_test_app(cfg, "./public").await;
    state.admin.add_to_blacklist("192.168.1.100", None).await.unwrap();

    let resp = app.oneshot(get_from(STATS, "192.168.1.100")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 451);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
    assert_eq!(body_bytes(resp.into_body()).await, b"Go away");
}

#[tokio::test]
async fn test_trusted_header_decides_client_address() {
    let cfg = GuardConfig {
        ip_header: Some("X-Forwarded-For".to_string()),
        ..GuardConfig::default()
    };
    let (app, state, _db) = build_test_app(cfg, "./public").await;
    state.admin.add_to_whitelist("203.0.113.10", None).await.unwrap();

    let mut req = get_from(STATS, "10.0.0.1");
    req.headers_mut().insert("x-forwarded-for", "203.0.113.10, 10.0.0.1".parse().unwrap());
    assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

    // Invalid first entry: the peer is judged instead.
    let mut req = get_from(STATS, "10.0.0.1");
    req.headers_mut().insert("x-forwarded-for", "not-an-ip, 203.0.113.10".parse().unwrap());
    assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_disabled_guard() {
    let cfg = GuardConfig {
        enabled: false,
        ..GuardConfig::default()
    };
    let (app, state, _db) = build_test_app(cfg, "./public").await;
    state.admin.add_to_blacklist("*", None).await.unwrap();

    let resp = app.oneshot(get_from(STATS, "192.168.1.100")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store failure
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_closed_database_falls_back_to_configured_lists() {
    let cfg = GuardConfig {
        blacklist: Some(RawList::One("192.168.1.66".to_string())),
        ..GuardConfig::default()
    };
    let (app, state, db) = build_test_app(cfg, "./public").await;
    state.admin.add_to_blacklist("192.168.1.100", None).await.unwrap();
    db.close().await;

    // Configured list applies, the database rule is out of reach.
    let resp = app.clone().oneshot(get_from("/missing.txt", "192.168.1.66")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = app.clone().oneshot(get_from("/missing.txt", "192.168.1.100")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Admitted, but the stats handler itself needs the database.
    let resp = app.oneshot(get_from(STATS, "192.168.1.100")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp.into_body()).await["error"], "Internal server error");
}

// ═══════════════════════════════════════════════════════════════════════════════
// Static files
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_static_files_are_guarded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hello from disk").unwrap();
    let static_dir = dir.path().to_string_lossy().to_string();

    let (app, state, _db) = build_test_app(GuardConfig::default(), &static_dir).await;
    state.admin.add_to_blacklist("192.168.1.0/24", None).await.unwrap();

    let resp = app.clone().oneshot(get_from("/hello.txt", "10.0.0.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp.into_body()).await, b"hello from disk");

    let resp = app.oneshot(get_from("/hello.txt", "192.168.1.7")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
