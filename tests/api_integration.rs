//! API integration tests.
//!
//! These tests drive the demo router end-to-end with `tower::ServiceExt`,
//! carrying the session cookie between requests the way a browser would.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use session_keeper::api::{create_router, create_router_with_state, AppState};
use session_keeper::{
    CookieExpiry, ManagedSessionInterface, SessionError, SessionId, SessionInterface,
    SessionManager, SessionOptions, SessionSettings, StoreType,
};
use tower::ServiceExt;

fn memory_manager() -> SessionManager {
    SessionManager::new(SessionOptions::new(
        StoreType::Memory,
        CookieExpiry::BrowserSession,
    ))
    .unwrap()
}

/// Helper to create a request, optionally carrying a cookie and JSON body.
fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

/// The `name=value` pair from the response's Set-Cookie header.
fn cookie_pair(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string())
}

fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
}

fn cookie_id(pair: &str) -> SessionId {
    pair.split_once('=').unwrap().1.parse().unwrap()
}

/// Helper to extract body as string.
async fn response_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&body).to_string()
}

/// Helper to extract JSON from response.
async fn response_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

// ============================================================================
// Health & Configuration Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(memory_manager());

    let response = send(&app, request(Method::GET, "/health", None, None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).is_none());
    assert_eq!(response_text(response).await, "OK");
}

#[test]
fn test_missing_session_type_is_rejected() {
    let settings = SessionSettings {
        expires: Some(CookieExpiry::BrowserSession),
        ..SessionSettings::default()
    };
    let err = SessionManager::from_settings(&settings).unwrap_err();
    assert!(matches!(err, SessionError::Configuration(_)));
    assert!(err.to_string().contains("SESSION_TYPE"));
}

#[test]
fn test_missing_expires_is_rejected() {
    let settings = SessionSettings {
        session_type: Some("memory".into()),
        ..SessionSettings::default()
    };
    let err = SessionManager::from_settings(&settings).unwrap_err();
    assert!(err.to_string().contains("SESSION_EXPIRES"));
}

#[test]
fn test_file_store_requires_data_dir() {
    let settings = SessionSettings {
        session_type: Some("file".into()),
        expires: Some(CookieExpiry::Never),
        ..SessionSettings::default()
    };
    let err = SessionManager::from_settings(&settings).unwrap_err();
    assert!(err.to_string().contains("SESSION_DATA_DIR"));
}

// ============================================================================
// Session Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_read_only_requests_set_no_cookie() {
    let app = create_router(memory_manager());

    let response = send(&app, request(Method::GET, "/session", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).is_none());

    let json = response_json(response).await;
    assert!(json.get("session_id").is_none());
    assert_eq!(json["data"], json!({}));

    let response = send(&app, request(Method::GET, "/session/missing", None, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(set_cookie(&response).is_none());

    let json = response_json(response).await;
    assert_eq!(json["error"], "KEY_NOT_FOUND");
}

#[tokio::test]
async fn test_round_trip_through_cookie() {
    let manager = memory_manager();
    let app = create_router(manager.clone());

    let response = send(
        &app,
        request(
            Method::PUT,
            "/session/user",
            None,
            Some(json!({"value": "alice"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = cookie_pair(&response).expect("write should issue a cookie");
    assert!(cookie.starts_with("session.id="));
    assert!(manager.store().exists(&cookie_id(&cookie)).await.unwrap());

    let header = set_cookie(&response).unwrap();
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("Path=/"));
    assert!(!header.contains("Max-Age"));

    // Second request sees the value and gets no new cookie
    let response = send(&app, request(Method::GET, "/session/user", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).is_none());
    assert_eq!(response_json(response).await, json!("alice"));

    let response = send(&app, request(Method::GET, "/session", Some(&cookie), None)).await;
    let json = response_json(response).await;
    assert_eq!(json["loaded"], true);
    assert_eq!(json["session_id"], cookie.split_once('=').unwrap().1);
    assert_eq!(json["data"]["user"], "alice");
}

#[tokio::test]
async fn test_visits_counter() {
    let app = create_router(memory_manager());

    let response = send(&app, request(Method::GET, "/visits", None, None)).await;
    let cookie = cookie_pair(&response).unwrap();
    assert_eq!(response_json(response).await["visits"], 1);

    for expected in 2..=4 {
        let response = send(&app, request(Method::GET, "/visits", Some(&cookie), None)).await;
        assert!(set_cookie(&response).is_none());
        assert_eq!(response_json(response).await["visits"], expected);
    }

    // A different client starts from scratch
    let response = send(&app, request(Method::GET, "/visits", None, None)).await;
    assert_ne!(cookie_pair(&response).unwrap(), cookie);
    assert_eq!(response_json(response).await["visits"], 1);
}

#[tokio::test]
async fn test_pop_value() {
    let app = create_router(memory_manager());

    let response = send(
        &app,
        request(
            Method::PUT,
            "/session/cart",
            None,
            Some(json!({"value": [1, 2]})),
        ),
    )
    .await;
    let cookie = cookie_pair(&response).unwrap();

    send(
        &app,
        request(
            Method::PUT,
            "/session/theme",
            Some(&cookie),
            Some(json!({"value": "dark"})),
        ),
    )
    .await;

    let response = send(&app, request(Method::DELETE, "/session/cart", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!([1, 2]));

    let response = send(&app, request(Method::DELETE, "/session/cart", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, request(Method::GET, "/session", Some(&cookie), None)).await;
    assert_eq!(response_json(response).await["data"], json!({"theme": "dark"}));
}

#[tokio::test]
async fn test_delete_session_twice() {
    let manager = memory_manager();
    let app = create_router(manager.clone());

    let response = send(
        &app,
        request(Method::PUT, "/session/user", None, Some(json!({"value": 1}))),
    )
    .await;
    let cookie = cookie_pair(&response).unwrap();
    let id = cookie_id(&cookie);

    let response = send(&app, request(Method::DELETE, "/session", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
    assert!(!manager.store().exists(&id).await.unwrap());

    // The stale cookie resolves to a fresh session; deleting again is harmless
    let response = send(&app, request(Method::DELETE, "/session", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, request(Method::GET, "/session/user", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_removes_record() {
    let manager = memory_manager();
    let app = create_router(manager.clone());

    let response = send(
        &app,
        request(Method::PUT, "/session/a", None, Some(json!({"value": true}))),
    )
    .await;
    let cookie = cookie_pair(&response).unwrap();
    let id = cookie_id(&cookie);

    let response = send(&app, request(Method::POST, "/session/clear", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
    assert_eq!(response_json(response).await["data"], json!({}));
    assert!(!manager.store().exists(&id).await.unwrap());
}

#[tokio::test]
async fn test_idle_timeout_expires_session() {
    let mut options = SessionOptions::new(StoreType::Memory, CookieExpiry::BrowserSession);
    options.idle_timeout = Some(Duration::from_millis(50));
    let manager = SessionManager::new(options).unwrap();
    let app = create_router(manager.clone());

    let response = send(
        &app,
        request(Method::PUT, "/session/user", None, Some(json!({"value": "bob"}))),
    )
    .await;
    let cookie = cookie_pair(&response).unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;

    let response = send(&app, request(Method::GET, "/session/user", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!manager.store().exists(&cookie_id(&cookie)).await.unwrap());
}

#[tokio::test]
async fn test_persistent_cookie_max_age() {
    let manager = SessionManager::new(SessionOptions::new(
        StoreType::Memory,
        CookieExpiry::After(Duration::from_secs(3600)),
    ))
    .unwrap();
    let app = create_router(manager);

    let response = send(&app, request(Method::GET, "/visits", None, None)).await;
    assert!(set_cookie(&response).unwrap().contains("Max-Age=3600"));
}

// ============================================================================
// Out-of-band Access Tests
// ============================================================================

#[tokio::test]
async fn test_out_of_band_session_is_visible_to_requests() {
    let mut options = SessionOptions::new(StoreType::Memory, CookieExpiry::BrowserSession);
    options.testing = true;
    let manager = SessionManager::new(options).unwrap();
    let app = create_router_with_state(AppState::new(manager.clone()));

    // Seed a session the way a test harness would, without a request cycle
    let interface = ManagedSessionInterface::new(manager);
    let (mut parts, _) = Request::builder()
        .uri("/")
        .body(())
        .unwrap()
        .into_parts();
    let session = interface.open_session(&mut parts).await.unwrap();
    session.set("user_id", 42).unwrap();

    let mut seeded = Response::new(Body::empty());
    interface.save_session(&session, &mut seeded).await.unwrap();
    let cookie = cookie_pair(&seeded).expect("out-of-band save should set a cookie");

    let response = send(&app, request(Method::GET, "/session/user_id", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!(42));
}

#[tokio::test]
async fn test_out_of_band_requires_testing_mode() {
    let interface = ManagedSessionInterface::new(memory_manager());
    let (mut parts, _) = Request::builder()
        .uri("/")
        .body(())
        .unwrap()
        .into_parts();

    let err = interface.open_session(&mut parts).await.unwrap_err();
    assert!(matches!(err, SessionError::Configuration(_)));
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_last_writer_wins_on_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = SessionOptions::new(StoreType::File, CookieExpiry::Never);
    options.data_dir = Some(dir.path().to_path_buf());
    let manager = SessionManager::new(options).unwrap();

    let seed = manager.fresh_session();
    seed.set("base", 0).unwrap();
    seed.save().await.unwrap();
    let id = seed.id().unwrap();

    // Two overlapping requests for the same client
    let first = manager.load(Some(&id)).await.unwrap();
    let second = manager.load(Some(&id)).await.unwrap();
    first.set("from_first", 1).unwrap();
    second.set("from_second", 2).unwrap();
    first.save().await.unwrap();
    second.save().await.unwrap();

    let reloaded = manager.load(Some(&id)).await.unwrap();
    assert_eq!(reloaded.keys().unwrap(), vec!["base", "from_second"]);
}
