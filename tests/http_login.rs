mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::{Sign, SoftAuthenticator, ORIGIN, RP_ID};
use passkey_todo_server::config::Config;
use passkey_todo_server::db::models::Todo;
use passkey_todo_server::db::{self, credentials, todos, users, TodoStore};
use passkey_todo_server::reminders::LogNotifier;
use passkey_todo_server::router;
use passkey_todo_server::state::AppState;
use passkey_todo_server::webauthn::counter::CounterPolicy;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        rp_id: RP_ID.to_string(),
        rp_origin: ORIGIN.to_string(),
        rp_name: "Todo".to_string(),
        require_user_verification: false,
        counter_policy: CounterPolicy::Strict,
        single_credential_fallback: true,
        challenge_ttl_secs: 300,
        reminder_poll_secs: 60,
        notifications_muted: false,
    }
}

struct TestApp {
    app: Router,
    state: AppState,
    key: SoftAuthenticator,
    user_id: String,
}

async fn spawn_app() -> TestApp {
    spawn_app_for("alice").await
}

/// App with one user holding one passkey at counter 5
async fn spawn_app_for(username: &str) -> TestApp {
    let config = config();
    let pool = db::connect(&config.database_url).await.unwrap();
    let state = AppState::from_pool(pool, &config, Arc::new(LogNotifier)).unwrap();

    let user = users::create_user(&state.db, username, username).await.unwrap();
    let key = SoftAuthenticator::new(0x42, b"user-phone");
    credentials::save_credential(&state.db, &key.credential(&user.id, 5))
        .await
        .unwrap();

    let app = router(state.clone(), tower_sessions::MemoryStore::default());
    TestApp {
        app,
        state,
        key,
        user_id: user.id,
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// `name=value` of the first Set-Cookie for `name`
fn cookie_pair(cookies: &[String], name: &str) -> String {
    cookies
        .iter()
        .find(|c| c.starts_with(&format!("{name}=")))
        .and_then(|c| c.split(';').next())
        .unwrap()
        .to_string()
}

fn post_json(uri: &str) -> axum::http::request::Builder {
    Request::post(uri).header(header::CONTENT_TYPE, "application/json")
}

/// `Cookie` header a browser would send back after login-options
fn challenge_cookie_header(cookies: &[String]) -> String {
    format!(
        "{}; {}",
        cookie_pair(cookies, "auth-challenge"),
        cookie_pair(cookies, "auth-username")
    )
}

async fn login_options(app: &Router, username: &str) -> (String, Vec<String>) {
    let response = send(
        app,
        post_json("/api/auth/login-options")
            .body(Body::from(json!({ "username": username }).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    let body = json_body(response).await;
    (body["challenge"].as_str().unwrap().to_string(), cookies)
}

#[tokio::test]
async fn full_login_then_profile() {
    let t = spawn_app().await;

    let (challenge, cookies) = login_options(&t.app, "alice").await;
    assert!(cookies.iter().any(|c| c.starts_with("auth-challenge=") && c.contains("HttpOnly")));
    let cookie_header = challenge_cookie_header(&cookies);

    let assertion = t.key.sign(&Sign::new(&challenge, 6));
    let response = send(
        &t.app,
        post_json("/api/auth/login-verify")
            .header(header::COOKIE, cookie_header)
            .header(header::ORIGIN, ORIGIN)
            .body(Body::from(serde_json::to_string(&assertion).unwrap()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("auth-challenge=;") && c.contains("Max-Age=0")));
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("auth-username=;") && c.contains("Max-Age=0")));
    let session_cookie = cookie_pair(&cookies, "id");

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["id"], t.user_id.as_str());

    let response = send(
        &t.app,
        Request::get("/api/users/me")
            .header(header::COOKIE, session_cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["username"], "alice");

    let stored = credentials::current_counter(&t.state.db, &t.key.stored_id())
        .await
        .unwrap();
    assert_eq!(stored, Some(6));
}

#[tokio::test]
async fn missing_cookies_report_expired_session() {
    let t = spawn_app().await;
    let assertion = t.key.sign(&Sign::new("AAAA", 6));

    let response = send(
        &t.app,
        post_json("/api/auth/login-verify")
            .body(Body::from(serde_json::to_string(&assertion).unwrap()))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(set_cookies(&response).iter().all(|c| !c.starts_with("auth-")));
    assert_eq!(json_body(response).await["error"], "Authentication session expired");
}

#[tokio::test]
async fn rejected_assertion_gets_generic_401() {
    let t = spawn_app().await;
    let (challenge, cookies) = login_options(&t.app, "alice").await;
    let cookie_header = challenge_cookie_header(&cookies);

    // Replays the stored counter
    let assertion = t.key.sign(&Sign::new(&challenge, 5));
    let response = send(
        &t.app,
        post_json("/api/auth/login-verify")
            .header(header::COOKIE, cookie_header)
            .body(Body::from(serde_json::to_string(&assertion).unwrap()))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Authentication failed");
}

#[tokio::test]
async fn usernames_needing_encoding_can_log_in() {
    for username in ["zoë", "o'neil;admin"] {
        let t = spawn_app_for(username).await;
        let (challenge, cookies) = login_options(&t.app, username).await;

        let assertion = t.key.sign(&Sign::new(&challenge, 6));
        let response = send(
            &t.app,
            post_json("/api/auth/login-verify")
                .header(header::COOKIE, challenge_cookie_header(&cookies))
                .header(header::ORIGIN, ORIGIN)
                .body(Body::from(serde_json::to_string(&assertion).unwrap()))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK, "login as {username}");
        let body = json_body(response).await;
        assert_eq!(body["user"]["username"], username);
        assert_eq!(body["user"]["id"], t.user_id.as_str());
    }
}

#[tokio::test]
async fn malformed_assertion_body_gets_generic_401() {
    let t = spawn_app().await;
    let (_, cookies) = login_options(&t.app, "alice").await;

    let response = send(
        &t.app,
        post_json("/api/auth/login-verify")
            .header(header::COOKIE, challenge_cookie_header(&cookies))
            .body(Body::from(r#"{"id":"AQ","type":"public-key","response":{}}"#))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({ "error": "Authentication failed" }));
}

#[tokio::test]
async fn notifications_require_login() {
    let t = spawn_app().await;
    let response = send(
        &t.app,
        Request::get("/api/notifications/check").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn due_reminders_are_listed_and_marked() {
    let t = spawn_app().await;
    let due_soon = (chrono::Utc::now() + chrono::Duration::minutes(5)).to_rfc3339();
    let todo_id = todos::insert_todo(
        &t.state.db,
        &Todo {
            id: 0,
            user_id: t.user_id.clone(),
            title: "Pay rent".to_string(),
            due_date: Some(due_soon),
            reminder_minutes: Some(15),
            completed: false,
            last_notification_sent: None,
        },
    )
    .await
    .unwrap();

    let (challenge, cookies) = login_options(&t.app, "alice").await;
    let cookie_header = challenge_cookie_header(&cookies);
    let assertion = t.key.sign(&Sign::new(&challenge, 6));
    let response = send(
        &t.app,
        post_json("/api/auth/login-verify")
            .header(header::COOKIE, cookie_header)
            .body(Body::from(serde_json::to_string(&assertion).unwrap()))
            .unwrap(),
    )
    .await;
    let session_cookie = cookie_pair(&set_cookies(&response), "id");

    let response = send(
        &t.app,
        Request::get("/api/notifications/check")
            .header(header::COOKIE, session_cookie.clone())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let body = json_body(response).await;
    assert_eq!(body["todos"].as_array().unwrap().len(), 1);
    assert_eq!(body["todos"][0]["id"], todo_id);

    let response = send(
        &t.app,
        post_json("/api/notifications/check")
            .header(header::COOKIE, session_cookie.clone())
            .body(Body::from(json!({ "todoId": todo_id }).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &t.app,
        Request::get("/api/notifications/check")
            .header(header::COOKIE, session_cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(json_body(response).await["todos"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn log_notifier_leaves_due_reminders_for_polling() {
    let t = spawn_app().await;
    let due_soon = (chrono::Utc::now() + chrono::Duration::minutes(5)).to_rfc3339();
    todos::insert_todo(
        &t.state.db,
        &Todo {
            id: 0,
            user_id: t.user_id.clone(),
            title: "Pay rent".to_string(),
            due_date: Some(due_soon),
            reminder_minutes: Some(15),
            completed: false,
            last_notification_sent: None,
        },
    )
    .await
    .unwrap();

    assert!(!t.state.reminders.request_permission().await);
    assert_eq!(t.state.reminders.check_once(chrono::Utc::now()).await.unwrap(), 0);

    let (challenge, cookies) = login_options(&t.app, "alice").await;
    let assertion = t.key.sign(&Sign::new(&challenge, 6));
    let response = send(
        &t.app,
        post_json("/api/auth/login-verify")
            .header(header::COOKIE, challenge_cookie_header(&cookies))
            .body(Body::from(serde_json::to_string(&assertion).unwrap()))
            .unwrap(),
    )
    .await;
    let session_cookie = cookie_pair(&set_cookies(&response), "id");

    let response = send(
        &t.app,
        Request::get("/api/notifications/check")
            .header(header::COOKIE, session_cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(json_body(response).await["todos"].as_array().unwrap().len(), 1);
    assert_eq!(
        t.state.store.due_reminders(Some(&t.user_id), chrono::Utc::now()).await.unwrap().len(),
        1
    );
}
