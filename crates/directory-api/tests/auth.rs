mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{Auth, TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_frontend_sets_csrf_cookie() {
    let app = TestApp::new();
    let response = app.get("/", &Auth::Anonymous).await;
    assert_eq!(response.status, StatusCode::OK);
    let token = response.cookie("csrftoken").unwrap();
    assert_eq!(token.len(), 64);
}

#[tokio::test]
async fn test_csrf_endpoint_matches_cookie() {
    let app = TestApp::new();
    let response = app.get("/api/auth/csrf", &Auth::Anonymous).await;
    assert_eq!(response.body["csrfToken"].as_str(), response.cookie("csrftoken").as_deref());
}

#[tokio::test]
async fn test_login_requires_csrf() {
    let app = TestApp::new();
    app.create_user("sam", false).await;

    let response = app
        .send(
            Method::POST,
            "/api/auth/login",
            &Auth::Anonymous,
            Some(json!({ "username": "sam", "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.body["message"].as_str().unwrap().starts_with("CSRF Failed"));
}

#[tokio::test]
async fn test_session_login_me_and_logout() {
    let app = TestApp::new();
    let auth = app.session("sam", false).await;

    let me = app.get("/api/auth/me", &auth).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "sam");

    let logout = app.send(Method::POST, "/api/auth/logout", &auth, None).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.set_cookie("sessionid").unwrap().contains("Max-Age=0"));

    let me = app.get("/api/auth/me", &auth).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_writes_need_csrf_header() {
    let app = TestApp::new();
    let auth = app.session("sam", false).await;
    let Auth::Session { session, .. } = &auth else {
        unreachable!()
    };
    let without_csrf = Auth::Session {
        session: session.clone(),
        csrf: None,
    };

    let body = json!({ "name": "Drums" });
    let rejected = app
        .send(Method::POST, "/routes/categories", &without_csrf, Some(body.clone()))
        .await;
    assert_eq!(rejected.status, StatusCode::FORBIDDEN);

    // Safe methods pass without it
    assert_eq!(app.get("/routes/categories", &without_csrf).await.status, StatusCode::OK);

    let accepted = app.send(Method::POST, "/routes/categories", &auth, Some(body)).await;
    assert_eq!(accepted.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_bad_credentials() {
    let app = TestApp::new();
    app.create_user("sam", false).await;

    let response = app
        .send(
            Method::POST,
            "/api/token/",
            &Auth::Anonymous,
            Some(json!({ "username": "sam", "password": "wrong" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "No active account found with the given credentials");
}

#[tokio::test]
async fn test_token_pair_sets_cookies() {
    let app = TestApp::new();
    app.create_user("sam", false).await;

    let response = app
        .send(
            Method::POST,
            "/api/token/",
            &Auth::Anonymous,
            Some(json!({ "username": "sam", "password": PASSWORD })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["access"].is_string());
    assert!(response.body["refresh"].is_string());

    let access = response.set_cookie("access_token").unwrap();
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("SameSite=Lax"));
    // debug mode drops Secure
    assert!(!access.contains("Secure"));
    assert!(response.set_cookie("refresh_token").is_some());
}

#[tokio::test]
async fn test_access_cookie_authenticates() {
    let app = TestApp::new();
    let user = app.create_user("sam", false).await;
    let pair = app.state.tokens.create_token_pair(&user).unwrap();

    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, format!("access_token={}", pair.access))
        .body(Body::empty())
        .unwrap();
    let response = app.dispatch(request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], "sam");
}

#[tokio::test]
async fn test_refresh_then_blacklist() {
    let app = TestApp::new();
    let user = app.create_user("sam", false).await;
    let pair = app.state.tokens.create_token_pair(&user).unwrap();

    let refreshed = app
        .send(Method::POST, "/api/token/refresh", &Auth::Anonymous, Some(json!({ "refresh": pair.refresh })))
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    let access = refreshed.body["access"].as_str().unwrap().to_string();
    assert_eq!(refreshed.cookie("access_token").as_deref(), Some(access.as_str()));

    let blacklisted = app
        .send(Method::POST, "/api/token/blacklist", &Auth::Anonymous, Some(json!({ "refresh": pair.refresh })))
        .await;
    assert_eq!(blacklisted.status, StatusCode::OK);
    assert!(blacklisted.set_cookie("refresh_token").unwrap().contains("Max-Age=0"));

    let again = app
        .send(Method::POST, "/api/token/refresh", &Auth::Anonymous, Some(json!({ "refresh": pair.refresh })))
        .await;
    assert_eq!(again.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_from_cookie() {
    let app = TestApp::new();
    let user = app.create_user("sam", false).await;
    let pair = app.state.tokens.create_token_pair(&user).unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/token/refresh")
        .header(header::COOKIE, format!("refresh_token={}", pair.refresh))
        .body(Body::empty())
        .unwrap();
    let response = app.dispatch(request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["access"].is_string());
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let app = TestApp::new();
    let user = app.create_user("sam", false).await;
    let pair = app.state.tokens.create_token_pair(&user).unwrap();

    let response = app
        .send(Method::POST, "/api/token/refresh", &Auth::Anonymous, Some(json!({ "refresh": pair.access })))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_bearer_is_rejected_even_on_reads() {
    let app = TestApp::new();
    let response = app.get("/routes/vendors", &Auth::Bearer("not-a-jwt".into())).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_writes_skip_csrf() {
    let app = TestApp::new();
    let auth = app.bearer("sam", false).await;
    let response = app
        .send(Method::POST, "/routes/categories", &auth, Some(json!({ "name": "Drums" })))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_errors_carry_request_id() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/routes/vendors/999")
        .header("x-request-id", "req-abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.dispatch(request).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.headers["x-request-id"], "req-abc-123");
    assert_eq!(response.body["request_id"], "req-abc-123");
}
