/// Router-level authentication tests
///
/// Every request here is rejected by the session middleware before any
/// query runs, so the router sits on a lazily connected pool and no
/// database is needed.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::{lazy_app, send, TEST_ISSUER, TEST_SECRET};
use teamboard_shared::auth::jwt::{create_token, SessionClaims};

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = lazy_app();

    for uri in ["/v1/me", "/v1/organizations", "/v1/notifications/unread-count"] {
        let (status, headers, body) = send(&app, Method::GET, uri, None, None, &[]).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["error"], "unauthorized");
        assert!(headers.contains_key("x-request-id"));
    }
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let app = lazy_app();

    let (status, _, body) = send(
        &app,
        Method::GET,
        "/v1/me",
        None,
        None,
        &[("authorization", "Basic dXNlcjpwYXNz")],
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Expected Bearer token");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = lazy_app();

    let (status, _, _) = send(&app, Method::GET, "/v1/me", Some("not.a.jwt"), None, &[]).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let app = lazy_app();
    let claims = SessionClaims::new("test|forged", "forged@example.com", TEST_ISSUER, Duration::hours(1));
    let token = create_token(&claims, "some-other-secret-that-is-long-enough").unwrap();

    let (status, _, _) = send(&app, Method::GET, "/v1/me", Some(&token), None, &[]).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_issuer_is_unauthorized() {
    let app = lazy_app();
    let claims = SessionClaims::new("test|x", "x@example.com", "https://evil.example/", Duration::hours(1));
    let token = create_token(&claims, TEST_SECRET).unwrap();

    let (status, _, body) = send(&app, Method::GET, "/v1/me", Some(&token), None, &[]).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid issuer");
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = lazy_app();
    let claims = SessionClaims::new("test|x", "x@example.com", TEST_ISSUER, Duration::hours(-2));
    let token = create_token(&claims, TEST_SECRET).unwrap();

    let (status, _, body) = send(&app, Method::GET, "/v1/me", Some(&token), None, &[]).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token expired");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = lazy_app();

    let (_, headers, _) = send(
        &app,
        Method::GET,
        "/v1/me",
        None,
        None,
        &[("x-request-id", "trace-abc-123")],
    )
    .await;

    assert_eq!(headers.get("x-request-id").unwrap(), "trace-abc-123");
}
