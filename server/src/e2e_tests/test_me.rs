//! Test `GET /me` and bearer token handling.

use std::sync::Arc;

use axum::http::{StatusCode, header};

use crate::clock::ManualClock;
use crate::e2e_tests::helpers::*;
use crate::testing::{TOKEN_TTL, TestState};

#[test]
fn test_me_returns_identity() {
    let test = TestApp::new();
    let token = test.token_for("user@example.com", "userpass");

    let resp = test.get("/me", Some(&token));

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.body,
        serde_json::json!({
            "email": "user@example.com",
            "full_name": "User",
            "role": "user"
        })
    );
}

#[test]
fn test_me_without_token() {
    let test = TestApp::new();

    let resp = test.get("/me", None);

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.detail(), Some("Could not validate credentials"));
    assert_eq!(resp.headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
}

#[test]
fn test_me_with_garbage_token() {
    let test = TestApp::new();

    let resp = test.get("/me", Some("not.a.token"));

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_me_with_tampered_token() {
    let test = TestApp::new();
    let token = test.token_for("user@example.com", "userpass");
    let mut tampered = token.clone();
    tampered.push('x');

    let resp = test.get("/me", Some(&tampered));

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_me_with_expired_token() {
    let clock = Arc::new(ManualClock::new(1_757_000_000));
    let test = TestApp::with_fixture(TestState::with_manual_clock(&clock));
    let token = test.token_for("admin@example.com", "adminpass");

    clock.advance(TOKEN_TTL.as_secs() - 1);
    assert_eq!(test.get("/me", Some(&token)).status, StatusCode::OK);

    clock.advance(1);
    let resp = test.get("/me", Some(&token));
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(test.get("/metrics", Some(&token)).status, StatusCode::UNAUTHORIZED);
}
