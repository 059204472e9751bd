//! Test `POST /token`.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;

#[test]
fn test_login_success_returns_bearer_token() {
    let test = TestApp::new();

    let resp = test.login("admin@example.com", "adminpass");

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["token_type"], "bearer");
    let token = resp.body["access_token"].as_str().unwrap();
    assert_eq!(token.split('.').count(), 3);

    let me = test.get("/me", Some(token));
    assert_eq!(me.body["email"], "admin@example.com");
}

#[test]
fn test_login_failures_share_one_response() {
    let test = TestApp::new();

    let wrong_password = test.login("admin@example.com", "wrong");
    let unknown_email = test.login("nobody@example.com", "adminpass");
    let unregistered = test.login("new@example.com", "anything");

    for resp in [&wrong_password, &unknown_email, &unregistered] {
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.detail(), Some("Incorrect email or password"));
    }
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(unknown_email.body, unregistered.body);
}

#[test]
fn test_login_email_is_case_sensitive() {
    let test = TestApp::new();

    let resp = test.login("Admin@Example.com", "adminpass");

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[test]
fn test_login_missing_field_is_rejected() {
    let test = TestApp::new();

    let resp = test.send(
        axum::http::Request::builder()
            .method(axum::http::Method::POST)
            .uri("/token")
            .header(
                axum::http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(axum::body::Body::from("username=admin%40example.com"))
            .unwrap(),
    );

    assert!(resp.status.is_client_error());
}
