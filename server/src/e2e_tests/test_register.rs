//! Test `POST /register`.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;

#[test]
fn test_register_allow_listed_user_then_login() {
    let test = TestApp::new();

    let resp = test.register("new@example.com", "fresh-pass");

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, serde_json::json!({"msg": "registered"}));

    let token = test.token_for("new@example.com", "fresh-pass");
    let me = test.get("/me", Some(&token));
    assert_eq!(me.body["email"], "new@example.com");
    assert_eq!(me.body["role"], "user");
}

#[test]
fn test_register_persists_hash() {
    let test = TestApp::new();

    test.register("new@example.com", "fresh-pass");

    let saved = test.fixture.persisted_users();
    let user = saved
        .iter()
        .find(|user| user.email == "new@example.com")
        .unwrap();
    assert!(user.is_registered());
    assert_ne!(user.password_hash.as_deref(), Some("fresh-pass"));
}

#[test]
fn test_register_unknown_email() {
    let test = TestApp::new();

    let resp = test.register("stranger@example.com", "whatever");

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.detail(), Some("Email not found in allowed users"));
    assert_eq!(
        test.login("stranger@example.com", "whatever").status,
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn test_register_already_registered() {
    let test = TestApp::new();

    for password in ["adminpass", "something-else"] {
        let resp = test.register("admin@example.com", password);
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.detail(), Some("User already registered; use login"));
    }

    // The first password still works and the new one does not.
    assert_eq!(
        test.login("admin@example.com", "adminpass").status,
        StatusCode::OK
    );
    assert_eq!(
        test.login("admin@example.com", "something-else").status,
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn test_register_twice_second_fails() {
    let test = TestApp::new();

    assert_eq!(test.register("new@example.com", "first").status, StatusCode::OK);
    let second = test.register("new@example.com", "second");

    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.detail(), Some("User already registered; use login"));
}

#[test]
fn test_register_messages_differ_from_login() {
    let test = TestApp::new();

    let register = test.register("stranger@example.com", "x");
    let login = test.login("stranger@example.com", "x");

    assert_ne!(register.detail(), login.detail());
}
