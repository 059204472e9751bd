//! Test role-based access to `GET /metrics`.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;

#[test]
fn test_admin_sees_cost() {
    let test = TestApp::new();
    let token = test.token_for("admin@example.com", "adminpass");

    let resp = test.get("/metrics", Some(&token));

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(rows(&resp).len(), 2);
    assert!(rows(&resp).iter().all(|row| row.get("cost_micros").is_some()));
    assert_eq!(rows(&resp)[0]["cost_micros"], 1_230_000);
    assert_eq!(resp.body["total"], 2);
    assert_eq!(resp.body["page"], 1);
    assert_eq!(resp.body["page_size"], 100);
}

#[test]
fn test_user_cannot_see_cost() {
    let test = TestApp::new();
    let token = test.token_for("user@example.com", "userpass");

    let resp = test.get("/metrics", Some(&token));

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(rows(&resp).len(), 2);
    assert!(rows(&resp).iter().all(|row| row.get("cost_micros").is_none()));
    assert_eq!(rows(&resp)[0]["clicks"], 50);
    assert_eq!(rows(&resp)[0]["date"], "2025-09-01");
    assert_eq!(resp.body["total"], 2);
}

#[test]
fn test_metrics_requires_token() {
    let test = TestApp::new();

    let resp = test.get("/metrics", None);

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_unauthenticated_wins_over_bad_query() {
    let test = TestApp::new();

    let resp = test.get("/metrics?sort_by=nonexistent_column", None);

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_health_is_public() {
    let test = TestApp::new();

    let resp = test.get("/health", None);

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["status"], "ok");
}
