//! Test filtering, sorting and pagination through `GET /metrics`.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;

fn admin_app() -> (TestApp, String) {
    let test = TestApp::new();
    let token = test.token_for("admin@example.com", "adminpass");
    (test, token)
}

#[test]
fn test_filter_by_date() {
    let (test, token) = admin_app();

    let resp = test.get(
        "/metrics?start_date=2025-09-02&end_date=2025-09-02",
        Some(&token),
    );

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(account_ids(&resp), vec![2]);
    assert_eq!(resp.body["total"], 1);
}

#[test]
fn test_open_ended_range() {
    let (test, token) = admin_app();

    let resp = test.get("/metrics?end_date=2025-09-01", Some(&token));

    assert_eq!(account_ids(&resp), vec![1]);
}

#[test]
fn test_invalid_date() {
    let (test, token) = admin_app();

    let resp = test.get("/metrics?start_date=yesterday", Some(&token));

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.detail().unwrap().contains("start_date"));
}

#[test]
fn test_sort_by_unknown_column() {
    let (test, token) = admin_app();

    let resp = test.get("/metrics?sort_by=nonexistent_column", Some(&token));

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.detail(),
        Some("Invalid sort_by column: nonexistent_column")
    );
}

#[test]
fn test_sort_descending() {
    let (test, token) = admin_app();

    let desc = test.get("/metrics?sort_by=clicks&sort_dir=desc", Some(&token));
    let asc = test.get("/metrics?sort_by=clicks&sort_dir=ASC", Some(&token));

    assert_eq!(account_ids(&desc), vec![2, 1]);
    assert_eq!(account_ids(&asc), vec![1, 2]);
}

#[test]
fn test_page_size_one_walks_rows() {
    let (test, token) = admin_app();

    let first = test.get("/metrics?sort_by=date&page=1&page_size=1", Some(&token));
    let second = test.get("/metrics?sort_by=date&page=2&page_size=1", Some(&token));
    let third = test.get("/metrics?sort_by=date&page=3&page_size=1", Some(&token));

    assert_eq!(account_ids(&first), vec![1]);
    assert_eq!(account_ids(&second), vec![2]);
    assert!(rows(&third).is_empty());
    for resp in [&first, &second, &third] {
        assert_eq!(resp.body["total"], 2);
        assert_eq!(resp.body["page_size"], 1);
    }
}

#[test]
fn test_pagination_is_clamped() {
    let (test, token) = admin_app();

    let resp = test.get("/metrics?page=0&page_size=5000", Some(&token));

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["page"], 1);
    assert_eq!(resp.body["page_size"], 1000);
    assert_eq!(rows(&resp).len(), 2);
}

#[test]
fn test_non_integer_page_is_rejected() {
    let (test, token) = admin_app();

    let resp = test.get("/metrics?page=first", Some(&token));

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}
