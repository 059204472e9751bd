//! Test the CORS layer on top of the router.

use axum::body::Body;
use axum::http::{Method, Request, header};

use crate::api;
use crate::e2e_tests::helpers::*;

fn preflight(test: &TestApp, origin: &'static str) -> TestResponse {
    test.send(
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/metrics")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
            .body(Body::empty())
            .unwrap(),
    )
}

fn app_with_cors() -> TestApp {
    let mut test = TestApp::new();
    let cors = api::cors_layer(&["http://localhost:5173".to_string()]).unwrap();
    test.router = api::router(test.fixture.state.clone()).layer(cors);
    test
}

#[test]
fn test_preflight_from_allowed_origin() {
    let test = app_with_cors();

    let resp = preflight(&test, "http://localhost:5173");

    assert!(resp.status.is_success());
    assert_eq!(
        resp.headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        resp.headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[test]
fn test_preflight_from_unknown_origin() {
    let test = app_with_cors();

    let resp = preflight(&test, "https://evil.example");

    assert!(
        resp.headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}
