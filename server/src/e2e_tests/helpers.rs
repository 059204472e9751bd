//! Common helpers for end-to-end tests.

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use tower::ServiceExt;

use crate::api;
use crate::testing::TestState;

/// A decoded HTTP response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, or the raw text as a JSON string when it is not JSON.
    pub body: serde_json::Value,
}

impl TestResponse {
    /// The `detail` message of an error body.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.body.get("detail").and_then(serde_json::Value::as_str)
    }
}

/// Router over fixture data, driven synchronously from `#[test]` functions.
pub struct TestApp {
    pub router: Router,
    pub runtime: tokio::runtime::Runtime,
    pub fixture: TestState,
}

impl TestApp {
    /// Create an app over the default fixtures.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fixture(TestState::new())
    }

    #[must_use]
    pub fn with_fixture(fixture: TestState) -> Self {
        let router = api::router(fixture.state.clone());

        #[allow(clippy::expect_used)]
        let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

        Self {
            router,
            runtime,
            fixture,
        }
    }

    /// Send a request and decode the response.
    #[allow(clippy::expect_used)]
    pub fn send(&self, request: Request<Body>) -> TestResponse {
        self.runtime.block_on(async {
            let response = self
                .router
                .clone()
                .oneshot(request)
                .await
                .expect("router is infallible");
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("Failed to read body");
            let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            });

            TestResponse {
                status,
                headers,
                body,
            }
        })
    }

    /// `POST /token` with a form body.
    pub fn login(&self, email: &str, password: &str) -> TestResponse {
        let body = format!(
            "username={}&password={}",
            url_encode(email),
            url_encode(password)
        );
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
    }

    /// Log in and return the access token.
    pub fn token_for(&self, email: &str, password: &str) -> String {
        let response = self.login(email, password);
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response.body["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// `POST /register` with query parameters.
    pub fn register(&self, email: &str, password: &str) -> TestResponse {
        let uri = format!(
            "/register?email={}&password={}",
            url_encode(email),
            url_encode(password)
        );
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
    }

    /// `GET` with an optional bearer token.
    pub fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap())
    }
}

/// Percent-encode everything outside the unreserved set.
pub fn url_encode(value: &str) -> String {
    value
        .bytes()
        .map(|byte| match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                char::from(byte).to_string()
            }
            _ => format!("%{byte:02X}"),
        })
        .collect()
}

/// Rows of a `/metrics` response.
pub fn rows(response: &TestResponse) -> &Vec<serde_json::Value> {
    response.body["data"].as_array().unwrap()
}

/// `account_id` of each row of a `/metrics` response.
pub fn account_ids(response: &TestResponse) -> Vec<i64> {
    rows(response)
        .iter()
        .map(|row| row["account_id"].as_i64().unwrap())
        .collect()
}
