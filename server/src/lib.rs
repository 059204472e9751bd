// Life of a request:
// 1. HTTP request comes in through the axum router
// 2. Protected routes resolve the bearer token:
//     - Verify signature and expiry
//     - Look the subject up in the user store (role is never taken from the token)
// 3. For login / registration:
//     - Verify or hash the password off the async runtime
//     - Issue a token, or write the first hash through to users.csv
//    For metrics:
//     - Filter by date, sort, count, paginate
//     - Drop cost columns the caller's role may not see
//
// System components:
//  - Credential store (users.csv)
//  - Token service and password hasher
//  - Metrics table and query engine

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod users;
