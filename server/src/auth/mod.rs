//! Authentication module.
//!
//! This module provides password hashing, access tokens and the gateway that
//! combines them with the credential store.
//!
//! # Pre-conditions
//! - The token signing secret is non-empty.
//!
//! # Post-conditions
//! - Every protected request is resolved to a fresh `SessionIdentity` or rejected.
//!
//! # Invariants
//! - Tokens carry only the subject and expiry; the role is always read from the store.

pub mod gateway;
pub mod jwt;
pub mod password;

pub use gateway::{AuthError, AuthGateway, RegistrationRejection, SessionIdentity};
pub use jwt::{TokenError, TokenService};
pub use password::{HashError, PasswordHasher};
