//! Access token issuance and verification.
//!
//! Tokens are HS256 JSON Web Tokens carrying the user's email in the `sub`
//! claim and an absolute expiry in `exp`.
//!
//! # Pre-conditions
//! - The signing secret must be non-empty.
//!
//! # Post-conditions
//! - On success, `validate` returns the subject extracted from the `sub` claim.
//! - On failure, `validate` returns a descriptive error and never panics.
//!
//! # Invariants
//! - A token is valid while `now < exp` and expired from `exp` onward. No
//!   leeway is applied.
//! - Verification does not modify any state; there is no revocation list.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject claim containing the user's email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    /// Issued-at, seconds since the Unix epoch.
    #[serde(default)]
    iat: u64,
    /// Expiry, seconds since the Unix epoch.
    exp: u64,
}

/// Error returned when issuing or verifying a token fails.
#[derive(Debug)]
pub enum TokenError {
    /// The JWT signature is invalid.
    InvalidSignature,
    /// The JWT has expired.
    TokenExpired,
    /// The JWT is malformed or cannot be parsed.
    MalformedToken,
    /// The 'sub' claim is missing from the JWT.
    MissingSubClaim,
    /// The signing key could not be used.
    InvalidKey(String),
    /// The token could not be encoded.
    Encoding(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid JWT signature"),
            Self::TokenExpired => write!(f, "JWT has expired"),
            Self::MalformedToken => write!(f, "malformed JWT"),
            Self::MissingSubClaim => write!(f, "missing 'sub' claim in JWT"),
            Self::InvalidKey(reason) => write!(f, "invalid key: {reason}"),
            Self::Encoding(reason) => write!(f, "failed to encode JWT: {reason}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Issues and validates signed, time-limited access tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service signing with `secret`.
    ///
    /// # Errors
    /// Returns `TokenError::InvalidKey` if the secret is empty.
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::InvalidKey("secret must be non-empty".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock in `validate`.
        validation.validate_exp = false;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            clock,
        })
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    ///
    /// # Errors
    /// Returns `TokenError::Encoding` if the token cannot be signed.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        let iat = self.clock.now_secs();
        let claims = Claims {
            sub: Some(subject.to_string()),
            iat,
            exp: iat.saturating_add(ttl.as_secs()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify a token and extract its subject.
    ///
    /// # Errors
    /// Returns `TokenError` if the token is malformed, carries a bad
    /// signature, has no subject, or has expired.
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(map_jwt_error)?;
        let claims = token_data.claims;

        if self.clock.now_secs() >= claims.exp {
            return Err(TokenError::TokenExpired);
        }

        match claims.sub {
            Some(subject) if !subject.is_empty() => Ok(subject),
            _ => Err(TokenError::MissingSubClaim),
        }
    }
}

/// Maps jsonwebtoken errors to our `TokenError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::TokenExpired,
        ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => TokenError::MissingSubClaim,
        _ => TokenError::MalformedToken,
    }
}
