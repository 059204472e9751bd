//! Login, registration and per-request identity resolution.
//!
//! Combines the credential store, the password hasher and the token service.
//!
//! Login failures are deliberately indistinguishable: an unknown email, an
//! unregistered user and a wrong password all produce the same error.
//! Registration failures name their reason, which reveals allow-list
//! membership.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::jwt::{TokenError, TokenService};
use super::password::{HashError, PasswordHasher};
use crate::users::{HashUpdate, Role, StoreError, UserStore};

/// Who is making a request, resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionIdentity {
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
}

/// Why a registration was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationRejection {
    /// The email is not on the allow-list.
    NotAllowed,
    /// The user already has a password.
    AlreadyRegistered,
}

impl RegistrationRejection {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotAllowed => "Email not found in allowed users",
            Self::AlreadyRegistered => "User already registered; use login",
        }
    }
}

/// Error returned by the auth gateway.
#[derive(Debug)]
pub enum AuthError {
    /// Missing, invalid or expired token, or the token's user is gone.
    Unauthenticated,
    /// Login failed. Carries no detail on purpose.
    InvalidCredentials,
    /// Registration was refused.
    RegistrationRejected(RegistrationRejection),
    /// The credential store failed.
    Storage(StoreError),
    /// The password could not be hashed.
    Hashing(HashError),
    /// A token could not be issued.
    TokenIssue(TokenError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "could not validate credentials"),
            Self::InvalidCredentials => write!(f, "incorrect email or password"),
            Self::RegistrationRejected(reason) => {
                write!(f, "registration rejected: {}", reason.message())
            }
            Self::Storage(e) => write!(f, "credential store error: {e}"),
            Self::Hashing(e) => write!(f, "{e}"),
            Self::TokenIssue(e) => write!(f, "token issuance failed: {e}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        Self::Storage(error)
    }
}

/// Authentication entry point shared by all requests.
#[derive(Debug)]
pub struct AuthGateway {
    users: Arc<UserStore>,
    hasher: PasswordHasher,
    tokens: TokenService,
    token_ttl: Duration,
}

impl AuthGateway {
    #[must_use]
    pub const fn new(
        users: Arc<UserStore>,
        hasher: PasswordHasher,
        tokens: TokenService,
        token_ttl: Duration,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            token_ttl,
        }
    }

    #[must_use]
    pub const fn users(&self) -> &Arc<UserStore> {
        &self.users
    }

    /// Check an email/password pair and issue an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email, an
    /// unregistered user or a wrong password.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let Some(user) = self.users.find(email)? else {
            tracing::debug!("login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let Some(hash) = user.password_hash.as_deref().filter(|_| user.is_registered()) else {
            tracing::debug!("login rejected: user has not registered");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, hash) {
            tracing::debug!("login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&user.email, self.token_ttl)
            .map_err(AuthError::TokenIssue)?;
        tracing::info!(role = %user.role, "issued access token");
        Ok(token)
    }

    /// Set the first password of an allow-listed user.
    ///
    /// The hash is computed before the store lock is taken; the store then
    /// re-checks, writes and persists atomically.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RegistrationRejected` if the email is unknown or
    /// already registered, and `AuthError::Storage` if the table could not be
    /// persisted (the user stays unregistered).
    pub fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        match self.users.find(email)? {
            None => return Err(Self::rejected(RegistrationRejection::NotAllowed)),
            Some(user) if user.is_registered() => {
                return Err(Self::rejected(RegistrationRejection::AlreadyRegistered));
            }
            Some(_) => {}
        }

        let hash = self.hasher.hash(password).map_err(AuthError::Hashing)?;

        match self.users.set_initial_password_hash(email, hash)? {
            HashUpdate::Updated => {
                tracing::info!("registered allow-listed user");
                Ok(())
            }
            HashUpdate::UnknownEmail => Err(Self::rejected(RegistrationRejection::NotAllowed)),
            HashUpdate::AlreadySet => {
                Err(Self::rejected(RegistrationRejection::AlreadyRegistered))
            }
        }
    }

    /// Resolve a bearer token to the current identity of its subject.
    ///
    /// The role is read from the store on every call, so role changes apply
    /// to outstanding tokens from the next request on.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the token does not validate or
    /// its subject is no longer in the store.
    pub fn resolve(&self, token: &str) -> Result<SessionIdentity, AuthError> {
        let email = self.tokens.validate(token).map_err(|e| {
            tracing::debug!("rejecting bearer token: {e}");
            AuthError::Unauthenticated
        })?;

        let Some(user) = self.users.find(&email)? else {
            tracing::debug!("rejecting bearer token: subject no longer exists");
            return Err(AuthError::Unauthenticated);
        };

        Ok(SessionIdentity {
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        })
    }

    fn rejected(reason: RegistrationRejection) -> AuthError {
        tracing::debug!("registration rejected: {}", reason.message());
        AuthError::RegistrationRejected(reason)
    }
}
