//! Password hashing.
//!
//! Wraps bcrypt so callers never touch the algorithm directly.
//!
//! # Post-conditions
//! - `hash` embeds a fresh random salt; hashing the same input twice yields
//!   different strings.
//! - `verify` never fails on malformed input; a hash it cannot parse simply
//!   does not match.

/// Error returned when a password cannot be hashed.
#[derive(Debug)]
pub struct HashError(String);

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "password hashing failed: {}", self.0)
    }
}

impl std::error::Error for HashError {}

/// Salted one-way password hasher.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    /// Lowest work factor bcrypt accepts. Only suitable for tests.
    pub const MIN_COST: u32 = 4;

    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash `plaintext` with a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured cost is outside bcrypt's range.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| HashError(e.to_string()))
    }

    /// Check `plaintext` against a stored hash.
    #[must_use]
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        if hash.trim().is_empty() {
            return false;
        }
        bcrypt::verify(plaintext, hash).unwrap_or_else(|e| {
            tracing::debug!("treating unverifiable password hash as mismatch: {e}");
            false
        })
    }
}
