//! Credential store.
//!
//! Holds the allow-listed user records in memory, guarded by an `RwLock`,
//! and writes the complete table through a [`UserPersistence`] backend on
//! every change.
//!
//! # Invariants
//!
//! - Emails are unique within the store (checked on load).
//! - A record's password hash goes from unset to set at most once.
//! - The in-memory table never holds a change the backend failed to persist.

mod persistence;
mod role;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::RwLock;

pub use persistence::{CsvUserFile, MemoryPersistence, UserPersistence};
pub use role::{Capabilities, Role};

/// One row of the users table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Unique, case-sensitive identifier.
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    /// Absent until the user registers.
    pub password_hash: Option<String>,
}

impl UserRecord {
    /// Whether a password has been set for this user.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.password_hash
            .as_deref()
            .is_some_and(|hash| !hash.trim().is_empty())
    }
}

/// Error returned by the credential store.
#[derive(Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The backing file is not a valid users table.
    Csv { path: PathBuf, message: String },
    /// Two rows share an email.
    DuplicateEmail(String),
    /// A row names a role that does not exist.
    InvalidRole { email: String, role: String },
    /// A thread panicked while holding the store lock.
    LockPoisoned,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
            Self::Csv { path, message } => {
                write!(f, "invalid users table {}: {message}", path.display())
            }
            Self::DuplicateEmail(email) => write!(f, "duplicate user email: {email}"),
            Self::InvalidRole { email, role } => {
                write!(f, "invalid role '{role}' for user {email}")
            }
            Self::LockPoisoned => write!(f, "user store lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Outcome of [`UserStore::set_initial_password_hash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashUpdate {
    /// The hash was written and persisted.
    Updated,
    /// No record has this email.
    UnknownEmail,
    /// The record already has a password hash.
    AlreadySet,
}

/// In-memory users table with write-through persistence.
pub struct UserStore {
    users: RwLock<Vec<UserRecord>>,
    persistence: Box<dyn UserPersistence>,
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore").finish_non_exhaustive()
    }
}

impl UserStore {
    /// Load the table from `persistence` and keep it as the write target.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or two rows share an email.
    pub fn open(persistence: Box<dyn UserPersistence>) -> Result<Self, StoreError> {
        let users = persistence.load()?;

        let mut seen = HashSet::with_capacity(users.len());
        for user in &users {
            if !seen.insert(user.email.as_str()) {
                return Err(StoreError::DuplicateEmail(user.email.clone()));
            }
        }

        Ok(Self {
            users: RwLock::new(users),
            persistence,
        })
    }

    /// Look up a user by exact email.
    pub fn find(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(users.iter().find(|user| user.email == email).cloned())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(users.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Set the password hash of an unregistered user and persist the table.
    ///
    /// The check, the write and the persist happen under one write lock, so
    /// two concurrent calls for the same email cannot both succeed and no
    /// reader sees a hash that is not yet on disk. If persisting fails the
    /// in-memory record is restored before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or the backend fails to save.
    #[allow(clippy::significant_drop_tightening)] // The lock must cover the persist.
    pub fn set_initial_password_hash(
        &self,
        email: &str,
        password_hash: String,
    ) -> Result<HashUpdate, StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::LockPoisoned)?;

        let Some(index) = users.iter().position(|user| user.email == email) else {
            return Ok(HashUpdate::UnknownEmail);
        };
        let Some(user) = users.get_mut(index) else {
            return Ok(HashUpdate::UnknownEmail);
        };
        if user.is_registered() {
            return Ok(HashUpdate::AlreadySet);
        }
        let previous = user.password_hash.replace(password_hash);

        if let Err(error) = self.persistence.save(&users) {
            if let Some(user) = users.get_mut(index) {
                user.password_hash = previous;
            }
            return Err(error);
        }

        Ok(HashUpdate::Updated)
    }
}
