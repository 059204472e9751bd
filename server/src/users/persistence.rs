//! Durable backing for the credential store.
//!
//! The store keeps every record in memory and hands the whole table to a
//! [`UserPersistence`] implementation whenever it changes. The table is
//! always rewritten wholesale.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::{Role, StoreError, UserRecord};

/// Loads and saves the complete users table.
pub trait UserPersistence: Send + Sync {
    /// Read every stored user record.
    fn load(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Replace the stored table with `users`.
    ///
    /// Must not return until the data is durable, or fail.
    fn save(&self, users: &[UserRecord]) -> Result<(), StoreError>;
}

impl<T: UserPersistence + ?Sized> UserPersistence for Arc<T> {
    fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        (**self).load()
    }

    fn save(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        (**self).save(users)
    }
}

/// One line of `users.csv`.
#[derive(Debug, Serialize, Deserialize)]
struct UserCsvRow {
    email: String,
    #[serde(default)]
    full_name: Option<String>,
    role: String,
    #[serde(default)]
    password_hash: Option<String>,
}

/// Users table stored as a CSV file with the header
/// `email,full_name,role,password_hash`.
#[derive(Debug, Clone)]
pub struct CsvUserFile {
    path: PathBuf,
}

impl CsvUserFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn csv_error(&self, error: &csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.clone(),
            message: error.to_string(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Directory the temp file is created in, so the final rename stays on
    /// one filesystem.
    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl UserPersistence for CsvUserFile {
    fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.csv_error(&e))?;

        let mut users = Vec::new();
        for row in reader.deserialize::<UserCsvRow>() {
            let row = row.map_err(|e| self.csv_error(&e))?;
            let role = Role::parse(&row.role).ok_or_else(|| StoreError::InvalidRole {
                email: row.email.clone(),
                role: row.role.clone(),
            })?;
            users.push(UserRecord {
                email: row.email,
                full_name: row.full_name.filter(|name| !name.is_empty()),
                role,
                password_hash: row.password_hash.filter(|hash| !hash.trim().is_empty()),
            });
        }

        tracing::debug!("loaded {} users from {}", users.len(), self.path.display());
        Ok(users)
    }

    fn save(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        // Write next to the target and rename over it so a crash mid-write
        // never leaves a truncated table behind. The temp file is removed
        // when `temp` drops on any early return.
        let mut temp = NamedTempFile::new_in(self.directory()).map_err(|e| self.io_error(e))?;

        {
            let mut writer = csv::Writer::from_writer(temp.as_file_mut());
            for user in users {
                let row = UserCsvRow {
                    email: user.email.clone(),
                    full_name: user.full_name.clone(),
                    role: user.role.as_str().to_string(),
                    password_hash: user.password_hash.clone(),
                };
                writer.serialize(row).map_err(|e| self.csv_error(&e))?;
            }
            writer.flush().map_err(|e| self.io_error(e))?;
        }

        temp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        temp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::debug!("persisted {} users to {}", users.len(), self.path.display());
        Ok(())
    }
}

/// In-process persistence that keeps the last saved table in memory.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    users: Mutex<Vec<UserRecord>>,
}

impl MemoryPersistence {
    #[must_use]
    pub const fn new(users: Vec<UserRecord>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    /// The table as of the last successful save.
    pub fn snapshot(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.users
            .lock()
            .map(|users| users.clone())
            .map_err(|_| StoreError::LockPoisoned)
    }
}

impl UserPersistence for MemoryPersistence {
    fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.snapshot()
    }

    fn save(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        let mut stored = self.users.lock().map_err(|_| StoreError::LockPoisoned)?;
        users.clone_into(&mut *stored);
        Ok(())
    }
}
