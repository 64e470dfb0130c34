//! Derived-password records
//!
//! A record stores only the Argon2id PHC hash of a password; the plaintext
//! never touches disk. The same record type backs both the account password
//! and the SuprSafe+ admin password.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// File name of the account record inside the data directory
pub const ACCOUNT_RECORD_NAME: &str = "account.json";

/// File name of the admin record inside the data directory
pub const ADMIN_RECORD_NAME: &str = "admin.json";

/// Persisted derived-password record (account or admin)
#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordRecord {
    /// Argon2id PHC hash of the password (salt and parameters included)
    hash: String,
    /// Version for future migrations
    version: u32,
}

impl PasswordRecord {
    /// Record wrapping a freshly computed PHC hash
    pub fn new(hash: String) -> Self {
        Self { hash, version: 1 }
    }

    /// The stored PHC hash string
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Load a record from disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| CoreError::Storage(format!("Failed to parse password record: {}", e)))
    }

    /// Persist the record to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &contents)?;
        fs::rename(&temp_path, path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PasswordRecord([REDACTED])")
    }
}
