//! Account and admin password verification
//!
//! Verification re-derives the hash with the parameters and salt embedded
//! in the stored PHC string and compares in constant time. The gate holds
//! no attempt state; lockout is the guard's job.

use std::path::{Path, PathBuf};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use zeroize::Zeroizing;

use super::record::{PasswordRecord, ACCOUNT_RECORD_NAME, ADMIN_RECORD_NAME};
use crate::error::{CoreError, Result};

/// Verifies a password against a stored derived-password record
pub struct AccountGate {
    record_path: PathBuf,
    record: Option<PasswordRecord>,
}

impl AccountGate {
    /// Gate backed by the account record in `data_dir`
    pub fn account(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir.join(ACCOUNT_RECORD_NAME))
    }

    /// Gate backed by the SuprSafe+ admin record in `data_dir`
    pub fn admin(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir.join(ADMIN_RECORD_NAME))
    }

    /// Gate backed by an explicit record path
    pub fn open(record_path: PathBuf) -> Result<Self> {
        let record = if record_path.exists() {
            Some(PasswordRecord::load(&record_path)?)
        } else {
            None
        };

        Ok(Self {
            record_path,
            record,
        })
    }

    /// True once a password has been set
    pub fn is_initialized(&self) -> bool {
        self.record.is_some()
    }

    /// First-run setup: hash the password under a fresh random salt
    pub fn initialize(&mut self, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(CoreError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_bytes = Zeroizing::new(password.as_bytes().to_vec());

        let hash = argon2
            .hash_password(&password_bytes, &salt)
            .map_err(|e| CoreError::Crypto(format!("Failed to hash password: {}", e)))?
            .to_string();

        let record = PasswordRecord::new(hash);
        record.save(&self.record_path)?;
        self.record = Some(record);

        Ok(())
    }

    /// Constant-time password check
    ///
    /// Returns `Ok(false)` on a mismatch; errors are reserved for a missing
    /// record or a malformed stored hash.
    pub fn verify(&self, password: &str) -> Result<bool> {
        let record = self.record.as_ref().ok_or(CoreError::AccountNotInitialized)?;

        let parsed_hash = PasswordHash::new(record.hash())
            .map_err(|e| CoreError::Crypto(format!("Invalid stored hash: {}", e)))?;

        let password_bytes = Zeroizing::new(password.as_bytes().to_vec());
        Ok(Argon2::default()
            .verify_password(&password_bytes, &parsed_hash)
            .is_ok())
    }
}
