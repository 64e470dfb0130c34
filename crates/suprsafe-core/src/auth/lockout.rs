//! Failed-attempt tracking and destructive lockout
//!
//! The guard is only constructed when SuprSafe+ is enabled. It counts
//! consecutive failed account-password attempts in a sidecar file next to
//! the ciphertext, so each protected directory carries its own lockout
//! state. Hitting the threshold wipes every artifact and the wrapped key
//! blob; `Locked` is terminal for that directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec;
use crate::erase::SecureEraser;
use crate::error::{CoreError, Result};

/// File name of the per-directory attempt counter
pub const ATTEMPTS_FILE_NAME: &str = "suprsafe.attempts";

/// Guard state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockoutState {
    /// Attempts below the threshold; the counter holds the current count
    Active { failed: u32 },
    /// Threshold exceeded and ciphertext wiped; terminal
    Locked,
}

/// Outcome of registering a failed attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// Still active; this many attempts remain
    Retry { remaining: u32 },
    /// Threshold reached; this many files were destroyed
    Wiped { files: usize },
}

/// Counter persisted alongside the ciphertext
#[derive(Default, Serialize, Deserialize)]
struct AttemptCounter {
    failed: u32,
    locked: bool,
}

/// Tracks failed attempts for one protected directory and wipes its
/// ciphertext once the threshold is exceeded
pub struct LockoutGuard {
    directory: PathBuf,
    threshold: u32,
    counter: AttemptCounter,
    eraser: SecureEraser,
}

impl LockoutGuard {
    /// Open the guard for a directory, loading any persisted counter
    pub fn open(directory: &Path, threshold: u32, eraser: SecureEraser) -> Result<Self> {
        if threshold == 0 {
            return Err(CoreError::InvalidInput(
                "lockout threshold must be at least 1".to_string(),
            ));
        }

        let counter_path = directory.join(ATTEMPTS_FILE_NAME);
        let counter = if counter_path.exists() {
            let contents = fs::read_to_string(&counter_path)?;
            serde_json::from_str(&contents)
                .map_err(|e| CoreError::Storage(format!("Failed to parse attempt counter: {}", e)))?
        } else {
            AttemptCounter::default()
        };

        Ok(Self {
            directory: directory.to_path_buf(),
            threshold,
            counter,
            eraser,
        })
    }

    /// Current state
    pub fn state(&self) -> LockoutState {
        if self.counter.locked {
            LockoutState::Locked
        } else {
            LockoutState::Active {
                failed: self.counter.failed,
            }
        }
    }

    /// True once the directory has been wiped
    pub fn is_locked(&self) -> bool {
        self.counter.locked
    }

    /// Attempts remaining before the wipe triggers
    pub fn remaining(&self) -> u32 {
        self.threshold.saturating_sub(self.counter.failed)
    }

    /// Reset the counter after a successful authentication
    pub fn record_success(&mut self) -> Result<()> {
        if self.counter.locked {
            return Err(CoreError::Locked);
        }

        self.counter.failed = 0;
        self.save_counter()
    }

    /// Count a failed attempt
    ///
    /// Reaching the threshold securely erases every encrypted artifact and
    /// the wrapped key blob in the directory, then transitions to `Locked`.
    pub fn record_failure(&mut self) -> Result<Attempt> {
        if self.counter.locked {
            return Err(CoreError::Locked);
        }

        self.counter.failed += 1;

        if self.counter.failed >= self.threshold {
            warn!(
                "Attempt threshold reached for {} - wiping encrypted files",
                self.directory.display()
            );
            let files = codec::wipe_dir(&self.directory, &self.eraser)?;
            self.counter.locked = true;
            self.save_counter()?;
            return Ok(Attempt::Wiped { files });
        }

        self.save_counter()?;
        Ok(Attempt::Retry {
            remaining: self.remaining(),
        })
    }

    fn save_counter(&self) -> Result<()> {
        let path = self.directory.join(ATTEMPTS_FILE_NAME);
        let contents = serde_json::to_string_pretty(&self.counter)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("attempts.tmp");
        fs::write(&temp_path, &contents)?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::KEY_BLOB_NAME;
    use tempfile::tempdir;

    fn test_guard(directory: &Path) -> LockoutGuard {
        LockoutGuard::open(directory, 3, SecureEraser::new(1)).unwrap()
    }

    fn seed_ciphertext(directory: &Path) {
        fs::write(directory.join("notes.txt.enc"), b"ciphertext").unwrap();
        fs::write(directory.join("notes.txt.enc.tag"), [0u8; 16]).unwrap();
        fs::write(directory.join("notes.txt.enc.nonce"), [0u8; 12]).unwrap();
        fs::write(directory.join(KEY_BLOB_NAME), b"wrapped").unwrap();
    }

    #[test]
    fn test_starts_active() {
        let temp_dir = tempdir().unwrap();
        let guard = test_guard(temp_dir.path());
        assert_eq!(guard.state(), LockoutState::Active { failed: 0 });
        assert_eq!(guard.remaining(), 3);
    }

    #[test]
    fn test_success_resets_counter() {
        let temp_dir = tempdir().unwrap();
        let mut guard = test_guard(temp_dir.path());

        assert_eq!(
            guard.record_failure().unwrap(),
            Attempt::Retry { remaining: 2 }
        );
        assert_eq!(
            guard.record_failure().unwrap(),
            Attempt::Retry { remaining: 1 }
        );

        guard.record_success().unwrap();
        assert_eq!(guard.state(), LockoutState::Active { failed: 0 });
        assert_eq!(guard.remaining(), 3);
    }

    #[test]
    fn test_threshold_wipes_directory() {
        let temp_dir = tempdir().unwrap();
        seed_ciphertext(temp_dir.path());

        let mut guard = test_guard(temp_dir.path());
        guard.record_failure().unwrap();
        guard.record_failure().unwrap();

        let outcome = guard.record_failure().unwrap();
        assert_eq!(outcome, Attempt::Wiped { files: 4 });
        assert!(guard.is_locked());

        assert!(!temp_dir.path().join("notes.txt.enc").exists());
        assert!(!temp_dir.path().join(KEY_BLOB_NAME).exists());
    }

    #[test]
    fn test_locked_is_terminal() {
        let temp_dir = tempdir().unwrap();
        seed_ciphertext(temp_dir.path());

        let mut guard = test_guard(temp_dir.path());
        for _ in 0..3 {
            guard.record_failure().unwrap();
        }

        assert!(matches!(guard.record_failure(), Err(CoreError::Locked)));
        assert!(matches!(guard.record_success(), Err(CoreError::Locked)));
    }

    #[test]
    fn test_counter_persists_across_reopen() {
        let temp_dir = tempdir().unwrap();

        let mut guard = test_guard(temp_dir.path());
        guard.record_failure().unwrap();
        guard.record_failure().unwrap();

        let reopened = test_guard(temp_dir.path());
        assert_eq!(reopened.state(), LockoutState::Active { failed: 2 });
        assert_eq!(reopened.remaining(), 1);
    }

    #[test]
    fn test_locked_state_persists_across_reopen() {
        let temp_dir = tempdir().unwrap();
        seed_ciphertext(temp_dir.path());

        let mut guard = test_guard(temp_dir.path());
        for _ in 0..3 {
            guard.record_failure().unwrap();
        }

        let reopened = test_guard(temp_dir.path());
        assert!(reopened.is_locked());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let temp_dir = tempdir().unwrap();
        let result = LockoutGuard::open(temp_dir.path(), 0, SecureEraser::new(1));
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_directories_do_not_share_state() {
        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();

        let mut guard_a = test_guard(dir_a.path());
        guard_a.record_failure().unwrap();
        guard_a.record_failure().unwrap();

        let guard_b = test_guard(dir_b.path());
        assert_eq!(guard_b.state(), LockoutState::Active { failed: 0 });
    }
}
