//! Security settings persistence
//!
//! Settings live in a JSON file under the user's data directory, next to
//! the account and admin records.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::erase::DEFAULT_ERASE_PASSES;
use crate::error::Result;

/// File name of the settings file inside the data directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Default failed-attempt threshold
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Security settings for the SuprSafe installation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecuritySettings {
    /// SuprSafe+ mode: wipe ciphertext once the attempt threshold is hit
    pub suprsafe_plus: bool,
    /// Consecutive failed account-password attempts allowed
    pub max_attempts: u32,
    /// Random overwrite passes used by the secure eraser
    pub erase_passes: u32,
    /// Version for future migrations
    version: u32,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            suprsafe_plus: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            erase_passes: DEFAULT_ERASE_PASSES,
            version: 1,
        }
    }
}

impl SecuritySettings {
    /// Load settings from the data directory, or defaults if none saved yet
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::path_for(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Persist settings to the data directory
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        let path = Self::path_for(data_dir);
        let contents = serde_json::to_string_pretty(self)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &contents)?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    fn path_for(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE_NAME)
    }
}

/// Default location for records and settings
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("suprsafe")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = SecuritySettings::default();
        assert!(!settings.suprsafe_plus);
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.erase_passes, DEFAULT_ERASE_PASSES);
    }

    #[test]
    fn test_load_missing_yields_defaults() {
        let temp_dir = tempdir().unwrap();
        let settings = SecuritySettings::load(temp_dir.path()).unwrap();
        assert!(!settings.suprsafe_plus);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = tempdir().unwrap();

        let mut settings = SecuritySettings::default();
        settings.suprsafe_plus = true;
        settings.max_attempts = 5;
        settings.save(temp_dir.path()).unwrap();

        let loaded = SecuritySettings::load(temp_dir.path()).unwrap();
        assert!(loaded.suprsafe_plus);
        assert_eq!(loaded.max_attempts, 5);
    }
}
