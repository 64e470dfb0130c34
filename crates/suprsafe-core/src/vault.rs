//! Session key management and main-key wrapping
//!
//! Each encryption batch uses a fresh random AES key and IV. In memory they
//! live only inside [`SessionKeyMaterial`] (zeroized on drop); at rest they
//! live only inside the wrapped key blob, sealed under a key derived from
//! the user's main key. Unwrapping the blob is the sole gate on the main
//! key: a wrong key fails tag verification and recovers nothing.
//!
//! # Blob format
//!
//! The blob is a single binary file inside the protected directory:
//!
//! - 16-byte derivation salt
//! - 12-byte nonce
//! - encrypted key || iv (44 bytes of ciphertext)
//! - 16-byte authentication tag

use std::fs;
use std::path::{Path, PathBuf};

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::envelope::{self, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{CoreError, Result};
use crate::kdf::{self, DeriveParams};

/// Salt length for deriving the wrapping key from the main key
pub const WRAP_SALT_SIZE: usize = 16;

/// Required main key length in characters
pub const MAIN_KEY_LENGTH: usize = 32;

/// File name of the wrapped key blob inside a protected directory
pub const KEY_BLOB_NAME: &str = "suprsafe.keys";

/// Randomly generated per-session AES key and IV
///
/// Zeroized on drop. Never persisted in plaintext form.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeyMaterial {
    key: [u8; KEY_SIZE],
    iv: [u8; NONCE_SIZE],
}

impl SessionKeyMaterial {
    /// The session AES-256 key
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    /// The session IV
    pub fn iv(&self) -> &[u8; NONCE_SIZE] {
        &self.iv
    }
}

impl std::fmt::Debug for SessionKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKeyMaterial([REDACTED])")
    }
}

/// Session key material sealed under the main key, as persisted on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedKeyBlob {
    /// Salt used to derive the wrapping key
    pub salt: [u8; WRAP_SALT_SIZE],
    /// Nonce used to seal the session material
    pub nonce: [u8; NONCE_SIZE],
    /// Encrypted key || iv
    pub ciphertext: Vec<u8>,
    /// Authentication tag
    pub tag: [u8; TAG_SIZE],
}

impl WrappedKeyBlob {
    /// Path of the blob file for a protected directory
    pub fn path_for(directory: &Path) -> PathBuf {
        directory.join(KEY_BLOB_NAME)
    }

    /// Serialize to the on-disk layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(WRAP_SALT_SIZE + NONCE_SIZE + self.ciphertext.len() + TAG_SIZE);
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes.extend_from_slice(&self.tag);
        bytes
    }

    /// Parse the on-disk layout
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < WRAP_SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(CoreError::CorruptArtifact(
                "wrapped key blob too short".to_string(),
            ));
        }

        let mut salt = [0u8; WRAP_SALT_SIZE];
        salt.copy_from_slice(&bytes[..WRAP_SALT_SIZE]);

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[WRAP_SALT_SIZE..WRAP_SALT_SIZE + NONCE_SIZE]);

        let tag_start = bytes.len() - TAG_SIZE;
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&bytes[tag_start..]);

        let ciphertext = bytes[WRAP_SALT_SIZE + NONCE_SIZE..tag_start].to_vec();

        Ok(Self {
            salt,
            nonce,
            ciphertext,
            tag,
        })
    }

    /// Persist the blob inside the protected directory
    pub fn save(&self, directory: &Path) -> Result<()> {
        let path = Self::path_for(directory);

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("keys.tmp");
        fs::write(&temp_path, self.to_bytes())?;
        fs::rename(&temp_path, &path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Load the blob from a protected directory
    ///
    /// A missing blob is a corruption condition: without it the batch is
    /// unrecoverable.
    pub fn load(directory: &Path) -> Result<Self> {
        let path = Self::path_for(directory);
        if !path.exists() {
            return Err(CoreError::CorruptArtifact(format!(
                "wrapped key blob not found in {}",
                directory.display()
            )));
        }

        Self::from_bytes(&fs::read(&path)?)
    }
}

/// Creates, wraps and unwraps session key material
pub struct KeyVault {
    params: DeriveParams,
}

impl KeyVault {
    /// Vault with production derivation parameters
    pub fn new() -> Self {
        Self {
            params: DeriveParams::default(),
        }
    }

    /// Vault with explicit derivation parameters
    pub fn with_params(params: DeriveParams) -> Self {
        Self { params }
    }

    /// Generate fresh session key material from the given random source
    pub fn create_session<R: RngCore + CryptoRng>(&self, rng: &mut R) -> SessionKeyMaterial {
        let mut key = [0u8; KEY_SIZE];
        rng.fill_bytes(&mut key);

        let mut iv = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut iv);

        SessionKeyMaterial { key, iv }
    }

    /// Seal session key material under a key derived from the main key
    pub fn wrap<R: RngCore + CryptoRng>(
        &self,
        session: &SessionKeyMaterial,
        main_key: &str,
        rng: &mut R,
    ) -> Result<WrappedKeyBlob> {
        validate_main_key(main_key)?;

        let mut salt = [0u8; WRAP_SALT_SIZE];
        rng.fill_bytes(&mut salt);

        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce);

        let wrap_key = kdf::derive_key32(main_key, &salt, self.params)?;

        let mut plaintext = Zeroizing::new(Vec::with_capacity(KEY_SIZE + NONCE_SIZE));
        plaintext.extend_from_slice(&session.key);
        plaintext.extend_from_slice(&session.iv);

        let (ciphertext, tag) = envelope::seal(&wrap_key, &nonce, &plaintext)?;

        Ok(WrappedKeyBlob {
            salt,
            nonce,
            ciphertext,
            tag,
        })
    }

    /// Reverse [`KeyVault::wrap`]
    ///
    /// The only gate on the main key: a wrong key fails tag verification
    /// with [`CoreError::Authentication`] and recovers nothing.
    pub fn unwrap(&self, blob: &WrappedKeyBlob, main_key: &str) -> Result<SessionKeyMaterial> {
        validate_main_key(main_key)?;

        let wrap_key = kdf::derive_key32(main_key, &blob.salt, self.params)?;

        let plaintext = Zeroizing::new(envelope::open(
            &wrap_key,
            &blob.nonce,
            &blob.ciphertext,
            &blob.tag,
        )?);

        if plaintext.len() != KEY_SIZE + NONCE_SIZE {
            return Err(CoreError::CorruptArtifact(
                "wrapped key blob has unexpected payload length".to_string(),
            ));
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&plaintext[..KEY_SIZE]);

        let mut iv = [0u8; NONCE_SIZE];
        iv.copy_from_slice(&plaintext[KEY_SIZE..]);

        Ok(SessionKeyMaterial { key, iv })
    }
}

impl Default for KeyVault {
    fn default() -> Self {
        Self::new()
    }
}

/// The main key is a 32-character alphanumeric secret from the companion
/// generator.
fn validate_main_key(main_key: &str) -> Result<()> {
    if main_key.is_empty() {
        return Err(CoreError::InvalidInput(
            "main key must not be empty".to_string(),
        ));
    }

    if main_key.len() != MAIN_KEY_LENGTH || !main_key.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::InvalidInput(format!(
            "main key must be exactly {} alphanumeric characters",
            MAIN_KEY_LENGTH
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::DeriveParams;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use tempfile::tempdir;

    const MAIN_KEY: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ123456";
    const WRONG_KEY: &str = "654321ZYXWVUTSRQPONMLKJIHGFEDCBA";

    fn test_vault() -> KeyVault {
        KeyVault::with_params(DeriveParams {
            memory_kb: 1024,
            iterations: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let vault = test_vault();
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let session = vault.create_session(&mut rng);
        let blob = vault.wrap(&session, MAIN_KEY, &mut rng).unwrap();

        let recovered = vault.unwrap(&blob, MAIN_KEY).unwrap();
        assert_eq!(recovered.key(), session.key());
        assert_eq!(recovered.iv(), session.iv());
    }

    #[test]
    fn test_wrong_main_key_fails_closed() {
        let vault = test_vault();
        let mut rng = ChaCha20Rng::seed_from_u64(2);

        let session = vault.create_session(&mut rng);
        let blob = vault.wrap(&session, MAIN_KEY, &mut rng).unwrap();

        let result = vault.unwrap(&blob, WRONG_KEY);
        assert!(matches!(result, Err(CoreError::Authentication)));
    }

    #[test]
    fn test_main_key_format_enforced() {
        let vault = test_vault();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let session = vault.create_session(&mut rng);

        let too_long = "A".repeat(33);
        for bad in ["", "short", "has-hyphens-so-not-alphanumeric0", too_long.as_str()] {
            let result = vault.wrap(&session, bad, &mut rng);
            assert!(
                matches!(result, Err(CoreError::InvalidInput(_))),
                "accepted bad main key: {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_sessions_are_distinct() {
        let vault = test_vault();
        let mut rng = ChaCha20Rng::seed_from_u64(4);

        let a = vault.create_session(&mut rng);
        let b = vault.create_session(&mut rng);
        assert_ne!(a.key(), b.key());
        assert_ne!(a.iv(), b.iv());
    }

    #[test]
    fn test_deterministic_rng_reproduces_session() {
        let vault = test_vault();

        let a = vault.create_session(&mut ChaCha20Rng::seed_from_u64(7));
        let b = vault.create_session(&mut ChaCha20Rng::seed_from_u64(7));
        assert_eq!(a.key(), b.key());
        assert_eq!(a.iv(), b.iv());
    }

    #[test]
    fn test_blob_bytes_roundtrip() {
        let vault = test_vault();
        let mut rng = ChaCha20Rng::seed_from_u64(5);

        let session = vault.create_session(&mut rng);
        let blob = vault.wrap(&session, MAIN_KEY, &mut rng).unwrap();

        let parsed = WrappedKeyBlob::from_bytes(&blob.to_bytes()).unwrap();
        assert_eq!(parsed, blob);
    }

    #[test]
    fn test_blob_save_load() {
        let temp_dir = tempdir().unwrap();
        let vault = test_vault();
        let mut rng = ChaCha20Rng::seed_from_u64(6);

        let session = vault.create_session(&mut rng);
        let blob = vault.wrap(&session, MAIN_KEY, &mut rng).unwrap();
        blob.save(temp_dir.path()).unwrap();

        let loaded = WrappedKeyBlob::load(temp_dir.path()).unwrap();
        assert_eq!(loaded, blob);
    }

    #[test]
    fn test_missing_blob_is_corrupt() {
        let temp_dir = tempdir().unwrap();
        let result = WrappedKeyBlob::load(temp_dir.path());
        assert!(matches!(result, Err(CoreError::CorruptArtifact(_))));
    }

    #[test]
    fn test_truncated_blob_is_corrupt() {
        let result = WrappedKeyBlob::from_bytes(&[0u8; 10]);
        assert!(matches!(result, Err(CoreError::CorruptArtifact(_))));
    }

    #[test]
    fn test_tampered_blob_fails_closed() {
        let vault = test_vault();
        let mut rng = ChaCha20Rng::seed_from_u64(8);

        let session = vault.create_session(&mut rng);
        let mut blob = vault.wrap(&session, MAIN_KEY, &mut rng).unwrap();
        blob.ciphertext[0] ^= 0x01;

        let result = vault.unwrap(&blob, MAIN_KEY);
        assert!(matches!(result, Err(CoreError::Authentication)));
    }
}
