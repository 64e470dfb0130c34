//! Password-based key derivation
//!
//! Every secret the user types (account password, admin password, main key)
//! is stretched with Argon2id before it touches any cipher. Derivation is
//! deliberately slow; callers should expect a noticeable pause.

use argon2::Argon2;
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};

/// Argon2id parameters for key derivation
const ARGON2_MEMORY_KB: u32 = 64 * 1024; // 64 MB
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_PARALLELISM: u32 = 1;

/// Tunable Argon2id cost parameters
///
/// The defaults are the production values. Tests lower them to keep
/// derivation fast.
#[derive(Clone, Copy, Debug)]
pub struct DeriveParams {
    /// Memory cost in KiB
    pub memory_kb: u32,
    /// Number of iterations
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for DeriveParams {
    fn default() -> Self {
        Self {
            memory_kb: ARGON2_MEMORY_KB,
            iterations: ARGON2_ITERATIONS,
            parallelism: ARGON2_PARALLELISM,
        }
    }
}

impl DeriveParams {
    /// Build an Argon2id instance for these parameters
    pub(crate) fn argon2(&self, output_len: Option<usize>) -> Result<Argon2<'static>> {
        let params = argon2::Params::new(
            self.memory_kb,
            self.iterations,
            self.parallelism,
            output_len,
        )
        .map_err(|e| CoreError::Crypto(format!("Invalid Argon2 params: {}", e)))?;

        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }
}

/// Derive `length` bytes from a password and salt using the default parameters
///
/// Deterministic for a fixed `(password, salt)` pair.
pub fn derive(password: &str, salt: &[u8], length: usize) -> Result<Zeroizing<Vec<u8>>> {
    derive_with(password, salt, length, DeriveParams::default())
}

/// Derive `length` bytes with explicit cost parameters
pub fn derive_with(
    password: &str,
    salt: &[u8],
    length: usize,
    params: DeriveParams,
) -> Result<Zeroizing<Vec<u8>>> {
    if password.is_empty() {
        return Err(CoreError::InvalidInput(
            "password must not be empty".to_string(),
        ));
    }

    let argon2 = params.argon2(Some(length))?;

    let mut out = Zeroizing::new(vec![0u8; length]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|e| CoreError::Crypto(format!("Key derivation failed: {}", e)))?;

    Ok(out)
}

/// Derive a 32-byte key (the common case for cipher keys)
pub fn derive_key32(password: &str, salt: &[u8], params: DeriveParams) -> Result<Zeroizing<[u8; 32]>> {
    let bytes = derive_with(password, salt, 32, params)?;
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> DeriveParams {
        DeriveParams {
            memory_kb: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_derive_deterministic() {
        let salt = [0x42u8; 16];
        let key1 = derive_with("correct horse", &salt, 32, fast_params()).unwrap();
        let key2 = derive_with("correct horse", &salt, 32, fast_params()).unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn test_derive_differs_by_salt() {
        let key1 = derive_with("correct horse", &[0x01u8; 16], 32, fast_params()).unwrap();
        let key2 = derive_with("correct horse", &[0x02u8; 16], 32, fast_params()).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn test_derive_differs_by_password() {
        let salt = [0x42u8; 16];
        let key1 = derive_with("correct horse", &salt, 32, fast_params()).unwrap();
        let key2 = derive_with("battery staple", &salt, 32, fast_params()).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn test_empty_password_rejected() {
        let salt = [0x42u8; 16];
        let result = derive_with("", &salt, 32, fast_params());
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_requested_length_honored() {
        let salt = [0x42u8; 16];
        let bytes = derive_with("correct horse", &salt, 64, fast_params()).unwrap();
        assert_eq!(bytes.len(), 64);
    }
}
