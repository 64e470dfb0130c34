//! Authenticated encryption envelope
//!
//! AES-256-GCM seal/open with a detached authentication tag. Nonce
//! uniqueness per key is the caller's contract; a reused nonce breaks the
//! authenticity guarantee, not just confidentiality.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};

use crate::error::{CoreError, Result};

/// AES-256 key size in bytes
pub const KEY_SIZE: usize = 32;

/// GCM nonce size in bytes
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Encrypt a buffer, returning ciphertext and the detached tag
pub fn seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_SIZE])> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CoreError::Crypto(format!("Failed to create cipher: {}", e)))?;

    let mut combined = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CoreError::Crypto(format!("Encryption failed: {}", e)))?;

    // The aead API appends the tag; split it off for separate storage.
    let tag_start = combined.len() - TAG_SIZE;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&combined[tag_start..]);
    combined.truncate(tag_start);

    Ok((combined, tag))
}

/// Decrypt and verify a buffer
///
/// Fails closed: a tag mismatch yields [`CoreError::Authentication`] and no
/// plaintext, partial or otherwise.
pub fn open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    tag: &[u8; TAG_SIZE],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CoreError::Crypto(format!("Failed to create cipher: {}", e)))?;

    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::from_slice(nonce), combined.as_slice())
        .map_err(|_| CoreError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_SIZE] = [0x10; KEY_SIZE];
    const NONCE: [u8; NONCE_SIZE] = [0x20; NONCE_SIZE];

    #[test]
    fn test_seal_open_roundtrip() {
        let (ciphertext, tag) = seal(&KEY, &NONCE, b"hello world").unwrap();
        assert_ne!(ciphertext.as_slice(), b"hello world");

        let plaintext = open(&KEY, &NONCE, &ciphertext, &tag).unwrap();
        assert_eq!(plaintext, b"hello world");
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let (ciphertext, tag) = seal(&KEY, &NONCE, b"").unwrap();
        assert!(ciphertext.is_empty());

        let plaintext = open(&KEY, &NONCE, &ciphertext, &tag).unwrap();
        assert!(plaintext.is_empty());
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let (mut ciphertext, tag) = seal(&KEY, &NONCE, b"hello world").unwrap();
        ciphertext[0] ^= 0x01;

        let result = open(&KEY, &NONCE, &ciphertext, &tag);
        assert!(matches!(result, Err(CoreError::Authentication)));
    }

    #[test]
    fn test_tampered_tag_rejected() {
        let (ciphertext, mut tag) = seal(&KEY, &NONCE, b"hello world").unwrap();
        tag[0] ^= 0x01;

        let result = open(&KEY, &NONCE, &ciphertext, &tag);
        assert!(matches!(result, Err(CoreError::Authentication)));
    }

    #[test]
    fn test_tampered_nonce_rejected() {
        let (ciphertext, tag) = seal(&KEY, &NONCE, b"hello world").unwrap();

        let mut wrong_nonce = NONCE;
        wrong_nonce[0] ^= 0x01;
        let result = open(&KEY, &wrong_nonce, &ciphertext, &tag);
        assert!(matches!(result, Err(CoreError::Authentication)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (ciphertext, tag) = seal(&KEY, &NONCE, b"hello world").unwrap();

        let wrong_key = [0x11; KEY_SIZE];
        let result = open(&wrong_key, &NONCE, &ciphertext, &tag);
        assert!(matches!(result, Err(CoreError::Authentication)));
    }
}
