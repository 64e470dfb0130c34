//! SuprSafe core - key management and per-file encryption envelopes
//!
//! This crate implements the cryptographic core of SuprSafe:
//! - Argon2id derivation for every human-supplied secret
//! - AES-256-GCM envelopes per file (`.enc` / `.enc.tag` / `.enc.nonce`)
//! - A per-session AES key and IV, wrapped under the user's main key
//! - Secure overwrite-then-unlink erasure of superseded files
//! - Account-password gating with an optional destructive lockout
//!   (SuprSafe+)
//!
//! The CLI crate supplies the prompts and directory choices; everything
//! with an invariant lives here.

pub mod auth;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod erase;
pub mod error;
pub mod kdf;
pub mod vault;

pub use auth::{AccountGate, Attempt, LockoutGuard, LockoutState};
pub use codec::EncryptedArtifact;
pub use config::SecuritySettings;
pub use erase::SecureEraser;
pub use error::{CoreError, Result};
pub use kdf::DeriveParams;
pub use vault::{KeyVault, SessionKeyMaterial, WrappedKeyBlob};
