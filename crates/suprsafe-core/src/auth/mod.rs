//! Password gating and lockout
//!
//! ALL encrypt and decrypt flows pass through this module first.
//!
//! # Security Model
//!
//! - Account and admin passwords are hashed with Argon2id (memory-hard)
//! - Verification is constant-time against the stored PHC hash
//! - The optional SuprSafe+ mode wipes ciphertext after repeated failures,
//!   tracked per protected directory
//! - Plaintext passwords are never persisted or logged

mod gate;
mod lockout;
mod record;

pub use gate::AccountGate;
pub use lockout::{Attempt, LockoutGuard, LockoutState, ATTEMPTS_FILE_NAME};
pub use record::{PasswordRecord, ACCOUNT_RECORD_NAME, ADMIN_RECORD_NAME};
