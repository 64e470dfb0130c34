//! Secure file erasure
//!
//! Files that held plaintext or superseded ciphertext are overwritten in
//! place before they are unlinked, so the bytes are not left recoverable in
//! the filesystem. The overwrite always completes before the unlink; an I/O
//! failure mid-erase surfaces as an error and is never reported as success.

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::error::Result;

/// Default number of random overwrite passes (a zero pass always follows)
pub const DEFAULT_ERASE_PASSES: u32 = 2;

/// Overwrite chunk size
const ERASE_CHUNK: usize = 64 * 1024;

/// Overwrites file contents before removal
#[derive(Clone, Copy, Debug)]
pub struct SecureEraser {
    passes: u32,
}

impl SecureEraser {
    /// Eraser with the given number of random passes
    pub fn new(passes: u32) -> Self {
        Self { passes }
    }

    /// Overwrite `path` with random data, then zeros, then unlink it
    pub fn erase(&self, path: &Path) -> Result<()> {
        let len = fs::metadata(path)?.len();

        if len > 0 {
            let mut file = OpenOptions::new().write(true).open(path)?;

            for _ in 0..self.passes {
                Self::overwrite(&mut file, len, |buf| OsRng.fill_bytes(buf))?;
            }
            Self::overwrite(&mut file, len, |buf| buf.fill(0))?;
        }

        fs::remove_file(path)?;
        debug!("Erased {}", path.display());
        Ok(())
    }

    fn overwrite<F>(file: &mut fs::File, len: u64, mut fill: F) -> Result<()>
    where
        F: FnMut(&mut [u8]),
    {
        file.seek(SeekFrom::Start(0))?;

        let mut buf = vec![0u8; ERASE_CHUNK];
        let mut remaining = len;
        while remaining > 0 {
            let chunk = remaining.min(ERASE_CHUNK as u64) as usize;
            fill(&mut buf[..chunk]);
            file.write_all(&buf[..chunk])?;
            remaining -= chunk as u64;
        }

        file.sync_all()?;
        Ok(())
    }
}

impl Default for SecureEraser {
    fn default() -> Self {
        Self::new(DEFAULT_ERASE_PASSES)
    }
}
