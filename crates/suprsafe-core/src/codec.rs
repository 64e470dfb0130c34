//! Per-file encryption and decryption
//!
//! Each file becomes a three-part artifact set: `<name>.enc` (ciphertext),
//! `<name>.enc.tag` (authentication tag) and `<name>.enc.nonce` (the nonce
//! used for that file). All three parts must be present and consistent for
//! decryption; a partial set is a corruption condition.
//!
//! Ordering invariant: a source file is only erased after all of its output
//! artifacts have been durably written, so an interruption mid-file never
//! loses data.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use rand::{CryptoRng, RngCore};
use tracing::{info, warn};

use crate::auth::ATTEMPTS_FILE_NAME;
use crate::envelope::{self, NONCE_SIZE, TAG_SIZE};
use crate::erase::SecureEraser;
use crate::error::{CoreError, Result};
use crate::vault::{SessionKeyMaterial, KEY_BLOB_NAME};

/// Suffix of the ciphertext artifact
pub const ENC_SUFFIX: &str = ".enc";

/// Suffix of the tag artifact
pub const TAG_SUFFIX: &str = ".enc.tag";

/// Suffix of the nonce artifact
pub const NONCE_SUFFIX: &str = ".enc.nonce";

/// The three-part artifact set for one encrypted file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedArtifact {
    /// Path of the original plaintext file
    base: PathBuf,
}

impl EncryptedArtifact {
    /// Artifact set for a plaintext file
    pub fn for_plaintext(path: &Path) -> Self {
        Self {
            base: path.to_path_buf(),
        }
    }

    /// Artifact set located from its `.enc` member
    pub fn for_ciphertext(enc_path: &Path) -> Result<Self> {
        let name = enc_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("unreadable file name: {}", enc_path.display()))
            })?;

        let stem = name.strip_suffix(ENC_SUFFIX).ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "not an encrypted artifact: {}",
                enc_path.display()
            ))
        })?;

        Ok(Self {
            base: enc_path.with_file_name(stem),
        })
    }

    /// Path the plaintext is (re)stored at
    pub fn plaintext_path(&self) -> &Path {
        &self.base
    }

    /// Path of the ciphertext part
    pub fn ciphertext_path(&self) -> PathBuf {
        sibling(&self.base, ENC_SUFFIX)
    }

    /// Path of the tag part
    pub fn tag_path(&self) -> PathBuf {
        sibling(&self.base, TAG_SUFFIX)
    }

    /// Path of the nonce part
    pub fn nonce_path(&self) -> PathBuf {
        sibling(&self.base, NONCE_SUFFIX)
    }

    /// True if all three parts exist on disk
    pub fn is_complete(&self) -> bool {
        self.ciphertext_path().exists() && self.tag_path().exists() && self.nonce_path().exists()
    }
}

fn sibling(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Encrypt one file under the session key with a fresh nonce
///
/// The plaintext original is securely erased only after all three artifact
/// parts are on disk.
pub fn encrypt_file<R: RngCore + CryptoRng>(
    path: &Path,
    session: &SessionKeyMaterial,
    rng: &mut R,
    eraser: &SecureEraser,
) -> Result<EncryptedArtifact> {
    let plaintext = fs::read(path)?;

    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);

    let (ciphertext, tag) = envelope::seal(session.key(), &nonce, &plaintext)?;

    let artifact = EncryptedArtifact::for_plaintext(path);
    write_part(&artifact.ciphertext_path(), &ciphertext)?;
    write_part(&artifact.tag_path(), &tag)?;
    write_part(&artifact.nonce_path(), &nonce)?;

    eraser.erase(path)?;
    Ok(artifact)
}

/// Decrypt one artifact set back into its plaintext file
///
/// Fails with [`CoreError::CorruptArtifact`] when a part is missing or has
/// the wrong size, and [`CoreError::Authentication`] on tag mismatch. The
/// artifact parts are securely erased only after the plaintext is written.
pub fn decrypt_file(
    artifact: &EncryptedArtifact,
    session: &SessionKeyMaterial,
    eraser: &SecureEraser,
) -> Result<PathBuf> {
    if !artifact.is_complete() {
        return Err(CoreError::CorruptArtifact(format!(
            "missing artifact part(s) for {}",
            artifact.plaintext_path().display()
        )));
    }

    let ciphertext = fs::read(artifact.ciphertext_path())?;
    let tag: [u8; TAG_SIZE] = read_part(&artifact.tag_path(), "tag")?;
    let nonce: [u8; NONCE_SIZE] = read_part(&artifact.nonce_path(), "nonce")?;

    let plaintext = envelope::open(session.key(), &nonce, &ciphertext, &tag)?;

    let out = artifact.plaintext_path().to_path_buf();
    write_part(&out, &plaintext)?;

    eraser.erase(&artifact.ciphertext_path())?;
    eraser.erase(&artifact.tag_path())?;
    eraser.erase(&artifact.nonce_path())?;

    Ok(out)
}

/// Encrypt every regular file directly inside `directory`
///
/// Skips subdirectories, existing artifacts, the wrapped key blob and the
/// attempt counter. Each file gets its own fresh nonce.
pub fn encrypt_dir<R: RngCore + CryptoRng>(
    directory: &Path,
    session: &SessionKeyMaterial,
    rng: &mut R,
    eraser: &SecureEraser,
) -> Result<Vec<EncryptedArtifact>> {
    let mut artifacts = Vec::new();

    for path in list_files(directory)? {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => {
                warn!("Skipping file with unreadable name: {}", path.display());
                continue;
            }
        };

        if is_control_file(name) || is_artifact_part(name) {
            continue;
        }

        artifacts.push(encrypt_file(&path, session, rng, eraser)?);
    }

    info!(
        "Encrypted {} file(s) in {}",
        artifacts.len(),
        directory.display()
    );
    Ok(artifacts)
}

/// Decrypt every artifact set directly inside `directory`
///
/// An incomplete artifact set (missing tag or nonce sibling) is logged and
/// skipped; a tag mismatch aborts the sweep and fails closed.
pub fn decrypt_dir(
    directory: &Path,
    session: &SessionKeyMaterial,
    eraser: &SecureEraser,
) -> Result<Vec<PathBuf>> {
    let mut restored = Vec::new();

    for path in list_files(directory)? {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };

        if !name.ends_with(ENC_SUFFIX) || is_control_file(name) {
            continue;
        }

        let artifact = EncryptedArtifact::for_ciphertext(&path)?;
        if !artifact.is_complete() {
            warn!(
                "Tag or nonce file not found for {} - skipping decryption",
                name
            );
            continue;
        }

        restored.push(decrypt_file(&artifact, session, eraser)?);
    }

    info!(
        "Decrypted {} file(s) in {}",
        restored.len(),
        directory.display()
    );
    Ok(restored)
}

/// Securely erase every artifact part and the wrapped key blob in `directory`
///
/// Returns the number of files destroyed. Used by the lockout guard; the
/// plaintext originals are already gone by the time this runs.
pub fn wipe_dir(directory: &Path, eraser: &SecureEraser) -> Result<usize> {
    let mut wiped = 0;

    for path in list_files(directory)? {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };

        if is_artifact_part(name) || name == KEY_BLOB_NAME {
            eraser.erase(&path)?;
            wiped += 1;
        }
    }

    warn!("Wiped {} file(s) in {}", wiped, directory.display());
    Ok(wiped)
}

/// Snapshot of the regular files in a directory
///
/// Taken up front so the sweeps never observe their own output. Sorted for
/// deterministic processing order.
fn list_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if !path.is_dir() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_control_file(name: &str) -> bool {
    name == KEY_BLOB_NAME || name == ATTEMPTS_FILE_NAME
}

fn is_artifact_part(name: &str) -> bool {
    name.ends_with(ENC_SUFFIX) || name.ends_with(TAG_SUFFIX) || name.ends_with(NONCE_SUFFIX)
}

fn write_part(path: &Path, bytes: &[u8]) -> Result<()> {
    // Write to temp file first, then rename for atomicity
    let temp_path = sibling(path, ".tmp");
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn read_part<const N: usize>(path: &Path, what: &str) -> Result<[u8; N]> {
    let bytes = fs::read(path)?;
    bytes.try_into().map_err(|_| {
        CoreError::CorruptArtifact(format!(
            "{} file has unexpected size: {}",
            what,
            path.display()
        ))
    })
}
