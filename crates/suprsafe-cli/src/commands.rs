//! Command implementations for the SuprSafe CLI
//!
//! The prompts and attempt loops live here; everything with a cryptographic
//! invariant is in `suprsafe-core`.

use std::fs;
use std::path::Path;

use anyhow::bail;
use rand::rngs::OsRng;
use tracing::info;
use zeroize::Zeroizing;

use suprsafe_core::auth::{AccountGate, Attempt, LockoutGuard, ATTEMPTS_FILE_NAME};
use suprsafe_core::codec::{self, ENC_SUFFIX};
use suprsafe_core::{
    CoreError, KeyVault, LockoutState, SecureEraser, SecuritySettings, WrappedKeyBlob,
};

/// Set up the account password on first run
pub fn init(data_dir: &Path) -> anyhow::Result<()> {
    let mut gate = AccountGate::account(data_dir)?;
    if gate.is_initialized() {
        bail!("Account already initialized. Refusing to overwrite.");
    }

    let password = Zeroizing::new(rpassword::prompt_password("Choose an account password: ")?);
    let confirm = Zeroizing::new(rpassword::prompt_password("Confirm account password: ")?);
    if *password != *confirm {
        bail!("Passwords do not match.");
    }

    gate.initialize(&password)?;
    info!("Account record written to {}", data_dir.display());
    println!("Account password set. It cannot be recovered - keep it safe.");
    Ok(())
}

/// Encrypt every file in a directory
pub fn encrypt(data_dir: &Path, dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }
    if WrappedKeyBlob::path_for(dir).exists() {
        bail!("Directory already holds a wrapped key - decrypt it first.");
    }

    let settings = SecuritySettings::load(data_dir)?;
    authenticate(data_dir, dir, &settings)?;

    let vault = KeyVault::new();
    let mut rng = OsRng;

    let (session, blob) = loop {
        let main_key = Zeroizing::new(rpassword::prompt_password("Enter your main key: ")?);
        let session = vault.create_session(&mut rng);
        match vault.wrap(&session, &main_key, &mut rng) {
            Ok(blob) => break (session, blob),
            Err(CoreError::InvalidInput(msg)) => eprintln!("{}", msg),
            Err(e) => return Err(e.into()),
        }
    };

    // The blob is the only way back to the session key; it goes to disk
    // before any plaintext is touched.
    blob.save(dir)?;

    let eraser = SecureEraser::new(settings.erase_passes);
    let artifacts = codec::encrypt_dir(dir, &session, &mut rng, &eraser)?;

    println!("Your files are now encrypted ({} file(s)).", artifacts.len());
    Ok(())
}

/// Decrypt a previously encrypted directory
pub fn decrypt(data_dir: &Path, dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }

    let settings = SecuritySettings::load(data_dir)?;
    authenticate(data_dir, dir, &settings)?;

    let blob = WrappedKeyBlob::load(dir)?;
    let vault = KeyVault::new();

    let mut attempts_left = settings.max_attempts;
    let session = loop {
        let main_key = Zeroizing::new(rpassword::prompt_password("Enter your main key: ")?);
        match vault.unwrap(&blob, &main_key) {
            Ok(session) => break session,
            Err(CoreError::Authentication) => {
                attempts_left = attempts_left.saturating_sub(1);
                if attempts_left == 0 {
                    bail!("Too many failed main key attempts.");
                }
                eprintln!("Wrong main key. {} attempt(s) remaining.", attempts_left);
            }
            Err(CoreError::InvalidInput(msg)) => eprintln!("{}", msg),
            Err(e) => return Err(e.into()),
        }
    };

    let eraser = SecureEraser::new(settings.erase_passes);
    let restored = codec::decrypt_dir(dir, &session, &eraser)?;

    // The batch is done; retire the wrapped key and the attempt counter.
    eraser.erase(&WrappedKeyBlob::path_for(dir))?;
    let attempts_path = dir.join(ATTEMPTS_FILE_NAME);
    if attempts_path.exists() {
        fs::remove_file(&attempts_path)?;
    }

    println!("Your files are now decrypted ({} file(s)).", restored.len());
    Ok(())
}

/// Show account, SuprSafe+ and directory status
pub fn status(data_dir: &Path, dir: Option<&Path>) -> anyhow::Result<()> {
    let gate = AccountGate::account(data_dir)?;
    let admin = AccountGate::admin(data_dir)?;
    let settings = SecuritySettings::load(data_dir)?;

    println!("Account initialized: {}", gate.is_initialized());
    println!("SuprSafe+ enabled:   {}", settings.suprsafe_plus);
    println!("Admin record:        {}", admin.is_initialized());
    println!("Attempt threshold:   {}", settings.max_attempts);

    if let Some(dir) = dir {
        if !dir.is_dir() {
            bail!("Not a directory: {}", dir.display());
        }

        let encrypted = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.ends_with(ENC_SUFFIX))
            })
            .count();

        let guard = LockoutGuard::open(
            dir,
            settings.max_attempts,
            SecureEraser::new(settings.erase_passes),
        )?;

        println!("Directory {}:", dir.display());
        println!(
            "  Wrapped key present: {}",
            WrappedKeyBlob::path_for(dir).exists()
        );
        println!("  Encrypted files:     {}", encrypted);
        match guard.state() {
            LockoutState::Locked => println!("  Lockout:             locked (wiped)"),
            LockoutState::Active { failed } => {
                println!("  Lockout:             {} failed attempt(s)", failed)
            }
        }
    }

    Ok(())
}

/// Enable SuprSafe+, setting up the admin password if needed
pub fn plus_enable(data_dir: &Path) -> anyhow::Result<()> {
    let mut settings = SecuritySettings::load(data_dir)?;
    if settings.suprsafe_plus {
        println!("SuprSafe+ is already enabled.");
        return Ok(());
    }

    let mut admin = AccountGate::admin(data_dir)?;
    if admin.is_initialized() {
        let password = Zeroizing::new(rpassword::prompt_password(
            "Enter the SuprSafe+ admin password: ",
        )?);
        if !admin.verify(&password)? {
            bail!("Wrong admin password.");
        }
    } else {
        let password = Zeroizing::new(rpassword::prompt_password(
            "Choose a SuprSafe+ admin password: ",
        )?);
        let confirm = Zeroizing::new(rpassword::prompt_password("Confirm admin password: ")?);
        if *password != *confirm {
            bail!("Passwords do not match.");
        }
        admin.initialize(&password)?;
    }

    settings.suprsafe_plus = true;
    settings.save(data_dir)?;
    println!("SuprSafe+ enabled. Repeated failed password attempts will wipe ciphertext.");
    Ok(())
}

/// Disable SuprSafe+ (requires the admin password)
pub fn plus_disable(data_dir: &Path) -> anyhow::Result<()> {
    let mut settings = SecuritySettings::load(data_dir)?;
    if !settings.suprsafe_plus {
        println!("SuprSafe+ is not enabled.");
        return Ok(());
    }

    let admin = AccountGate::admin(data_dir)?;
    let password = Zeroizing::new(rpassword::prompt_password(
        "Enter the SuprSafe+ admin password: ",
    )?);
    if !admin.verify(&password)? {
        bail!("Wrong admin password.");
    }

    settings.suprsafe_plus = false;
    settings.save(data_dir)?;
    println!("SuprSafe+ disabled.");
    Ok(())
}

/// Account-password prompt loop, honoring SuprSafe+ lockout
fn authenticate(data_dir: &Path, dir: &Path, settings: &SecuritySettings) -> anyhow::Result<()> {
    let gate = AccountGate::account(data_dir)?;
    if !gate.is_initialized() {
        bail!("No account password set up - run 'suprsafe init' first.");
    }

    let mut guard = if settings.suprsafe_plus {
        let guard = LockoutGuard::open(
            dir,
            settings.max_attempts,
            SecureEraser::new(settings.erase_passes),
        )?;
        if guard.is_locked() {
            bail!("This directory is locked - its encrypted data has been wiped.");
        }
        Some(guard)
    } else {
        None
    };

    let mut attempts_left = settings.max_attempts;
    loop {
        let password = Zeroizing::new(rpassword::prompt_password(
            "Enter your account password to unlock keys: ",
        )?);

        if gate.verify(&password)? {
            if let Some(guard) = guard.as_mut() {
                guard.record_success()?;
            }
            return Ok(());
        }

        match guard.as_mut() {
            Some(guard) => match guard.record_failure()? {
                Attempt::Retry { remaining } => {
                    eprintln!("Invalid password. {} attempt(s) remaining.", remaining);
                }
                Attempt::Wiped { files } => {
                    bail!(
                        "Too many failed attempts. Wiped {} encrypted file(s).",
                        files
                    );
                }
            },
            None => {
                attempts_left = attempts_left.saturating_sub(1);
                if attempts_left == 0 {
                    bail!("Too many failed attempts.");
                }
                eprintln!("Invalid password. {} attempt(s) remaining.", attempts_left);
            }
        }
    }
}
