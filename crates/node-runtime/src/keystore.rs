//! # Keystore
//!
//! Loads the node's account key. The key is read once at startup and never
//! logged. Sources, first match wins:
//!
//! 1. `FM_IDENTITY_KEY` environment variable (raw hex, optional `0x`)
//! 2. `identity.keystore`: an encrypted V3 keystore file (scrypt or pbkdf2,
//!    AES-128-CTR, keccak MAC), or a directory whose first keystore is used
//!
//! The keystore passphrase comes from `FM_KEYSTORE_PASSPHRASE`, else from
//! the first line of `identity.passphrase_file`.
//!
//! A node without a key refuses to start.

use std::fs;
use std::path::{Path, PathBuf};

use eth_keystore::KeystoreError;
use shared_crypto::{Secp256k1Identity, SigningIdentity};
use thiserror::Error;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::container::IdentityConfig;

/// Environment variable carrying a raw hex secret key.
pub const IDENTITY_KEY_ENV: &str = "FM_IDENTITY_KEY";

/// Environment variable carrying the keystore passphrase.
pub const PASSPHRASE_ENV: &str = "FM_KEYSTORE_PASSPHRASE";

/// Key loading errors.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No usable key was found.
    #[error("Account key unavailable: {reason}")]
    KeyUnavailable {
        /// What went wrong. Never contains key material.
        reason: String,
    },

    /// Writing a new keystore failed.
    #[error("Failed to write keystore {path}: {error}")]
    Write {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        error: std::io::Error,
    },

    /// Encrypting a new keystore failed.
    #[error("Failed to encrypt keystore {path}: {reason}")]
    Encrypt {
        /// Target path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
}

impl KeyError {
    fn unavailable(reason: impl Into<String>) -> Self {
        Self::KeyUnavailable {
            reason: reason.into(),
        }
    }
}

/// Load the local identity from the environment or the configured keystore.
pub fn load_local_identity(config: &IdentityConfig) -> Result<Secp256k1Identity, KeyError> {
    let env_key = std::env::var(IDENTITY_KEY_ENV).ok().map(Zeroizing::new);
    if let Some(hex) = env_key.as_deref() {
        return load_identity(Some(hex), None, None);
    }

    let passphrase = match std::env::var(PASSPHRASE_ENV) {
        Ok(value) => Some(Zeroizing::new(value)),
        Err(_) => match &config.passphrase_file {
            Some(path) => Some(read_passphrase_file(path)?),
            None => None,
        },
    };

    load_identity(
        None,
        config.keystore.as_deref(),
        passphrase.as_deref().map(String::as_str),
    )
}

/// Resolve an identity from an explicit hex key, or a keystore path and its
/// passphrase.
pub fn load_identity(
    env_key: Option<&str>,
    keystore: Option<&Path>,
    passphrase: Option<&str>,
) -> Result<Secp256k1Identity, KeyError> {
    if let Some(hex) = env_key {
        let identity = Secp256k1Identity::from_hex(hex)
            .map_err(|e| KeyError::unavailable(format!("{}: {}", IDENTITY_KEY_ENV, e)))?;
        info!(address = %identity.address(), "Loaded account key from environment");
        return Ok(identity);
    }

    let Some(keystore) = keystore else {
        return Err(KeyError::unavailable(format!(
            "set {} or identity.keystore",
            IDENTITY_KEY_ENV
        )));
    };
    let Some(passphrase) = passphrase else {
        return Err(KeyError::unavailable(format!(
            "{} needs a passphrase: set {} or identity.passphrase_file",
            keystore.display(),
            PASSPHRASE_ENV
        )));
    };

    let path = resolve_keystore_file(keystore)?;
    warn_if_world_readable(&path);

    let secret = eth_keystore::decrypt_key(&path, passphrase)
        .map(Zeroizing::new)
        .map_err(|e| KeyError::unavailable(format!("{}: {}", path.display(), describe(&e))))?;

    let identity = Secp256k1Identity::from_secret_bytes(&secret)
        .map_err(|e| KeyError::unavailable(format!("{}: {}", path.display(), e)))?;
    info!(
        address = %identity.address(),
        path = %path.display(),
        "Loaded account key from keystore"
    );
    Ok(identity)
}

/// Generate a fresh key and write it as an encrypted V3 keystore into `dir`
/// (created if missing). The file is named after the account address and is
/// mode 0600 on Unix.
///
/// Refuses to overwrite an existing file. Returns the identity and the path
/// written.
pub fn generate_key_file(
    dir: &Path,
    passphrase: &str,
) -> Result<(Secp256k1Identity, PathBuf), KeyError> {
    let identity = Secp256k1Identity::generate();
    let path = write_keystore(dir, &identity, passphrase)?;
    Ok((identity, path))
}

fn write_keystore(
    dir: &Path,
    identity: &Secp256k1Identity,
    passphrase: &str,
) -> Result<PathBuf, KeyError> {
    let name = format!("{}.json", hex::encode(identity.address().as_bytes()));
    let path = dir.join(&name);

    let write_err = |error| KeyError::Write {
        path: path.clone(),
        error,
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    // Reserve the name with private permissions; the keystore is then
    // written into the same file.
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(&path).map_err(write_err)?;

    let secret = identity.secret_bytes();
    let encrypted = eth_keystore::encrypt_key(
        dir,
        &mut rand::rngs::OsRng,
        secret.as_slice(),
        passphrase,
        Some(&name),
    );
    if let Err(e) = encrypted {
        let _ = fs::remove_file(&path);
        return Err(KeyError::Encrypt {
            path,
            reason: describe(&e),
        });
    }

    Ok(path)
}

/// A file is used as is. In a directory, the first visible file by name is
/// used, as geth does for a single-account keystore.
fn resolve_keystore_file(path: &Path) -> Result<PathBuf, KeyError> {
    let meta = fs::metadata(path)
        .map_err(|e| KeyError::unavailable(format!("{}: {}", path.display(), e)))?;
    if !meta.is_dir() {
        return Ok(path.to_path_buf());
    }

    let entries = fs::read_dir(path)
        .map_err(|e| KeyError::unavailable(format!("{}: {}", path.display(), e)))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            !name.starts_with('.') && !name.ends_with('~')
        })
        .map(|entry| entry.path())
        .collect();
    files.sort();

    match files.len() {
        0 => Err(KeyError::unavailable(format!(
            "no keystore files in {}",
            path.display()
        ))),
        1 => Ok(files.swap_remove(0)),
        n => {
            warn!(
                dir = %path.display(),
                count = n,
                using = %files[0].display(),
                "Several keystores found, using the first"
            );
            Ok(files.swap_remove(0))
        }
    }
}

fn read_passphrase_file(path: &Path) -> Result<Zeroizing<String>, KeyError> {
    let contents = fs::read_to_string(path)
        .map(Zeroizing::new)
        .map_err(|e| KeyError::unavailable(format!("{}: {}", path.display(), e)))?;
    let first_line = contents.lines().next().unwrap_or_default();
    Ok(Zeroizing::new(first_line.to_string()))
}

fn describe(error: &KeystoreError) -> String {
    match error {
        KeystoreError::MacMismatch => "wrong passphrase or corrupted keystore".to_string(),
        other => other.to_string(),
    }
}

#[cfg(unix)]
fn warn_if_world_readable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        let mode = meta.permissions().mode();
        if mode & 0o077 != 0 {
            warn!(
                path = %path.display(),
                mode = format!("{:o}", mode & 0o777),
                "Keystore is accessible by other users"
            );
        }
    }
}

#[cfg(not(unix))]
fn warn_if_world_readable(_path: &Path) {}
