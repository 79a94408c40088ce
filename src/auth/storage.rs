//! Durable session persistence with encrypted-at-rest storage.
//!
//! One file holds the persisted sessions for every backend environment,
//! keyed by backend base URL so environments do not collide:
//! `~/.config/fareplay/sessions.enc` (or `$XDG_CONFIG_HOME/fareplay/sessions.enc`).
//! Absence of a base URL's entry means unauthenticated.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::cookies::SeedCookie;

const SESSION_FILE_NAME: &str = "sessions.enc";
const KEYRING_SERVICE: &str = "fareplay";
const KEYRING_ENTRY_NAME: &str = "session-master-key-v1";
const MASTER_KEY_ENV: &str = "FAREPLAY_MASTER_KEY";
const MAGIC: &[u8; 4] = b"FPS1";
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

/// Errors for persisted session storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No suitable user config directory is available.
    #[error("unable to determine config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigDirUnavailable,
    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Could not access keychain and no env fallback key was provided.
    #[error(
        "unable to access system keychain for session encryption key; set FAREPLAY_MASTER_KEY or configure keychain access"
    )]
    KeychainUnavailable,
    /// Stored encrypted payload is malformed.
    #[error("persisted session payload is invalid")]
    InvalidPayload,
    /// Encryption failed.
    #[error("failed to encrypt persisted session")]
    EncryptionFailed,
    /// Decryption failed.
    #[error("failed to decrypt persisted session")]
    DecryptionFailed,
}

type SessionMap = BTreeMap<String, SeedCookie>;

/// Handle to the encrypted session file.
///
/// The default construction resolves the platform config directory and pulls
/// key material from the system keychain (with an env-variable fallback);
/// [`SessionStorage::at_path`] pins both for tests and embedding hosts.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
    explicit_key: Option<String>,
}

impl SessionStorage {
    /// Opens the default session file location.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ConfigDirUnavailable`] if no usable config dir
    /// is found.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self {
            path: default_config_dir()?.join(SESSION_FILE_NAME),
            explicit_key: None,
        })
    }

    /// Opens a session file at an explicit path with explicit key material,
    /// bypassing config-dir resolution and the keychain.
    #[must_use]
    pub fn at_path(path: impl Into<PathBuf>, key_material: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            explicit_key: Some(key_material.into()),
        }
    }

    /// The path of the encrypted session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted cookie for a backend base URL.
    ///
    /// Returns `Ok(None)` when no session file exists or the file has no
    /// entry for this base URL. The keychain is only consulted when a file
    /// actually exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when key retrieval, decryption, or parsing
    /// fails.
    pub fn load(&self, base_url: &str) -> Result<Option<SeedCookie>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let sessions = self.read_sessions()?;
        Ok(sessions.get(base_url).cloned())
    }

    /// Stores the cookie for a backend base URL, overwriting any previous
    /// entry for that base URL and leaving other environments untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when key retrieval, encryption, or file
    /// writing fails.
    pub fn store(&self, base_url: &str, cookie: &SeedCookie) -> Result<(), StorageError> {
        let mut sessions = if self.path.exists() {
            self.read_sessions()?
        } else {
            SessionMap::new()
        };
        sessions.insert(base_url.to_string(), cookie.clone());
        self.write_sessions(&sessions)
    }

    /// Removes the persisted entry for a backend base URL.
    ///
    /// Removing an entry that does not exist is a no-op. The file itself is
    /// deleted when the last entry goes away.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when key retrieval, decryption, or file
    /// writing fails.
    pub fn remove(&self, base_url: &str) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut sessions = self.read_sessions()?;
        if sessions.remove(base_url).is_none() {
            return Ok(());
        }
        if sessions.is_empty() {
            fs::remove_file(&self.path)?;
            return Ok(());
        }
        self.write_sessions(&sessions)
    }

    fn key_material(&self) -> Result<String, StorageError> {
        match &self.explicit_key {
            Some(key) => Ok(key.clone()),
            None => load_or_create_key(),
        }
    }

    fn read_sessions(&self) -> Result<SessionMap, StorageError> {
        let bytes = fs::read(&self.path)?;
        let plaintext = open_payload(&bytes, &self.key_material()?)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn write_sessions(&self, sessions: &SessionMap) -> Result<(), StorageError> {
        let plaintext = serde_json::to_vec(sessions)?;
        let encrypted = seal_payload(&plaintext, &self.key_material()?)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, encrypted)?;
        restrict_to_owner(&self.path)
    }
}

fn default_config_dir() -> Result<PathBuf, StorageError> {
    resolve_config_dir(
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    value
        .filter(|raw| !raw.to_string_lossy().trim().is_empty())
        .map(PathBuf::from)
}

fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, StorageError> {
    xdg_config_home
        .map(|xdg| xdg.join("fareplay"))
        .or_else(|| home.map(|home| home.join(".config").join("fareplay")))
        .or_else(|| app_data.map(|app_data| app_data.join("fareplay")))
        .ok_or(StorageError::ConfigDirUnavailable)
}

fn load_or_create_key() -> Result<String, StorageError> {
    let env_key = env::var(MASTER_KEY_ENV)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|key| !key.is_empty());
    if let Some(key) = env_key {
        return Ok(key);
    }

    let entry = guard_keychain(|| keyring::Entry::new(KEYRING_SERVICE, KEYRING_ENTRY_NAME))?;
    match guard_keychain(|| entry.get_password()) {
        Ok(existing) if !existing.trim().is_empty() => Ok(existing),
        _ => {
            let generated = generate_key_material();
            guard_keychain(|| entry.set_password(&generated))?;
            Ok(generated)
        }
    }
}

// Keyring backends have panicked in restricted sandbox environments, so every
// keychain call goes through catch_unwind.
fn guard_keychain<T>(op: impl FnOnce() -> keyring::Result<T>) -> Result<T, StorageError> {
    catch_unwind(AssertUnwindSafe(op))
        .map_err(|_| StorageError::KeychainUnavailable)?
        .map_err(|_| StorageError::KeychainUnavailable)
}

fn generate_key_material() -> String {
    let mut bytes = [0_u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn session_cipher(key_material: &str) -> XChaCha20Poly1305 {
    let key: [u8; KEY_LEN] = Sha256::digest(key_material.as_bytes()).into();
    XChaCha20Poly1305::new(Key::from_slice(&key))
}

fn seal_payload(plaintext: &[u8], key_material: &str) -> Result<Vec<u8>, StorageError> {
    let mut nonce = XNonce::default();
    rand::thread_rng().fill_bytes(nonce.as_mut_slice());

    let ciphertext = session_cipher(key_material)
        .encrypt(&nonce, plaintext)
        .map_err(|_| StorageError::EncryptionFailed)?;

    let mut payload = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(MAGIC);
    payload.extend_from_slice(nonce.as_slice());
    payload.extend_from_slice(&ciphertext);
    Ok(payload)
}

fn open_payload(payload: &[u8], key_material: &str) -> Result<Vec<u8>, StorageError> {
    let body = payload
        .strip_prefix(MAGIC.as_slice())
        .ok_or(StorageError::InvalidPayload)?;
    if body.len() < NONCE_LEN {
        return Err(StorageError::InvalidPayload);
    }
    let (nonce, ciphertext) = body.split_at(NONCE_LEN);

    session_cipher(key_material)
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| StorageError::DecryptionFailed)
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;

    Ok(fs::set_permissions(path, fs::Permissions::from_mode(0o600))?)
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}
