//! Encrypted local storage for credentials.
//!
//! Uses AES-256-GCM encryption to store secrets in a single container file.
//! The encryption key lives in a separate key file next to it. Both are
//! restricted to the owning user.
//!
//! Container layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`, the
//! plaintext being the JSON form of [`StoreData`]. Every operation reads and
//! decrypts the whole container and every mutation rewrites it whole through
//! a temporary file and a rename. Two processes writing at once are not
//! coordinated; the last rename wins.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{BackendKind, SecretBackend};
use crate::config::CredentialConfig;
use crate::error::{CredentialError, Result};
use crate::secret::{Credential, Secret};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const STORE_VERSION: u32 = 1;

/// The data structure stored in the encrypted file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreData {
    pub version: u32,
    /// service -> entry
    #[serde(default)]
    pub credentials: BTreeMap<String, StoredEntry>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            credentials: BTreeMap::new(),
        }
    }
}

/// One credential as persisted; the secret is hex encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Drop for StoredEntry {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.secret);
    }
}

/// Credentials held in an encrypted container file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    key_path: PathBuf,
    store_path: PathBuf,
}

impl FileBackend {
    pub fn new(config: &CredentialConfig) -> Self {
        Self {
            dir: config.config_dir.clone(),
            key_path: config.key_path(),
            store_path: config.store_path(),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| CredentialError::io(&self.dir, e))?;
            restrict_permissions(&self.dir, 0o700)?;
        }
        Ok(())
    }

    /// Generate or retrieve the encryption key from the key file.
    fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        match fs::read_to_string(&self.key_path) {
            Ok(key_hex) => {
                let key_hex = Zeroizing::new(key_hex);
                let mut key = Zeroizing::new([0u8; KEY_LEN]);
                hex::decode_to_slice(key_hex.trim(), key.as_mut_slice())
                    .map_err(|e| CredentialError::corrupt(&self.key_path, format!("bad key file: {e}")))?;
                Ok(key)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // A fresh key could never open an existing container.
                if self.store_path.exists() {
                    return Err(CredentialError::corrupt(
                        &self.store_path,
                        "key file is missing; stored credentials are unrecoverable",
                    ));
                }
                self.ensure_dir()?;
                let key = generate_key()?;
                let key_hex = Zeroizing::new(hex::encode(key.as_slice()));
                write_atomically(&self.key_path, key_hex.as_bytes())?;
                tracing::info!(path = %self.key_path.display(), "generated credential store key");
                Ok(key)
            }
            Err(e) => Err(CredentialError::io(&self.key_path, e)),
        }
    }

    /// Load the store data from the encrypted file. A missing file is an
    /// empty store; anything unreadable is [`CredentialError::CorruptStore`].
    pub fn load(&self) -> Result<StoreData> {
        let key = self.get_or_create_key()?;
        self.read(&key)
    }

    fn read(&self, key: &[u8; KEY_LEN]) -> Result<StoreData> {
        let ciphertext = match fs::read(&self.store_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoreData::default()),
            Err(e) => return Err(CredentialError::io(&self.store_path, e)),
        };
        let plaintext = decrypt(key, &ciphertext)
            .map_err(|reason| CredentialError::corrupt(&self.store_path, reason))?;
        let data: StoreData = serde_json::from_slice(&plaintext)
            .map_err(|e| CredentialError::corrupt(&self.store_path, format!("invalid contents: {e}")))?;
        tracing::debug!(
            path = %self.store_path.display(),
            entries = data.credentials.len(),
            "loaded credential store"
        );
        Ok(data)
    }

    /// Read the whole store, apply `f`, and rewrite the whole store.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut StoreData),
    {
        let key = self.get_or_create_key()?;
        let mut data = self.read(&key)?;
        f(&mut data);
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&data).map_err(|e| CredentialError::Crypto(e.to_string()))?,
        );
        let ciphertext = encrypt(&key, &plaintext)?;
        write_atomically(&self.store_path, &ciphertext)?;
        restrict_permissions(&self.key_path, 0o600)?;
        tracing::debug!(
            path = %self.store_path.display(),
            entries = data.credentials.len(),
            "rewrote credential store"
        );
        Ok(())
    }
}

impl SecretBackend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::EncryptedFile
    }

    fn get(&self, service: &str) -> Result<Option<Credential>> {
        let data = self.load()?;
        let Some(entry) = data.credentials.get(service) else {
            return Ok(None);
        };
        let secret = hex::decode(&entry.secret).map_err(|_| {
            CredentialError::corrupt(&self.store_path, format!("entry '{service}' is malformed"))
        })?;
        Ok(Some(Credential {
            service: service.to_string(),
            secret: Secret::new(secret),
            username: entry.username.clone(),
        }))
    }

    fn set(&self, credential: &Credential) -> Result<()> {
        let entry = StoredEntry {
            secret: hex::encode(credential.secret.expose()),
            username: credential.username.clone(),
        };
        self.update(|data| {
            data.credentials.insert(credential.service.clone(), entry);
        })
    }

    fn delete(&self, service: &str) -> Result<()> {
        // Nothing to rewrite if the container was never created.
        if !self.store_path.exists() {
            return Ok(());
        }
        let mut present = false;
        self.update(|data| {
            present = data.credentials.remove(service).is_some();
        })?;
        tracing::debug!(service, present, "deleted from credential store");
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.load()?.credentials.keys().cloned().collect())
    }
}

/// Generate a cryptographically secure random key.
fn generate_key() -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    getrandom::fill(key.as_mut_slice())
        .map_err(|e| CredentialError::Crypto(format!("random source failed: {e}")))?;
    Ok(key)
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CredentialError::Crypto(e.to_string()))?;

    // Fresh nonce per write; it is stored in front of the ciphertext.
    let mut nonce_bytes = [0u8; NONCE_LEN];
    getrandom::fill(&mut nonce_bytes)
        .map_err(|e| CredentialError::Crypto(format!("random source failed: {e}")))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CredentialError::Crypto(format!("encryption failed: {e}")))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn decrypt(key: &[u8; KEY_LEN], data: &[u8]) -> std::result::Result<Zeroizing<Vec<u8>>, String> {
    if data.len() < NONCE_LEN {
        return Err(format!("container is truncated ({} bytes)", data.len()));
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| e.to_string())?;
    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| "decryption failed (wrong key or tampered file)".to_string())
}

/// Write `bytes` to `path` via a sibling temporary file and a rename, so the
/// target is either the old or the new content, never a mix.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let result = (|| -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(CredentialError::io(&temp_path, e));
    }
    restrict_permissions(&temp_path, 0o600)?;
    fs::rename(&temp_path, path).map_err(|e| CredentialError::io(path, e))?;
    restrict_permissions(path, 0o600)
}

#[cfg(unix)]
pub(crate) fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| CredentialError::io(path, e))
}

#[cfg(not(unix))]
pub(crate) fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
