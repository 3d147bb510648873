//! OS keychain backend.
//!
//! Uses the `keyring` crate to provide a cross-platform interface to:
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, KWallet) with a kernel keyutils
//!   cache in front, so entries outlive the login session
//! - Windows: Credential Manager
//!
//! Each credential is one entry whose keyring *service* is the configured
//! namespace and whose keyring *user* is the credential's service name.
//! Native stores cannot be enumerated portably, so the list of stored service
//! names is kept in a separate keyring service, `<namespace>:index`, where no
//! credential can land on top of it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{BackendKind, SecretBackend};
use crate::error::{BackendFailure, CredentialError, Result};
use crate::secret::{Credential, Secret};

const INDEX_SUFFIX: &str = ":index";
const INDEX_USER: &str = "services";

/// What is written into a keyring entry.
#[derive(Serialize)]
struct Envelope<'a> {
    secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

#[derive(Deserialize)]
struct StoredEnvelope {
    secret: String,
    #[serde(default)]
    username: Option<String>,
}

fn failure_of(err: &keyring::Error) -> BackendFailure {
    match err {
        keyring::Error::PlatformFailure(_) => BackendFailure::Unreachable,
        keyring::Error::NoStorageAccess(_) => BackendFailure::PermissionDenied,
        keyring::Error::TooLong(..)
        | keyring::Error::Invalid(..)
        | keyring::Error::Ambiguous(_) => BackendFailure::Rejected,
        _ => BackendFailure::Corrupted,
    }
}

fn entry(namespace: &str, user: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(namespace, user)
        .map_err(|e| CredentialError::backend(user, failure_of(&e)))
}

/// Store raw bytes in the OS keychain.
pub fn set_secret(namespace: &str, user: &str, secret: &[u8]) -> Result<()> {
    entry(namespace, user)?
        .set_secret(secret)
        .map_err(|e| CredentialError::backend(user, failure_of(&e)))
}

/// Retrieve raw bytes from the OS keychain; `None` if there is no entry.
pub fn get_secret(namespace: &str, user: &str) -> Result<Option<Vec<u8>>> {
    match entry(namespace, user)?.get_secret() {
        Ok(bytes) => Ok(Some(bytes)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(CredentialError::backend(user, failure_of(&e))),
    }
}

/// Delete an entry from the OS keychain. A missing entry is not an error.
pub fn delete_secret(namespace: &str, user: &str) -> Result<()> {
    // keyring 3.x uses delete_credential instead of delete_password
    match entry(namespace, user)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(CredentialError::backend(user, failure_of(&e))),
    }
}

/// Raw `(service, user) -> bytes` access underneath [`KeyringBackend`].
pub(crate) trait Entries: Send + Sync {
    fn set(&self, service: &str, user: &str, secret: &[u8]) -> Result<()>;
    fn get(&self, service: &str, user: &str) -> Result<Option<Vec<u8>>>;
    fn delete(&self, service: &str, user: &str) -> Result<()>;
}

/// The real OS keychain.
struct Native;

impl Entries for Native {
    fn set(&self, service: &str, user: &str, secret: &[u8]) -> Result<()> {
        set_secret(service, user, secret)
    }

    fn get(&self, service: &str, user: &str) -> Result<Option<Vec<u8>>> {
        get_secret(service, user)
    }

    fn delete(&self, service: &str, user: &str) -> Result<()> {
        delete_secret(service, user)
    }
}

/// Credentials held in the native OS secret store.
#[derive(Clone)]
pub struct KeyringBackend {
    namespace: String,
    index_service: String,
    entries: Arc<dyn Entries>,
}

impl fmt::Debug for KeyringBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyringBackend")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KeyringBackend {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::with_entries(namespace, Arc::new(Native))
    }

    pub(crate) fn with_entries(namespace: impl Into<String>, entries: Arc<dyn Entries>) -> Self {
        let namespace = namespace.into();
        Self {
            index_service: format!("{namespace}{INDEX_SUFFIX}"),
            namespace,
            entries,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn load_index(&self) -> Result<Vec<String>> {
        match self.entries.get(&self.index_service, INDEX_USER)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|_| CredentialError::backend(INDEX_USER, BackendFailure::Corrupted)),
            None => Ok(Vec::new()),
        }
    }

    fn save_index(&self, index: &[String]) -> Result<()> {
        let bytes = serde_json::to_vec(index)
            .map_err(|_| CredentialError::backend(INDEX_USER, BackendFailure::Corrupted))?;
        self.entries.set(&self.index_service, INDEX_USER, &bytes)
    }

    fn update_index(&self, f: impl FnOnce(&mut Vec<String>)) -> Result<()> {
        let mut index = self.load_index()?;
        let before = index.clone();
        f(&mut index);
        index.sort();
        index.dedup();
        if index != before {
            self.save_index(&index)?;
        }
        Ok(())
    }
}

impl SecretBackend for KeyringBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Keystore
    }

    fn get(&self, service: &str) -> Result<Option<Credential>> {
        let Some(bytes) = self.entries.get(&self.namespace, service)?.map(Zeroizing::new) else {
            return Ok(None);
        };
        let envelope: StoredEnvelope = serde_json::from_slice(&bytes)
            .map_err(|_| CredentialError::backend(service, BackendFailure::Corrupted))?;
        let envelope_secret = Zeroizing::new(envelope.secret);
        let secret = hex::decode(envelope_secret.as_bytes())
            .map_err(|_| CredentialError::backend(service, BackendFailure::Corrupted))?;
        Ok(Some(Credential {
            service: service.to_string(),
            secret: Secret::new(secret),
            username: envelope.username,
        }))
    }

    /// Writes the entry, then records its name in the index. If the index
    /// cannot be updated the entry is put back the way it was, so a stored
    /// credential is always listed.
    fn set(&self, credential: &Credential) -> Result<()> {
        let service = credential.service.as_str();
        let secret_hex = Zeroizing::new(hex::encode(credential.secret.expose()));
        let envelope = Envelope {
            secret: &secret_hex,
            username: credential.username.as_deref(),
        };
        let bytes = Zeroizing::new(
            serde_json::to_vec(&envelope)
                .map_err(|_| CredentialError::backend(service, BackendFailure::Corrupted))?,
        );

        let previous = self.entries.get(&self.namespace, service)?.map(Zeroizing::new);
        self.entries.set(&self.namespace, service, &bytes)?;
        if let Err(e) = self.update_index(|index| index.push(service.to_string())) {
            let undo = match &previous {
                Some(old) => self.entries.set(&self.namespace, service, old),
                None => self.entries.delete(&self.namespace, service),
            };
            if let Err(undo_err) = undo {
                tracing::warn!(service, error = %undo_err, "could not roll back keyring entry");
            }
            return Err(e);
        }
        tracing::debug!(service, namespace = %self.namespace, "stored credential in keyring");
        Ok(())
    }

    fn delete(&self, service: &str) -> Result<()> {
        self.entries.delete(&self.namespace, service)?;
        self.update_index(|index| index.retain(|s| s != service))?;
        tracing::debug!(service, namespace = %self.namespace, "removed credential from keyring");
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        self.load_index()
    }
}
