//! Storage backends for credentials.
//!
//! Two interchangeable implementations sit behind [`SecretBackend`]:
//! - **keyring**: the native OS secret store (Keychain, keyutils / Secret
//!   Service, Windows Credential Manager)
//! - **store**: an AES-256-GCM encrypted file with a separate key file
//!
//! **probe** decides at startup whether the native store is usable, and
//! **memory** is a process-local implementation for tests and dry runs.

pub mod keyring;
pub mod memory;
pub mod probe;
pub mod store;

use std::fmt;

use crate::error::Result;
use crate::secret::Credential;

pub use self::keyring::KeyringBackend;
pub use memory::MemoryBackend;
pub use store::FileBackend;

/// Which kind of backend is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Keystore,
    EncryptedFile,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Keystore => "system keyring",
            Self::EncryptedFile => "encrypted file",
            Self::Memory => "memory",
        };
        f.write_str(s)
    }
}

/// The store contract shared by every backend.
///
/// A service name maps to at most one credential. `get` on a missing service
/// returns `Ok(None)`; `delete` on a missing service succeeds.
pub trait SecretBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn get(&self, service: &str) -> Result<Option<Credential>>;

    /// Insert or overwrite the credential for `credential.service`.
    fn set(&self, credential: &Credential) -> Result<()>;

    fn delete(&self, service: &str) -> Result<()>;

    /// Names of stored services, sorted. Never returns secrets.
    fn list(&self) -> Result<Vec<String>>;
}

/// Copy every credential from `from` into `to`, overwriting entries with the
/// same service name. Returns the number of credentials copied.
pub fn migrate(from: &dyn SecretBackend, to: &dyn SecretBackend) -> Result<usize> {
    let mut copied = 0;
    for service in from.list()? {
        if let Some(credential) = from.get(&service)? {
            to.set(&credential)?;
            copied += 1;
        }
    }
    tracing::info!(from = %from.kind(), to = %to.kind(), copied, "migrated credentials");
    Ok(copied)
}
