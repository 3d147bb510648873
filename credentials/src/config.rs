//! Process-wide credential configuration.
//!
//! Resolved once at startup and handed to [`CredentialManager::new`]; nothing
//! else in the crate reads paths or flags from the environment.
//!
//! [`CredentialManager::new`]: crate::manager::CredentialManager::new

use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_NAME: &str = ".owlkit";
const KEY_FILE: &str = ".key";
const STORE_FILE: &str = "credentials.enc";

pub const DEFAULT_NAMESPACE: &str = "owlkit";
pub const DEFAULT_ENV_PREFIX: &str = "OWLKIT";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Overrides the storage directory.
pub const ENV_CONFIG_DIR: &str = "OWLKIT_CONFIG_DIR";
/// Forces the encrypted-file backend when truthy.
pub const ENV_FORCE_FILE_STORE: &str = "OWLKIT_FORCE_FILE_STORE";

#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Directory holding the key file and the encrypted container.
    pub config_dir: PathBuf,
    /// Service name under which entries are grouped in the OS keystore.
    pub keyring_namespace: String,
    /// Skip the keystore probe and always use the encrypted file.
    pub force_file_backend: bool,
    pub probe_timeout: Duration,
    /// Prefix for per-platform token variables (`<PREFIX>_<PLATFORM>_TOKEN`).
    pub env_prefix: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            config_dir: home.join(CONFIG_DIR_NAME),
            keyring_namespace: DEFAULT_NAMESPACE.to_string(),
            force_file_backend: false,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }
}

impl CredentialConfig {
    /// Defaults, adjusted by `OWLKIT_CONFIG_DIR` and `OWLKIT_FORCE_FILE_STORE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup(ENV_CONFIG_DIR).filter(|d| !d.trim().is_empty()) {
            config.config_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup(ENV_FORCE_FILE_STORE) {
            config.force_file_backend = is_truthy(&flag);
        }
        config
    }

    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.keyring_namespace = namespace.into();
        self
    }

    pub fn with_force_file_backend(mut self, force: bool) -> Self {
        self.force_file_backend = force;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn key_path(&self) -> PathBuf {
        self.config_dir.join(KEY_FILE)
    }

    pub fn store_path(&self) -> PathBuf {
        self.config_dir.join(STORE_FILE)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
