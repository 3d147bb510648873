//! Credential manager: the one entry point consumers use.
//!
//! The backend is chosen once, when the manager is built, and callers never
//! learn which one it is except through [`CredentialManager::backend_kind`].
//! Lookups walk [`resolution_order`] and stop at the first source that holds
//! a value.

pub mod prompt;
pub mod resolve;

pub use prompt::{Prompter, TerminalPrompter};
pub use resolve::{Mode, Step, resolution_order};

use zeroize::Zeroizing;

use crate::backend::{self, BackendKind, FileBackend, KeyringBackend, SecretBackend};
use crate::config::{CredentialConfig, DEFAULT_ENV_PREFIX};
use crate::error::{CredentialError, Result};
use crate::platform;
use crate::secret::{Credential, Secret};

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Inputs to [`CredentialManager::get`] besides the service name.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub mode: Mode,
    /// Value given explicitly by the caller; wins over everything else.
    pub cli_value: Option<Secret>,
    /// Environment variable consulted after the stored credential.
    pub env_var: Option<String>,
    /// Custom prompt text for interactive entry.
    pub prompt: Option<String>,
}

impl GetOptions {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn interactive() -> Self {
        Self::new(Mode::Interactive)
    }

    pub fn non_interactive() -> Self {
        Self::new(Mode::NonInteractive)
    }

    pub fn cli_value(mut self, value: impl Into<Secret>) -> Self {
        self.cli_value = Some(value.into());
        self
    }

    /// Convenience for optional flags: `None` leaves the option unset.
    pub fn maybe_cli_value(mut self, value: Option<impl Into<Secret>>) -> Self {
        self.cli_value = value.map(Into::into);
        self
    }

    pub fn env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = Some(name.into());
        self
    }

    pub fn prompt(mut self, text: impl Into<String>) -> Self {
        self.prompt = Some(text.into());
        self
    }
}

/// What [`CredentialManager::set`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Created,
    Replaced,
    /// The user declined to replace the existing credential.
    Kept,
}

pub struct CredentialManager {
    backend: Box<dyn SecretBackend>,
    prompter: Box<dyn Prompter>,
    env: EnvLookup,
    env_prefix: String,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("backend", &self.backend.kind())
            .field("env_prefix", &self.env_prefix)
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    /// Probe the native keystore (unless the config forces the file store)
    /// and build a manager over whichever backend is usable.
    pub fn new(config: &CredentialConfig) -> Self {
        let backend = select_backend(config);
        Self::with_backend(backend).with_env_prefix(config.env_prefix.clone())
    }

    /// Build a manager over an explicit backend, skipping the probe.
    pub fn with_backend(backend: Box<dyn SecretBackend>) -> Self {
        Self {
            backend,
            prompter: Box::new(TerminalPrompter),
            env: Box::new(|name: &str| std::env::var(name).ok()),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }

    /// Replace how environment variables are read.
    pub fn with_env_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.env = Box::new(lookup);
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Resolve the secret for `service`.
    ///
    /// Order: `cli_value`, stored credential, `env_var`, then (interactive
    /// only) a prompt whose answer may be persisted. Backend failures are
    /// returned as they are; a miss in every source is
    /// [`CredentialError::NoCredential`].
    pub fn get(&self, service: &str, options: &GetOptions) -> Result<Secret> {
        for &step in resolution_order(options.mode) {
            let found = match step {
                Step::Explicit => options.cli_value.clone().filter(|v| !v.is_empty()),
                Step::Stored => self.backend.get(service)?.map(|c| c.secret),
                Step::Environment => options
                    .env_var
                    .as_deref()
                    .and_then(|var| (self.env)(var))
                    .filter(|v| !v.is_empty())
                    .map(Secret::from),
                Step::Prompt => self.prompt_and_offer_store(service, options.prompt.as_deref())?,
            };
            if let Some(secret) = found {
                tracing::debug!(service, source = %step, "resolved credential");
                return Ok(secret);
            }
        }

        Err(CredentialError::NoCredential {
            service: service.to_string(),
            env_var: options.env_var.clone(),
        })
    }

    /// Store `secret` for `service`.
    ///
    /// In interactive mode an existing credential is only replaced after the
    /// user confirms; non-interactive mode overwrites unconditionally.
    pub fn set(&self, service: &str, secret: impl Into<Secret>, mode: Mode) -> Result<SetOutcome> {
        self.set_credential(Credential::new(service, secret), mode)
    }

    /// Like [`set`](Self::set), keeping a username alongside the secret.
    pub fn set_with_username(
        &self,
        service: &str,
        username: &str,
        secret: impl Into<Secret>,
        mode: Mode,
    ) -> Result<SetOutcome> {
        self.set_credential(Credential::new(service, secret).with_username(username), mode)
    }

    fn set_credential(&self, credential: Credential, mode: Mode) -> Result<SetOutcome> {
        let service = credential.service.as_str();
        let exists = self.backend.get(service)?.is_some();
        if exists && mode.is_interactive() {
            let question = format!("A credential for '{service}' is already stored. Replace it?");
            if !self.prompter.confirm(&question, false).map_err(CredentialError::Prompt)? {
                tracing::info!(service, "kept existing credential");
                return Ok(SetOutcome::Kept);
            }
        }

        self.backend.set(&credential)?;
        tracing::info!(service, backend = %self.backend.kind(), replaced = exists, "stored credential");
        Ok(if exists {
            SetOutcome::Replaced
        } else {
            SetOutcome::Created
        })
    }

    /// Username stored with `service`, if any.
    pub fn username(&self, service: &str) -> Result<Option<String>> {
        Ok(self.backend.get(service)?.and_then(|c| c.username))
    }

    /// Remove the credential for `service`. Missing credentials are fine.
    pub fn delete(&self, service: &str) -> Result<()> {
        self.backend.delete(service)?;
        tracing::info!(service, backend = %self.backend.kind(), "deleted credential");
        Ok(())
    }

    /// Names of stored services; secrets are never returned.
    pub fn list_services(&self) -> Result<Vec<String>> {
        let mut services = self.backend.list()?;
        services.sort();
        Ok(services)
    }

    /// Always ask for a fresh secret, offer to store it, and return it.
    ///
    /// Used for "force new token" flows where a stored value must not be
    /// reused.
    pub fn prompt_and_store(&self, service: &str, prompt: Option<&str>) -> Result<Secret> {
        self.prompt_and_offer_store(service, prompt)?
            .ok_or_else(|| CredentialError::NoCredential {
                service: service.to_string(),
                env_var: None,
            })
    }

    /// Resolve the token for a registered platform (the default platform
    /// when `platform_id` is `None`): the platform id is the service name and
    /// `<PREFIX>_<PLATFORM>_TOKEN` is the environment source.
    pub fn get_platform_token(
        &self,
        platform_id: Option<&str>,
        mode: Mode,
        cli_value: Option<Secret>,
    ) -> Result<Secret> {
        let platform = platform::resolve_or_default(platform_id)?;
        let options = GetOptions {
            mode,
            cli_value,
            env_var: Some(platform.env_var_with_prefix(&self.env_prefix)),
            prompt: Some(format!(
                "Enter your {} authentication token: ",
                platform.display_name
            )),
        };
        self.get(platform.id, &options)
    }

    /// Copy every credential of `source` into the active backend.
    pub fn import_from(&self, source: &dyn SecretBackend) -> Result<usize> {
        backend::migrate(source, self.backend.as_ref())
    }

    fn prompt_and_offer_store(&self, service: &str, prompt: Option<&str>) -> Result<Option<Secret>> {
        let text = match prompt {
            Some(text) => text.to_string(),
            None => format!("Enter credential for {service}: "),
        };
        let answer = Zeroizing::new(self.prompter.secret(&text).map_err(CredentialError::Prompt)?);
        let answer = answer.trim();
        if answer.is_empty() {
            tracing::debug!(service, "no credential entered");
            return Ok(None);
        }

        let secret = Secret::from(answer);
        let store = self
            .prompter
            .confirm("Store this credential securely?", true)
            .map_err(CredentialError::Prompt)?;
        if store {
            self.backend.set(&Credential::new(service, secret.clone()))?;
            tracing::info!(service, backend = %self.backend.kind(), "stored credential");
        }
        Ok(Some(secret))
    }
}

fn select_backend(config: &CredentialConfig) -> Box<dyn SecretBackend> {
    select_backend_with(config, |config| {
        backend::probe::is_available(&config.keyring_namespace, config.probe_timeout)
    })
}

/// The native keystore if `probe` says it works, the encrypted file
/// otherwise. `probe` is not called when the file store is forced.
fn select_backend_with(
    config: &CredentialConfig,
    probe: impl FnOnce(&CredentialConfig) -> bool,
) -> Box<dyn SecretBackend> {
    if config.force_file_backend {
        tracing::info!(
            path = %config.store_path().display(),
            "file credential store forced by configuration"
        );
        return Box::new(FileBackend::new(config));
    }
    if probe(config) {
        let keyring = KeyringBackend::new(config.keyring_namespace.clone());
        tracing::info!(namespace = keyring.namespace(), "using system keyring");
        return Box::new(keyring);
    }
    tracing::warn!(
        reason = %CredentialError::BackendUnavailable,
        path = %config.store_path().display(),
        "falling back to encrypted file store"
    );
    Box::new(FileBackend::new(config))
}
