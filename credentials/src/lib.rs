//! OWLKit credential core
//!
//! Stores and resolves secrets for the services the toolkit talks to
//! (container registries, Seven Bridges platforms):
//! - OS keystore when one is usable, AES-256-GCM encrypted file otherwise
//! - Resolution order: explicit value, stored secret, environment, prompt
//! - Non-interactive mode for CI that never touches the terminal
//!
//! Consumers only talk to [`CredentialManager`]; they never see which
//! backend is active.

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod platform;
pub mod secret;
pub mod sevenbridges;

// Re-export commonly used types
pub use backend::{BackendKind, SecretBackend};
pub use config::CredentialConfig;
pub use error::{BackendFailure, CredentialError, Result};
pub use manager::{CredentialManager, GetOptions, Mode, Prompter, SetOutcome};
pub use platform::Platform;
pub use secret::{Credential, Secret};
