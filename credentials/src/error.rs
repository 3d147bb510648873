//! Error taxonomy for the credential core.
//!
//! Every variant names the service, platform or path involved and the kind of
//! failure. None of them carries secret material.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why the native keystore refused an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailure {
    /// The keystore daemon or platform API could not be reached.
    Unreachable,
    /// The keystore is locked or the caller lacks access.
    PermissionDenied,
    /// The keystore returned data we could not interpret.
    Corrupted,
    /// The keystore refused the entry's name or value (too long, invalid
    /// characters, several matching entries).
    Rejected,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unreachable => "keystore unreachable",
            Self::PermissionDenied => "keystore permission denied",
            Self::Corrupted => "keystore entry corrupted",
            Self::Rejected => "keystore rejected the entry",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    /// The native secure store failed its probe. The manager absorbs this and
    /// falls back to the encrypted file.
    #[error("secure keystore is not available on this host")]
    BackendUnavailable,

    #[error("credential store {} is unreadable: {reason}", .path.display())]
    CorruptStore { path: PathBuf, reason: String },

    #[error("no credential found for '{service}'{}", env_hint(.env_var))]
    NoCredential {
        service: String,
        env_var: Option<String>,
    },

    #[error("unknown platform '{platform}' (known: {})", .known.join(", "))]
    UnknownPlatform {
        platform: String,
        known: Vec<&'static str>,
    },

    #[error("{failure} for '{service}'")]
    Backend {
        service: String,
        failure: BackendFailure,
    },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Caller-supplied data that cannot be written as given.
    #[error("invalid {what}: {reason}")]
    InvalidInput { what: &'static str, reason: String },

    #[error("cryptographic failure: {0}")]
    Crypto(String),

    #[error("terminal prompt failed: {0}")]
    Prompt(#[source] io::Error),
}

impl CredentialError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(what: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            what,
            reason: reason.into(),
        }
    }

    pub(crate) fn backend(service: &str, failure: BackendFailure) -> Self {
        Self::Backend {
            service: service.to_string(),
            failure,
        }
    }
}

fn env_hint(env_var: &Option<String>) -> String {
    match env_var {
        Some(var) => format!("; set {var} or run interactively"),
        None => "; run interactively to enter one".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, CredentialError>;
