//! Secret values and the credential record.

use std::fmt;

use zeroize::Zeroizing;

/// Opaque secret bytes. Wiped on drop; never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Raw bytes of the secret. Callers must not log the result.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// The secret as UTF-8, if it is valid text (tokens always are).
    pub fn expose_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Secret {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

/// A stored secret together with the service it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Unique key within a store.
    pub service: String,
    pub secret: Secret,
    /// Optional account name the secret belongs to.
    pub username: Option<String>,
}

impl Credential {
    pub fn new(service: impl Into<String>, secret: impl Into<Secret>) -> Self {
        Self {
            service: service.into(),
            secret: secret.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}
