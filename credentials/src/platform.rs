//! Seven Bridges platforms the toolkit can authenticate against.
//!
//! The table is fixed at build time. Each platform's token can be supplied
//! through `<PREFIX>_<PLATFORM>_TOKEN`, e.g. `OWLKIT_SBG_EU_TOKEN`.

use crate::config::DEFAULT_ENV_PREFIX;
use crate::error::{CredentialError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Identifier used on the command line and as the credential service name.
    pub id: &'static str,
    pub display_name: &'static str,
    pub api_endpoint: &'static str,
}

impl Platform {
    /// Token variable under the default `OWLKIT` prefix.
    pub fn env_var(&self) -> String {
        env_var_name(DEFAULT_ENV_PREFIX, self.id)
    }

    pub fn env_var_with_prefix(&self, prefix: &str) -> String {
        env_var_name(prefix, self.id)
    }
}

static PLATFORMS: &[Platform] = &[
    Platform {
        id: "cgc",
        display_name: "Cancer Genomics Cloud",
        api_endpoint: "https://cgc-api.sbgenomics.com/v2",
    },
    Platform {
        id: "sbg-us",
        display_name: "Seven Bridges (US)",
        api_endpoint: "https://api.sbgenomics.com/v2",
    },
    Platform {
        id: "sbg-eu",
        display_name: "Seven Bridges (EU)",
        api_endpoint: "https://eu-api.sbgenomics.com/v2",
    },
    Platform {
        id: "biodata-catalyst",
        display_name: "BioData Catalyst",
        api_endpoint: "https://api.sb.biodatacatalyst.nhlbi.nih.gov/v2",
    },
    Platform {
        id: "cavatica",
        display_name: "Cavatica",
        api_endpoint: "https://cavatica-api.sbgenomics.com/v2",
    },
];

/// Platform used when the caller does not name one.
pub const DEFAULT_PLATFORM: &str = "cgc";

/// Every known platform, in display order.
pub fn all() -> &'static [Platform] {
    PLATFORMS
}

pub fn ids() -> Vec<&'static str> {
    PLATFORMS.iter().map(|p| p.id).collect()
}

pub fn lookup(id: &str) -> Option<&'static Platform> {
    PLATFORMS.iter().find(|p| p.id == id)
}

/// Like [`lookup`], but an unknown id is a user input error.
pub fn resolve(id: &str) -> Result<&'static Platform> {
    lookup(id).ok_or_else(|| CredentialError::UnknownPlatform {
        platform: id.to_string(),
        known: ids(),
    })
}

/// [`resolve`] `id`, or [`DEFAULT_PLATFORM`] when none is given.
pub fn resolve_or_default(id: Option<&str>) -> Result<&'static Platform> {
    resolve(id.unwrap_or(DEFAULT_PLATFORM))
}

/// `<PREFIX>_<ID>_TOKEN` with the id upper-cased and `-` turned into `_`.
pub fn env_var_name(prefix: &str, id: &str) -> String {
    let id = id.to_ascii_uppercase().replace('-', "_");
    format!("{}_{id}_TOKEN", prefix.to_ascii_uppercase())
}
