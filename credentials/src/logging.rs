//! Structured logging for binaries embedding the credential core.
//!
//! Events go to stderr so stdout stays usable for piped output. The crate
//! only ever logs service names, paths and backend kinds.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global `tracing` subscriber filtered by `RUST_LOG` (default
/// `info`). Returns `false` if a subscriber was already installed.
pub fn init() -> bool {
    init_with_default("info")
}

pub fn init_with_default(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        let _ = init_with_default("debug");
        assert!(!init());
    }
}
