//! Startup detection of a usable native keystore.
//!
//! Headless Linux hosts and minimal containers routinely have no keystore, so
//! unavailability is reported as `false` rather than as an error.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use super::keyring;

// Probe entries never share a keyring service with credentials.
const PROBE_SUFFIX: &str = ":probe";
const PROBE_VALUE: &[u8] = b"owlkit-probe";

/// Whether the native keystore can store, return and delete an entry.
///
/// The round trip runs on a helper thread; if it has not answered within
/// `timeout` the keystore is treated as unavailable and the thread is left to
/// finish on its own.
pub fn is_available(namespace: &str, timeout: Duration) -> bool {
    let namespace = format!("{namespace}{PROBE_SUFFIX}");
    let user = std::process::id().to_string();
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("keystore-probe".into())
        .spawn(move || {
            let _ = tx.send(round_trip(&namespace, &user));
        });
    if let Err(e) = spawned {
        tracing::debug!(error = %e, "could not start keystore probe");
        return false;
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => true,
        Ok(Err(reason)) => {
            tracing::debug!(%reason, "keystore probe failed");
            false
        }
        // A panicking probe drops the sender, which also lands here.
        Err(e) => {
            tracing::debug!(error = %e, ?timeout, "keystore probe did not answer");
            false
        }
    }
}

fn round_trip(namespace: &str, user: &str) -> Result<(), String> {
    keyring::set_secret(namespace, user, PROBE_VALUE).map_err(|e| e.to_string())?;
    let read = keyring::get_secret(namespace, user).map_err(|e| e.to_string());
    let deleted = keyring::delete_secret(namespace, user).map_err(|e| e.to_string());
    match read? {
        Some(bytes) if bytes == PROBE_VALUE => deleted,
        Some(_) => Err("probe value changed in transit".to_string()),
        None => Err("probe entry vanished".to_string()),
    }
}
