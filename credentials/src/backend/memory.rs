//! Process-local backend. Nothing survives the process.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{BackendKind, SecretBackend};
use crate::error::Result;
use crate::secret::Credential;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, Credential>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Credential>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SecretBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn get(&self, service: &str) -> Result<Option<Credential>> {
        Ok(self.entries().get(service).cloned())
    }

    fn set(&self, credential: &Credential) -> Result<()> {
        self.entries()
            .insert(credential.service.clone(), credential.clone());
        Ok(())
    }

    fn delete(&self, service: &str) -> Result<()> {
        self.entries().remove(service);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.entries().keys().cloned().collect())
    }
}
