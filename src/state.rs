use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::config::AppConfig;
use crate::store::{KeyValueBackend, MemoryStore, ScenarioStore};

/// Shared per-process state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<IdentityVerifier>,
    pub store: Arc<ScenarioStore>,
}

impl AppState {
    pub fn new(verifier: IdentityVerifier, store: ScenarioStore) -> Self {
        Self {
            verifier: Arc::new(verifier),
            store: Arc::new(store),
        }
    }

    /// Wire the configured verifier over the given backend. The backend is a
    /// parameter so the binary, local tooling and tests can each choose one.
    pub fn from_config(config: &AppConfig, backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::new(
            IdentityVerifier::from_config(&config.security),
            ScenarioStore::new(backend, config.store.clone()),
        )
    }

    /// State over a fresh in-memory backend, as used by the server binary
    /// outside of a vendor deployment and by the test suites.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::from_config(config, Arc::new(MemoryStore::new()))
    }
}
