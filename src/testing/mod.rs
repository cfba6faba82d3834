//! Unit-test helpers: fixed-key verifier, in-memory store, canned principals.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::auth::{IdentityVerifier, Principal, StaticKeyProvider};
use crate::config::StoreConfig;
use crate::state::AppState;
use crate::store::{MemoryStore, ScenarioStore};

pub const TEST_SECRET: &str = "unit-test-secret";

pub fn test_state() -> AppState {
    let mut store_config = StoreConfig::defaults();
    store_config.retry_backoff_ms = 1;

    AppState::new(
        IdentityVerifier::new(
            Arc::new(StaticKeyProvider::new(TEST_SECRET)),
            None,
            Duration::from_secs(60),
        ),
        ScenarioStore::new(Arc::new(MemoryStore::new()), store_config),
    )
}

pub fn principal(email: &str) -> Principal {
    Principal {
        subject: "test-subject".to_string(),
        email: email.to_lowercase(),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}
