use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub security: SecurityConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// HMAC secret shared with the identity provider. Empty means token
    /// verification always fails; there is no unauthenticated fallback.
    pub jwt_secret: String,
    /// Expected `iss` claim. None skips issuer matching (local development).
    pub jwt_issuer: Option<String>,
    /// How long a fetched key set stays usable before a refresh.
    pub key_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub scenario_table: String,
    pub scenario_data_table: String,
    pub recurring_table: String,
    pub user_email_index: String,
    /// Per-call timeout; a call that exceeds it fails as StoreUnavailable.
    pub op_timeout_ms: u64,
    /// Retries on transient failure, store layer only.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Overall budget for one logical operation including retries. A retry is
    /// only started while budget remains.
    pub op_deadline_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Security overrides
        if let Ok(v) = env::var("AUTH_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("AUTH_JWT_ISSUER") {
            self.security.jwt_issuer = if v.is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = env::var("AUTH_KEY_CACHE_TTL_SECS") {
            self.security.key_cache_ttl_secs =
                v.parse().unwrap_or(self.security.key_cache_ttl_secs);
        }

        // Store overrides
        if let Ok(v) = env::var("SCENARIO_TABLE") {
            self.store.scenario_table = v;
        }
        if let Ok(v) = env::var("SCENARIO_DATA_TABLE") {
            self.store.scenario_data_table = v;
        }
        if let Ok(v) = env::var("RECURRING_TABLE") {
            self.store.recurring_table = v;
        }
        if let Ok(v) = env::var("USER_EMAIL_INDEX") {
            self.store.user_email_index = v;
        }
        if let Ok(v) = env::var("STORE_OP_TIMEOUT_MS") {
            self.store.op_timeout_ms = v.parse().unwrap_or(self.store.op_timeout_ms);
        }
        if let Ok(v) = env::var("STORE_MAX_RETRIES") {
            self.store.max_retries = v.parse().unwrap_or(self.store.max_retries);
        }
        if let Ok(v) = env::var("STORE_RETRY_BACKOFF_MS") {
            self.store.retry_backoff_ms = v.parse().unwrap_or(self.store.retry_backoff_ms);
        }
        if let Ok(v) = env::var("STORE_OP_DEADLINE_MS") {
            self.store.op_deadline_ms = v.parse().unwrap_or(self.store.op_deadline_ms);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_issuer: None,
                key_cache_ttl_secs: 300,
            },
            store: StoreConfig::defaults(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_issuer: None,
                key_cache_ttl_secs: 600,
            },
            store: StoreConfig::defaults(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_issuer: None,
                key_cache_ttl_secs: 3600,
            },
            store: StoreConfig {
                op_timeout_ms: 2000,
                max_retries: 2,
                retry_backoff_ms: 100,
                op_deadline_ms: 8000,
                ..StoreConfig::defaults()
            },
        }
    }
}

impl StoreConfig {
    pub fn defaults() -> Self {
        Self {
            scenario_table: "Scenario".to_string(),
            scenario_data_table: "ScenarioData".to_string(),
            recurring_table: "RecurringItem".to_string(),
            user_email_index: "UserEmailIndex".to_string(),
            op_timeout_ms: 5000,
            max_retries: 2,
            retry_backoff_ms: 50,
            op_deadline_ms: 15000,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
