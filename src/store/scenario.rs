//! Typed store layer: table layout, key derivation, timeouts and retries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::StoreConfig;

use super::{Item, ItemKey, KeyValueBackend, StoreError};

/// One row of the Scenario table. `active` is the sort-key ordinal; the
/// lowest ordinal is the currently active plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRow {
    pub email: String,
    pub active: i64,
    pub scenario_id: String,
    pub name: String,
}

/// ScenarioData partition key: `hex(sha256(email)) + "#" + scenarioId`.
///
/// Hashing the email keeps the composite unambiguous for any email the
/// identity provider may hand us: the digest is hex, so the `#` separator
/// cannot occur inside it. This rule is part of the storage contract.
pub fn scenario_data_id(email: &str, scenario_id: &str) -> String {
    let digest = Sha256::digest(email.as_bytes());
    format!("{:x}#{}", digest, scenario_id)
}

/// Sort keys are `<Type>#<itemId>` so "all records of type T" is a prefix
/// query. The Settings singleton uses the bare type name.
pub fn record_sort_key(record_type: &str, item_id: &str) -> String {
    format!("{}#{}", record_type, item_id)
}

pub fn record_sort_prefix(record_type: &str) -> String {
    format!("{}#", record_type)
}

/// Scenario table sort keys are the zero-padded ordinal, so partitions list
/// in ordinal order.
fn scenario_sort_key(active: i64) -> String {
    format!("{:08}", active)
}

pub struct ScenarioStore {
    backend: Arc<dyn KeyValueBackend>,
    config: StoreConfig,
}

impl ScenarioStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, config: StoreConfig) -> Self {
        Self { backend, config }
    }

    /// Run one backend call with a bounded timeout, retrying transient
    /// failures with exponential backoff while deadline budget remains.
    /// NotFound and Conflict are never retried.
    async fn run<T, F, Fut>(&self, op: &str, call: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let started = Instant::now();
        let deadline = Duration::from_millis(self.config.op_deadline_ms);
        let op_timeout = Duration::from_millis(self.config.op_timeout_ms);

        let mut attempt: u32 = 0;
        loop {
            let outcome = tokio::time::timeout(op_timeout, call()).await;
            let detail = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(StoreError::Unavailable(detail))) => detail,
                Ok(Err(other)) => return Err(other),
                Err(_) => format!("{} timed out after {:?}", op, op_timeout),
            };

            attempt += 1;
            let backoff =
                Duration::from_millis(self.config.retry_backoff_ms) * 2u32.pow(attempt - 1);

            // Check remaining budget before starting a retry.
            if attempt > self.config.max_retries || started.elapsed() + backoff >= deadline {
                tracing::error!("Store operation {} failed after {} attempt(s): {}", op, attempt, detail);
                return Err(StoreError::Unavailable(detail));
            }

            tracing::warn!("Store operation {} attempt {} failed, retrying: {}", op, attempt, detail);
            tokio::time::sleep(backoff).await;
        }
    }

    // ---- Scenario table ----

    pub async fn put_scenario(&self, row: &ScenarioRow) -> Result<(), StoreError> {
        let item = row_to_item(row)?;
        let key = ItemKey::new(row.email.clone(), scenario_sort_key(row.active));
        self.run("put_scenario", || {
            self.backend
                .put_item(&self.config.scenario_table, key.clone(), item.clone())
        })
        .await
    }

    /// All Scenario rows for a user, in ordinal order. A user with no
    /// scenarios gets an empty list, not an error.
    pub async fn list_scenarios(&self, email: &str) -> Result<Vec<ScenarioRow>, StoreError> {
        let items = self
            .run("list_scenarios", || {
                self.backend.query(&self.config.scenario_table, email, "")
            })
            .await?;

        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(Value::Object(item)) {
                Ok(row) => Some(row),
                Err(e) => {
                    tracing::warn!("Skipping malformed Scenario row: {}", e);
                    None
                }
            })
            .collect())
    }

    pub async fn find_scenario(
        &self,
        email: &str,
        scenario_id: &str,
    ) -> Result<Option<ScenarioRow>, StoreError> {
        let rows = self.list_scenarios(email).await?;
        Ok(rows.into_iter().find(|row| row.scenario_id == scenario_id))
    }

    /// Ordinal for the next scenario of this user. First scenario gets 1 and
    /// is therefore the active one.
    pub async fn next_scenario_ordinal(&self, email: &str) -> Result<i64, StoreError> {
        let rows = self.list_scenarios(email).await?;
        Ok(rows.iter().map(|row| row.active).max().unwrap_or(0) + 1)
    }

    // ---- ScenarioData table ----

    pub async fn put_record(
        &self,
        data_id: &str,
        sort_key: &str,
        item: Item,
    ) -> Result<(), StoreError> {
        let key = ItemKey::new(data_id, sort_key);
        self.run("put_record", || {
            self.backend
                .put_item(&self.config.scenario_data_table, key.clone(), item.clone())
        })
        .await
    }

    pub async fn get_record(
        &self,
        data_id: &str,
        sort_key: &str,
    ) -> Result<Option<Item>, StoreError> {
        let key = ItemKey::new(data_id, sort_key);
        self.run("get_record", || {
            self.backend.get_item(&self.config.scenario_data_table, &key)
        })
        .await
    }

    pub async fn query_records(
        &self,
        data_id: &str,
        sort_prefix: &str,
    ) -> Result<Vec<Item>, StoreError> {
        self.run("query_records", || {
            self.backend
                .query(&self.config.scenario_data_table, data_id, sort_prefix)
        })
        .await
    }

    pub async fn update_record(
        &self,
        data_id: &str,
        sort_key: &str,
        patch: Item,
    ) -> Result<Option<Item>, StoreError> {
        let key = ItemKey::new(data_id, sort_key);
        self.run("update_record", || {
            self.backend
                .update_item(&self.config.scenario_data_table, &key, patch.clone())
        })
        .await
    }

    pub async fn delete_record(&self, data_id: &str, sort_key: &str) -> Result<bool, StoreError> {
        let key = ItemKey::new(data_id, sort_key);
        self.run("delete_record", || {
            self.backend.delete_item(&self.config.scenario_data_table, &key)
        })
        .await
    }

    // ---- RecurringItem table (cross-scenario view, UserEmailIndex) ----

    pub async fn put_recurring_item(&self, id: &str, item: Item) -> Result<(), StoreError> {
        let key = ItemKey::partition_only(id);
        self.run("put_recurring_item", || {
            self.backend
                .put_item(&self.config.recurring_table, key.clone(), item.clone())
        })
        .await
    }

    pub async fn update_recurring_item(
        &self,
        id: &str,
        patch: Item,
    ) -> Result<Option<Item>, StoreError> {
        let key = ItemKey::partition_only(id);
        self.run("update_recurring_item", || {
            self.backend
                .update_item(&self.config.recurring_table, &key, patch.clone())
        })
        .await
    }

    pub async fn delete_recurring_item(&self, id: &str) -> Result<bool, StoreError> {
        let key = ItemKey::partition_only(id);
        self.run("delete_recurring_item", || {
            self.backend.delete_item(&self.config.recurring_table, &key)
        })
        .await
    }

    pub async fn list_recurring_by_email(&self, email: &str) -> Result<Vec<Item>, StoreError> {
        self.run("list_recurring_by_email", || {
            self.backend.query_index(
                &self.config.recurring_table,
                &self.config.user_email_index,
                "email",
                email,
            )
        })
        .await
    }
}

fn row_to_item(row: &ScenarioRow) -> Result<Item, StoreError> {
    match serde_json::to_value(row) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(StoreError::Unavailable(
            "failed to serialize Scenario row".to_string(),
        )),
    }
}
