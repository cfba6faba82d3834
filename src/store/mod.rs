//! Key-value persistence for scenarios and scenario data.
//!
//! The API core only speaks the narrow [`KeyValueBackend`] interface; the
//! vendor-specific adapter lives behind it. [`MemoryStore`] is the local and
//! test backend. [`ScenarioStore`] layers the table layout, key derivation,
//! bounded timeouts and retry policy on top.

pub mod memory;
pub mod scenario;

pub use memory::MemoryStore;
pub use scenario::{ScenarioRow, ScenarioStore};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A stored item is a flat field map, mirroring a document-store row.
pub type Item = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item not found")]
    NotFound,
    /// Transient failure (timeout, connection loss). Eligible for retry at
    /// the store layer, never at the handler layer.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("write conflict: {0}")]
    Conflict(String),
}

/// Composite primary key: partition key plus sort key. Tables without a sort
/// key use the empty string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ItemKey {
    pub partition: String,
    pub sort: String,
}

impl ItemKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }

    pub fn partition_only(partition: impl Into<String>) -> Self {
        Self::new(partition, "")
    }
}

/// Narrow persistence interface. Writes are immediately visible to subsequent
/// reads from the same process; `query` returns items in ascending sort-key
/// order.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    async fn put_item(&self, table: &str, key: ItemKey, item: Item) -> Result<(), StoreError>;

    async fn get_item(&self, table: &str, key: &ItemKey) -> Result<Option<Item>, StoreError>;

    /// All items in `partition` whose sort key starts with `sort_prefix`.
    /// An empty prefix returns the whole partition.
    async fn query(
        &self,
        table: &str,
        partition: &str,
        sort_prefix: &str,
    ) -> Result<Vec<Item>, StoreError>;

    /// Secondary-index lookup: all items where attribute `attr` equals
    /// `value`, regardless of partition.
    async fn query_index(
        &self,
        table: &str,
        index: &str,
        attr: &str,
        value: &str,
    ) -> Result<Vec<Item>, StoreError>;

    /// Field-level merge into an existing item. Returns the updated item, or
    /// None when the key does not exist. Fields absent from `patch` are left
    /// untouched (partial-update semantics).
    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        patch: Item,
    ) -> Result<Option<Item>, StoreError>;

    /// Returns whether an item was actually removed.
    async fn delete_item(&self, table: &str, key: &ItemKey) -> Result<bool, StoreError>;
}
