//! In-memory backend used for local development and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{Item, ItemKey, KeyValueBackend, StoreError};

type Partition = BTreeMap<(String, String), Item>;

/// BTreeMap keyed by (partition, sort) gives ascending sort-key order within
/// a partition for free, matching the ordering contract of `query`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Partition>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Partition>> {
        // Lock poisoning only happens if a writer panicked; treat as fatal.
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Partition>> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KeyValueBackend for MemoryStore {
    async fn put_item(&self, table: &str, key: ItemKey, item: Item) -> Result<(), StoreError> {
        let mut tables = self.write();
        let rows = tables.entry(table.to_string()).or_default();
        rows.insert((key.partition, key.sort), item);
        Ok(())
    }

    async fn get_item(&self, table: &str, key: &ItemKey) -> Result<Option<Item>, StoreError> {
        let tables = self.read();
        Ok(tables
            .get(table)
            .and_then(|rows| rows.get(&(key.partition.clone(), key.sort.clone())))
            .cloned())
    }

    async fn query(
        &self,
        table: &str,
        partition: &str,
        sort_prefix: &str,
    ) -> Result<Vec<Item>, StoreError> {
        let tables = self.read();
        let Some(rows) = tables.get(table) else {
            return Ok(vec![]);
        };

        let items = rows
            .range((partition.to_string(), String::new())..)
            .take_while(|((pk, _), _)| pk == partition)
            .filter(|((_, sk), _)| sk.starts_with(sort_prefix))
            .map(|(_, item)| item.clone())
            .collect();

        Ok(items)
    }

    async fn query_index(
        &self,
        table: &str,
        _index: &str,
        attr: &str,
        value: &str,
    ) -> Result<Vec<Item>, StoreError> {
        // A real adapter queries the named index; a table scan is acceptable
        // for the in-memory backend.
        let tables = self.read();
        let Some(rows) = tables.get(table) else {
            return Ok(vec![]);
        };

        let items = rows
            .values()
            .filter(|item| item.get(attr).and_then(|v| v.as_str()) == Some(value))
            .cloned()
            .collect();

        Ok(items)
    }

    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        patch: Item,
    ) -> Result<Option<Item>, StoreError> {
        let mut tables = self.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(None);
        };
        let Some(item) = rows.get_mut(&(key.partition.clone(), key.sort.clone())) else {
            return Ok(None);
        };

        for (field, value) in patch {
            item.insert(field, value);
        }

        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, table: &str, key: &ItemKey) -> Result<bool, StoreError> {
        let mut tables = self.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(false);
        };
        Ok(rows
            .remove(&(key.partition.clone(), key.sort.clone()))
            .is_some())
    }
}
