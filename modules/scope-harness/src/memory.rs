//! In-process record store.

use async_trait::async_trait;
use dashmap::DashMap;
use scope_enforcer::EffectiveQuery;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{IndexSpec, RecordStore};

const ID_INDEX: &str = "_id_";

/// Record store backed by concurrent maps. Every collection carries the
/// implicit `_id` index.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    collections: DashMap<String, Vec<Value>>,
    indexes: DashMap<String, Vec<IndexSpec>>,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define an index on `collection`. A duplicate key list is ignored.
    pub fn create_index(&self, collection: &str, keys: &[&str]) {
        let spec = IndexSpec::on(keys);
        let mut entry = self.indexes.entry(collection.to_owned()).or_default();
        if !entry.iter().any(|i| i.keys == spec.keys) {
            entry.push(spec);
        }
    }

    /// Builder form of [`Self::create_index`].
    #[must_use]
    pub fn with_index(self, collection: &str, keys: &[&str]) -> Self {
        self.create_index(collection, keys);
        self
    }

    /// Names of collections currently holding documents.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_many(&self, collection: &str, docs: Vec<Value>) -> Result<(), StoreError> {
        if let Some(bad) = docs.iter().find(|d| !d.is_object()) {
            return Err(StoreError::Rejected {
                collection: collection.to_owned(),
                reason: format!("document is not an object: {bad}"),
            });
        }
        self.collections
            .entry(collection.to_owned())
            .or_default()
            .extend(docs);
        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        query: &EffectiveQuery,
    ) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.collections.remove(collection);
        Ok(())
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexSpec>, StoreError> {
        let mut out = vec![IndexSpec {
            name: ID_INDEX.to_owned(),
            keys: vec!["_id".to_owned()],
        }];
        if let Some(defined) = self.indexes.get(collection) {
            out.extend(defined.iter().cloned());
        }
        Ok(out)
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let n = self.collections.get(collection).map_or(0, |docs| docs.len());
        Ok(n as u64)
    }

    async fn count_missing(&self, collection: &str, field: &str) -> Result<u64, StoreError> {
        let n = self.collections.get(collection).map_or(0, |docs| {
            docs.iter()
                .filter(|d| d.get(field).is_none_or(Value::is_null))
                .count()
        });
        Ok(n as u64)
    }
}
