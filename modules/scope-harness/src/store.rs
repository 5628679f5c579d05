//! Record store collaborator seen by the harness.

use async_trait::async_trait;
use scope_enforcer::EffectiveQuery;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// An index as reported by the store: ordered key fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<String>,
}

impl IndexSpec {
    /// Index named after its keys, `field_1` style.
    #[must_use]
    pub fn on(keys: &[&str]) -> Self {
        let name = keys
            .iter()
            .map(|k| format!("{k}_1"))
            .collect::<Vec<_>>()
            .join("_");
        Self {
            name,
            keys: keys.iter().map(|k| (*k).to_owned()).collect(),
        }
    }

    #[must_use]
    pub fn leading_key(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    /// True if an equality on `field` can use this index, either as the
    /// leading key or right after the tenant key.
    #[must_use]
    pub fn supports(&self, field: &str, tenant_field: Option<&str>) -> bool {
        match self.keys.as_slice() {
            [first, ..] if first == field => true,
            [first, second, ..] => tenant_field == Some(first.as_str()) && second == field,
            _ => false,
        }
    }
}

/// Operations the harness needs from a record store.
///
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_many(&self, collection: &str, docs: Vec<Value>) -> Result<(), StoreError>;

    /// Documents in `collection` matching `query`.
    ///
    /// Takes the merged query only, so nothing reaches the store without its
    /// scope constraints.
    async fn find(
        &self,
        collection: &str,
        query: &EffectiveQuery,
    ) -> Result<Vec<Value>, StoreError>;

    async fn drop_collection(&self, collection: &str) -> Result<(), StoreError>;

    /// Indexes defined on `collection`. Empty for an unknown collection.
    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexSpec>, StoreError>;

    /// Number of documents in `collection`.
    async fn count(&self, collection: &str) -> Result<u64, StoreError>;

    /// Number of documents where `field` is absent or null.
    async fn count_missing(&self, collection: &str, field: &str) -> Result<u64, StoreError>;
}
