use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    DocumentStore, Document, Filter, StoreError, WriteBatch, WriteOp, check_batch, merge_into,
};

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: &str) -> usize {
        let lock = self.collections.lock().await;
        lock.get(collection).map(|docs| docs.len()).unwrap_or(0)
    }

    pub async fn all(&self, collection: &str) -> Vec<Document> {
        let lock = self.collections.lock().await;
        lock.get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }
}

pub(super) fn apply(collections: &mut Collections, op: WriteOp) {
    match op {
        WriteOp::SetMerge {
            collection,
            id,
            fields,
        } => {
            let doc = collections
                .entry(collection)
                .or_default()
                .entry(id)
                .or_default();
            merge_into(doc, fields);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let lock = self.collections.lock().await;
        Ok(lock.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn set_merge(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.set_merge(collection, id, fields);
        self.commit(batch).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let mut lock = self.collections.lock().await;
        let doc = lock
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge_into(doc, fields);
        Ok(())
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        let lock = self.collections.lock().await;
        Ok(lock
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| filters.iter().all(|f| f.matches(doc)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        check_batch(&batch)?;
        let mut lock = self.collections.lock().await;
        for op in batch.into_ops() {
            apply(&mut lock, op);
        }
        Ok(())
    }
}
