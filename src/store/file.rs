use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    DocumentStore, Document, Filter, StoreError, WriteBatch, WriteOp, check_batch, merge_into,
};

type CollectionDocs = BTreeMap<String, Document>;

/// Keeps every collection as a pretty-printed JSON object of `id -> document`
/// in `<root>/<collection>.json`.
pub struct FileStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.json", collection))
    }

    async fn load(&self, collection: &str) -> Result<CollectionDocs, StoreError> {
        let path = self.collection_path(collection);
        match async_fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CollectionDocs::new()),
            Err(e) => Err(StoreError::IoError(e)),
        }
    }

    async fn persist(&self, collection: &str, docs: &CollectionDocs) -> Result<(), StoreError> {
        async_fs::create_dir_all(&self.root).await?;
        let path = self.collection_path(collection);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(docs)?;
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.load(collection).await?;
        Ok(docs.remove(id))
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
        let _guard = self.lock.lock().await;
        let mut docs = self.load(collection).await?;
        let doc = docs.get_mut(id).ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
        merge_into(doc, fields);
        self.persist(collection, &docs).await
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        let _guard = self.lock.lock().await;
        let docs = self.load(collection).await?;
        Ok(docs
            .into_values()
            .filter(|doc| filters.iter().all(|f| f.matches(doc)))
            .collect())
    }

    /// A batch is written by replacing its collection file, so batches
    /// spanning collections are rejected before anything is written.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        check_batch(&batch)?;
        let Some(WriteOp::SetMerge { collection, .. }) = batch.ops().first() else {
            return Ok(());
        };
        let collection = collection.clone();
        if batch
            .ops()
            .iter()
            .any(|WriteOp::SetMerge { collection: c, .. }| *c != collection)
        {
            return Err(StoreError::InvalidDocument(
                "batch spans more than one collection".to_string(),
            ));
        }

        let _guard = self.lock.lock().await;
        let mut docs = self.load(&collection).await?;
        for WriteOp::SetMerge { id, fields, .. } in batch.into_ops() {
            merge_into(docs.entry(id).or_default(), fields);
        }
        self.persist(&collection, &docs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{TRACKS, USERS};
    use serde_json::json;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("jukebox-store-{}", crate::utils::generate_uid()))
    }

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn documents_survive_a_new_handle() {
        let root = temp_root();
        let store = FileStore::new(&root);
        store
            .set_merge(USERS, "u1", doc(json!({ "uid": "u1" })))
            .await
            .unwrap();

        let reopened = FileStore::new(&root);
        let user = reopened.get(USERS, "u1").await.unwrap().unwrap();
        assert_eq!(user["uid"], json!("u1"));

        let _ = async_fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn batch_commit_and_query() {
        let root = temp_root();
        let store = FileStore::new(&root);
        let mut batch = WriteBatch::new();
        batch.create(TRACKS, doc(json!({ "uri": "spotify:track:a", "addedAtHour": 9 })));
        batch.create(TRACKS, doc(json!({ "uri": "spotify:track:b", "addedAtHour": 10 })));
        store.commit(batch).await.unwrap();

        let nine = store
            .query(TRACKS, &[Filter::eq("addedAtHour", 9)])
            .await
            .unwrap();
        assert_eq!(nine.len(), 1);
        assert_eq!(nine[0]["uri"], json!("spotify:track:a"));

        let _ = async_fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn batch_across_collections_writes_nothing() {
        let root = temp_root();
        let store = FileStore::new(&root);
        let mut batch = WriteBatch::new();
        batch.set_merge(USERS, "u1", doc(json!({ "uid": "u1" })));
        batch.create(TRACKS, doc(json!({ "uri": "spotify:track:a" })));

        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
        assert!(store.get(USERS, "u1").await.unwrap().is_none());
        assert!(store.query(TRACKS, &[]).await.unwrap().is_empty());

        let _ = async_fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = FileStore::new(temp_root());
        let err = store
            .update(USERS, "nobody", doc(json!({ "deviceId": "d" })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
