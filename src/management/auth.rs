use std::sync::Arc;

use serde_json::{Value, json};

use crate::{
    store::{self, Document, DocumentStore, StoreError, USERS},
    types::{TokenRecord, TokenType, UserDocument},
};

/// Credential state of device users, kept in `users/{uid}.tokens`.
///
/// Writes are always merges so concurrent writers only clobber the fields
/// they set; last write wins.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn DocumentStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        TokenStore { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Merge-writes a token for `user_id`.
    ///
    /// Returns `Ok(false)` without touching the store when `token` is empty.
    /// `addedAt` is stamped with the store's clock. A non-empty `refresh` is
    /// only written for `TokenType::Access`; refresh cycles keep whatever
    /// refresh token is already stored.
    pub async fn save(
        &self,
        user_id: &str,
        token: &str,
        token_type: TokenType,
        refresh: Option<&str>,
    ) -> Result<bool, StoreError> {
        if token.is_empty() {
            return Ok(false);
        }

        let mut tokens = Document::new();
        tokens.insert("access".to_string(), Value::String(token.to_string()));
        tokens.insert(
            "addedAt".to_string(),
            serde_json::to_value(self.store.server_time())?,
        );
        if token_type == TokenType::Access {
            if let Some(refresh) = refresh.filter(|r| !r.is_empty()) {
                tokens.insert("refresh".to_string(), Value::String(refresh.to_string()));
            }
        }

        let mut fields = Document::new();
        fields.insert("tokens".to_string(), Value::Object(tokens));
        self.store.set_merge(USERS, user_id, fields).await?;
        Ok(true)
    }

    pub async fn user(&self, user_id: &str) -> Result<Option<UserDocument>, StoreError> {
        match self.store.get(USERS, user_id).await? {
            Some(doc) => Ok(Some(store::from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn load(&self, user_id: &str) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.user(user_id).await?.and_then(|user| user.tokens))
    }

    /// Creates `users/{uid}` for a freshly signed-in device.
    pub async fn register_user(&self, uid: &str) -> Result<(), StoreError> {
        let fields = store::to_document(&json!({ "uid": uid }))?;
        self.store.set_merge(USERS, uid, fields).await
    }

    /// Records the playback device the Web Playback SDK reported as ready.
    pub async fn save_device_id(&self, uid: &str, device_id: &str) -> Result<(), StoreError> {
        let fields = store::to_document(&json!({ "deviceId": device_id }))?;
        self.store.update(USERS, uid, fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn token_store() -> TokenStore {
        TokenStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn empty_token_is_not_written() {
        let tokens = token_store();
        let written = tokens
            .save("u1", "", TokenType::Access, Some("r1"))
            .await
            .unwrap();
        assert!(!written);
        assert!(tokens.user("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_login_stores_both_tokens() {
        let tokens = token_store();
        tokens
            .save("u1", "a1", TokenType::Access, Some("r1"))
            .await
            .unwrap();
        let record = tokens.load("u1").await.unwrap().unwrap();
        assert_eq!(record.access, "a1");
        assert_eq!(record.refresh.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn refresh_cycle_keeps_stored_refresh_token() {
        let tokens = token_store();
        tokens
            .save("u1", "a1", TokenType::Access, Some("r1"))
            .await
            .unwrap();
        tokens
            .save("u1", "a2", TokenType::Refresh, Some("ignored"))
            .await
            .unwrap();

        let record = tokens.load("u1").await.unwrap().unwrap();
        assert_eq!(record.access, "a2");
        assert_eq!(record.refresh.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn access_update_without_refresh_carries_it_forward() {
        let tokens = token_store();
        tokens
            .save("u1", "a1", TokenType::Access, Some("r1"))
            .await
            .unwrap();
        tokens
            .save("u1", "a2", TokenType::Access, Some(""))
            .await
            .unwrap();
        let record = tokens.load("u1").await.unwrap().unwrap();
        assert_eq!(record.refresh.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn token_merge_leaves_other_user_fields_alone() {
        let tokens = token_store();
        tokens.register_user("u1").await.unwrap();
        tokens.save_device_id("u1", "dev-1").await.unwrap();
        tokens
            .save("u1", "a1", TokenType::Access, Some("r1"))
            .await
            .unwrap();

        let user = tokens.user("u1").await.unwrap().unwrap();
        assert_eq!(user.uid, "u1");
        assert_eq!(user.device_id.as_deref(), Some("dev-1"));
        assert!(user.tokens.is_some());
    }

    #[tokio::test]
    async fn device_id_needs_an_existing_user() {
        let tokens = token_store();
        assert!(tokens.save_device_id("ghost", "dev").await.is_err());
    }
}
