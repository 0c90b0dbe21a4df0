use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    config,
    store::{self, ACCOUNTS, DocumentStore, StoreError, USERS},
    utils,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub email_verified: bool,
}

#[derive(Debug)]
pub enum IdentityError {
    UserNotFound(String),
    Store(StoreError),
    IoError(std::io::Error),
    SerdeError(serde_json::Error),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::UserNotFound(uid) => write!(f, "no account for user {}", uid),
            IdentityError::Store(e) => write!(f, "{}", e),
            IdentityError::IoError(e) => write!(f, "identity file error: {}", e),
            IdentityError::SerdeError(e) => write!(f, "identity file is malformed: {}", e),
        }
    }
}

impl std::error::Error for IdentityError {}

impl From<StoreError> for IdentityError {
    fn from(err: StoreError) -> Self {
        IdentityError::Store(err)
    }
}

/// The authentication service device users are registered with.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates an anonymous account and returns its uid.
    async fn sign_in_anonymously(&self) -> Result<String, IdentityError>;

    /// Fails with `UserNotFound` when no account exists for `profile.uid`.
    async fn update_user(&self, profile: &Profile) -> Result<(), IdentityError>;

    async fn create_user(&self, profile: &Profile) -> Result<(), IdentityError>;
}

/// Identity provider keeping accounts in the `accounts` collection.
#[derive(Clone)]
pub struct StoreIdentityProvider {
    store: Arc<dyn DocumentStore>,
}

impl StoreIdentityProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityProvider for StoreIdentityProvider {
    async fn sign_in_anonymously(&self) -> Result<String, IdentityError> {
        let uid = utils::generate_uid();
        let fields = store::to_document(&json!({ "uid": uid, "anonymous": true }))?;
        self.store.set_merge(ACCOUNTS, &uid, fields).await?;
        Ok(uid)
    }

    async fn update_user(&self, profile: &Profile) -> Result<(), IdentityError> {
        let mut fields = store::to_document(profile)?;
        fields.insert("anonymous".to_string(), false.into());
        match self.store.update(ACCOUNTS, &profile.uid, fields).await {
            Err(StoreError::NotFound { id, .. }) => Err(IdentityError::UserNotFound(id)),
            other => Ok(other?),
        }
    }

    async fn create_user(&self, profile: &Profile) -> Result<(), IdentityError> {
        let mut fields = store::to_document(profile)?;
        fields.insert("anonymous".to_string(), false.into());
        self.store.set_merge(ACCOUNTS, &profile.uid, fields).await?;
        Ok(())
    }
}

/// Writes the user profile to `users/{uid}` and the identity service at the
/// same time. An identity update for an unknown user falls back to creating
/// it. Both writes run to completion before the first error is returned.
pub async fn provision_account(
    store: &dyn DocumentStore,
    identity: &dyn IdentityProvider,
    uid: &str,
    display_name: &str,
    email: &str,
) -> Result<Profile, IdentityError> {
    let profile = Profile {
        uid: uid.to_string(),
        display_name: display_name.to_string(),
        email: email.to_string(),
        email_verified: true,
    };
    let fields = store::to_document(&profile)?;
    let user_write = store.set_merge(USERS, uid, fields);
    let identity_write = async {
        match identity.update_user(&profile).await {
            Err(IdentityError::UserNotFound(_)) => identity.create_user(&profile).await,
            other => other,
        }
    };

    let (user_result, identity_result) = tokio::join!(user_write, identity_write);
    user_result?;
    identity_result?;
    Ok(profile)
}

/// Uid of the anonymous account this device signed in with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub uid: String,
}

impl DeviceIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }

    pub fn default_path() -> PathBuf {
        config::data_dir().join("device.json")
    }

    pub async fn load() -> Result<Self, IdentityError> {
        Self::load_from(&Self::default_path()).await
    }

    pub async fn load_from(path: &Path) -> Result<Self, IdentityError> {
        let json = async_fs::read_to_string(path)
            .await
            .map_err(IdentityError::IoError)?;
        serde_json::from_str(&json).map_err(IdentityError::SerdeError)
    }

    pub async fn persist(&self) -> Result<(), IdentityError> {
        self.persist_to(&Self::default_path()).await
    }

    pub async fn persist_to(&self, path: &Path) -> Result<(), IdentityError> {
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(IdentityError::IoError)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(IdentityError::SerdeError)?;
        async_fs::write(path, json)
            .await
            .map_err(IdentityError::IoError)
    }
}
