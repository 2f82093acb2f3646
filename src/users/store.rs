use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::model::{Account, AccountPatch, NewAccount};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field (`username` or `email`) is already taken.
    #[error("duplicate {0}")]
    DuplicateKey(&'static str),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Account persistence. Implementations enforce username/email uniqueness
/// atomically with the write.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
    async fn find_all(&self) -> Result<Vec<Account>, StoreError>;
    async fn create(&self, new: NewAccount) -> Result<Account, StoreError>;
    async fn update(&self, id: Uuid, patch: AccountPatch) -> Result<Option<Account>, StoreError>;
    /// Returns `false` when no account had this id.
    async fn remove(&self, id: Uuid) -> Result<bool, StoreError>;
}
