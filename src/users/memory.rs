use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{Account, AccountPatch, NewAccount};
use super::store::{StoreError, UserStore};

/// Process-local store used when no database is configured.
/// Uniqueness checks and inserts happen under one write lock.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        let mut all: Vec<Account> = self.accounts.read().await.values().cloned().collect();
        all.sort_by_key(|a| a.created_at);
        Ok(all)
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.username == new.username) {
            return Err(StoreError::DuplicateKey("username"));
        }
        if accounts.values().any(|a| a.email == new.email) {
            return Err(StoreError::DuplicateKey("email"));
        }

        let account = Account {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            firstname: new.firstname,
            lastname: new.lastname,
            current_organisation: new.current_organisation,
            bio: new.bio,
            role: new.role,
            email_verified: false,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(&self, id: Uuid, patch: AccountPatch) -> Result<Option<Account>, StoreError> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(account);
        Ok(Some(account.clone()))
    }

    async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.accounts.write().await.remove(&id).is_some())
    }
}
