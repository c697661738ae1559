//! In-process account store, used when no database is configured and in tests.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::{error::RegistryError, model::Account, store::AccountStore};

#[derive(Debug, Default)]
struct Index {
    by_email: HashMap<String, Uuid>,
    accounts: HashMap<Uuid, Arc<Mutex<Account>>>,
}

/// Accounts live behind their own mutex; the index lock is only held long
/// enough to find or insert the entry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    index: RwLock<Index>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, user_id: Uuid) -> Option<Arc<Mutex<Account>>> {
        self.index.read().await.accounts.get(&user_id).cloned()
    }
}

impl AccountStore for MemoryStore {
    async fn get_or_create(&self, email: &str, max_devices: usize) -> Result<Account, RegistryError> {
        let existing = {
            let index = self.index.read().await;
            index
                .by_email
                .get(email)
                .and_then(|user_id| index.accounts.get(user_id))
                .cloned()
        };

        let entry = match existing {
            Some(entry) => entry,
            None => {
                let mut index = self.index.write().await;
                // Another caller may have created it between the two locks.
                let raced = index
                    .by_email
                    .get(email)
                    .and_then(|user_id| index.accounts.get(user_id))
                    .cloned();
                if let Some(entry) = raced {
                    entry
                } else {
                    let account = Account::new(email, max_devices);
                    debug!(user_id = %account.user_id, "account created");
                    let user_id = account.user_id;
                    let entry = Arc::new(Mutex::new(account));
                    index.by_email.insert(email.to_string(), user_id);
                    index.accounts.insert(user_id, entry.clone());
                    entry
                }
            }
        };

        let account = entry.lock().await.clone();
        Ok(account)
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<Account>, RegistryError> {
        match self.entry(user_id).await {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn save(&self, account: &Account) -> Result<(), RegistryError> {
        let entry = self
            .entry(account.user_id)
            .await
            .ok_or(RegistryError::NotFound)?;
        let mut stored = entry.lock().await;
        stored.name.clone_from(&account.name);
        stored.phone_number.clone_from(&account.phone_number);
        stored.devices.clone_from(&account.devices);
        Ok(())
    }

    async fn modify<T, F>(&self, user_id: Uuid, f: F) -> Result<Option<T>, RegistryError>
    where
        F: FnOnce(&mut Account) -> T + Send,
        T: Send,
    {
        let Some(entry) = self.entry(user_id).await else {
            return Ok(None);
        };
        let mut account = entry.lock().await;
        Ok(Some(f(&mut *account)))
    }

    async fn ping(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::model::Device;
    use chrono::Utc;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.get_or_create("a@example.com", 3).await.unwrap();
        let second = store.get_or_create("a@example.com", 3).await.unwrap();
        assert_eq!(first.user_id, second.user_id);
        assert!(first.devices.is_empty());
        assert!(first.name.is_none());
    }

    #[tokio::test]
    async fn concurrent_first_logins_create_one_account() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.get_or_create("race@example.com", 3).await.unwrap().user_id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.index.read().await.accounts.len(), 1);
    }

    #[tokio::test]
    async fn save_replaces_mutable_fields() {
        let store = MemoryStore::new();
        let mut account = store.get_or_create("a@example.com", 3).await.unwrap();
        account.name = Some("Ada".to_string());
        account.devices.push(Device::new("d1", "Mac", Utc::now()));
        store.save(&account).await.unwrap();

        let stored = store.find(account.user_id).await.unwrap().unwrap();
        assert_eq!(stored, account);
    }

    #[tokio::test]
    async fn save_unknown_account_is_not_found() {
        let store = MemoryStore::new();
        let account = Account::new("ghost@example.com", 3);
        assert!(matches!(
            store.save(&account).await,
            Err(RegistryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn modify_unknown_account_returns_none() {
        let store = MemoryStore::new();
        let result = store.modify(Uuid::new_v4(), |_| ()).await.unwrap();
        assert!(result.is_none());
    }
}
