//! Storage seam for account records.
//!
//! Every device-list mutation goes through [`AccountStore::modify`], which runs
//! the caller's closure under an exclusive per-account lock and writes the
//! result back atomically. Different accounts never contend.

use std::future::Future;
use uuid::Uuid;

use super::{
    error::RegistryError, memory::MemoryStore, model::Account, postgres::PgStore,
};

pub trait AccountStore: Send + Sync {
    /// Return the account for `email`, creating it when absent. Concurrent
    /// callers for the same email observe the same `user_id`.
    fn get_or_create(
        &self,
        email: &str,
        max_devices: usize,
    ) -> impl Future<Output = Result<Account, RegistryError>> + Send;

    fn find(&self, user_id: Uuid) -> impl Future<Output = Result<Option<Account>, RegistryError>> + Send;

    /// Replace `name`, `phone_number` and `devices` of an existing account.
    fn save(&self, account: &Account) -> impl Future<Output = Result<(), RegistryError>> + Send;

    /// Read-modify-write one account. Returns `Ok(None)` when the account
    /// does not exist. The record is only written when `f` changed it.
    fn modify<T, F>(
        &self,
        user_id: Uuid,
        f: F,
    ) -> impl Future<Output = Result<Option<T>, RegistryError>> + Send
    where
        F: FnOnce(&mut Account) -> T + Send,
        T: Send;

    fn ping(&self) -> impl Future<Output = Result<(), RegistryError>> + Send;
}

/// Store selected at startup: Postgres when a DSN is configured, otherwise
/// process memory.
#[derive(Debug)]
pub enum Backend {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl Backend {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgresql",
        }
    }
}

impl AccountStore for Backend {
    async fn get_or_create(&self, email: &str, max_devices: usize) -> Result<Account, RegistryError> {
        match self {
            Self::Memory(store) => store.get_or_create(email, max_devices).await,
            Self::Postgres(store) => store.get_or_create(email, max_devices).await,
        }
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<Account>, RegistryError> {
        match self {
            Self::Memory(store) => store.find(user_id).await,
            Self::Postgres(store) => store.find(user_id).await,
        }
    }

    async fn save(&self, account: &Account) -> Result<(), RegistryError> {
        match self {
            Self::Memory(store) => store.save(account).await,
            Self::Postgres(store) => store.save(account).await,
        }
    }

    async fn modify<T, F>(&self, user_id: Uuid, f: F) -> Result<Option<T>, RegistryError>
    where
        F: FnOnce(&mut Account) -> T + Send,
        T: Send,
    {
        match self {
            Self::Memory(store) => store.modify(user_id, f).await,
            Self::Postgres(store) => store.modify(user_id, f).await,
        }
    }

    async fn ping(&self) -> Result<(), RegistryError> {
        match self {
            Self::Memory(store) => store.ping().await,
            Self::Postgres(store) => store.ping().await,
        }
    }
}
