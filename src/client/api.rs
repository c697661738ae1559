//! Session operations as seen from a client device.

use std::future::Future;
use uuid::Uuid;

use super::error::ClientError;
use crate::registry::{AccountStore, AccountView, Outcome, Registry, ResolveMode};

pub trait SessionApi: Send + Sync {
    fn resolve(
        &self,
        email: &str,
        device_id: &str,
        device_name: &str,
        mode: ResolveMode,
    ) -> impl Future<Output = Result<Outcome, ClientError>> + Send;

    fn remove_device(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        phone_number: &str,
    ) -> impl Future<Output = Result<AccountView, ClientError>> + Send;
}

/// In-process binding, used when the client and the registry share a process.
impl<S: AccountStore> SessionApi for Registry<S> {
    async fn resolve(
        &self,
        email: &str,
        device_id: &str,
        device_name: &str,
        mode: ResolveMode,
    ) -> Result<Outcome, ClientError> {
        Ok(Registry::resolve(self, email, device_id, device_name, mode).await?)
    }

    async fn remove_device(&self, user_id: Uuid, device_id: &str) -> Result<(), ClientError> {
        Ok(Registry::remove_device(self, user_id, device_id).await?)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        phone_number: &str,
    ) -> Result<AccountView, ClientError> {
        Ok(Registry::update_profile(self, user_id, name, phone_number).await?)
    }
}

impl<T: SessionApi> SessionApi for std::sync::Arc<T> {
    fn resolve(
        &self,
        email: &str,
        device_id: &str,
        device_name: &str,
        mode: ResolveMode,
    ) -> impl Future<Output = Result<Outcome, ClientError>> + Send {
        T::resolve(self, email, device_id, device_name, mode)
    }

    fn remove_device(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        T::remove_device(self, user_id, device_id)
    }

    fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        phone_number: &str,
    ) -> impl Future<Output = Result<AccountView, ClientError>> + Send {
        T::update_profile(self, user_id, name, phone_number)
    }
}
