//! Bounded multi-device session registry.
//!
//! The registry is the single source of truth for which devices an account
//! currently trusts. `resolve` runs the admission gate against the account's
//! device list, `remove_device` evicts a device on request, and
//! `update_profile` fills in the fields the completeness gate asks for.
//!
//! All device-list changes run inside [`AccountStore::modify`], so two logins
//! racing for the last free slot on one account cannot both win.

mod error;
pub mod gate;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod profile;
pub mod store;

pub use error::RegistryError;
pub use gate::EvictionPolicy;
pub use memory::MemoryStore;
pub use model::{
    Account, AccountView, Device, DeviceView, Outcome, ResolveMode, DEFAULT_MAX_DEVICES,
};
pub use postgres::PgStore;
pub use store::{AccountStore, Backend};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug)]
pub struct RegistryConfig {
    max_devices: usize,
    policy: EvictionPolicy,
}

impl RegistryConfig {
    /// Three devices per account, explicit eviction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_devices: DEFAULT_MAX_DEVICES,
            policy: EvictionPolicy::Explicit,
        }
    }

    /// Capacity given to newly created accounts; existing accounts keep theirs.
    #[must_use]
    pub fn with_max_devices(mut self, max_devices: usize) -> Self {
        self.max_devices = max_devices;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct Registry<S = Backend> {
    store: S,
    config: RegistryConfig,
}

impl<S: AccountStore> Registry<S> {
    #[must_use]
    pub fn new(store: S, config: RegistryConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Recognize, admit, or refuse `device_id` for the account behind `email`,
    /// creating the account on first sight.
    ///
    /// # Errors
    /// `Validation` for malformed input, `StorageUnavailable` when the store
    /// cannot be reached.
    #[instrument(skip(self, mode), fields(mode = mode.as_str()))]
    pub async fn resolve(
        &self,
        email: &str,
        device_id: &str,
        device_name: &str,
        mode: ResolveMode,
    ) -> Result<Outcome, RegistryError> {
        let email = profile::normalize_email(email);
        if !profile::valid_email(&email) {
            return Err(RegistryError::Validation("Invalid email"));
        }
        let device_id = device_id.trim();
        let device_name = device_name.trim();
        if device_id.is_empty() || device_name.is_empty() {
            return Err(RegistryError::Validation("Device ID and name are required"));
        }

        let account = self
            .store
            .get_or_create(&email, self.config.max_devices)
            .await?;

        let policy = self.config.policy;
        let now = Utc::now();
        let outcome = self
            .store
            .modify(account.user_id, |account| {
                let admission = gate::admit(account, device_id, device_name, mode, policy, now);
                profile::outcome(account, admission)
            })
            .await?
            // The account was created above and is never deleted.
            .ok_or(RegistryError::NotFound)?;

        match &outcome {
            Outcome::LimitReached { devices, .. } => {
                info!(user_id = %account.user_id, active = devices.len(), "device limit reached");
            }
            Outcome::NotRecognized => {
                info!(user_id = %account.user_id, "device no longer trusted");
            }
            Outcome::Admitted {
                evicted: Some(evicted),
                ..
            } => {
                warn!(
                    user_id = %account.user_id,
                    evicted = %evicted.device_id,
                    "oldest device evicted to admit new device"
                );
            }
            _ => debug!(user_id = %account.user_id, outcome = outcome.as_str(), "device resolved"),
        }

        Ok(outcome)
    }

    /// Remove a device from the account. Unknown accounts and devices are a
    /// no-op, so retries after a lost response are safe.
    ///
    /// # Errors
    /// `StorageUnavailable` when the store cannot be reached.
    #[instrument(skip(self))]
    pub async fn remove_device(&self, user_id: Uuid, device_id: &str) -> Result<(), RegistryError> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(RegistryError::Validation("Device ID is required"));
        }

        match self
            .store
            .modify(user_id, |account| gate::remove(account, device_id))
            .await?
        {
            Some(true) => info!("device removed"),
            Some(false) => debug!("device already absent"),
            None => debug!("account not found"),
        }

        Ok(())
    }

    /// Set name and phone number after validating both.
    ///
    /// # Errors
    /// `Validation` for bad input (nothing is written), `NotFound` for an
    /// unknown account, `StorageUnavailable` when the store cannot be reached.
    #[instrument(skip(self, name, phone_number))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        phone_number: &str,
    ) -> Result<AccountView, RegistryError> {
        let (name, phone_number) = profile::validate(name, phone_number)?;

        self.store
            .modify(user_id, move |account| {
                account.name = Some(name);
                account.phone_number = Some(phone_number);
                account.view()
            })
            .await?
            .ok_or(RegistryError::NotFound)
    }

    /// Current account state, if it exists.
    ///
    /// # Errors
    /// `StorageUnavailable` when the store cannot be reached.
    pub async fn account(&self, user_id: Uuid) -> Result<Option<AccountView>, RegistryError> {
        Ok(self.store.find(user_id).await?.map(|account| account.view()))
    }
}
