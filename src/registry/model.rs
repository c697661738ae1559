//! Account and device records plus the wire views returned to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub const DEFAULT_MAX_DEVICES: usize = 3;

/// One trusted device, as persisted in the account record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub device_name: String,
    pub created_at: DateTime<Utc>,
}

impl Device {
    #[must_use]
    pub fn new(device_id: &str, device_name: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.to_string(),
            device_name: device_name.to_string(),
            created_at,
        }
    }

    #[must_use]
    pub fn view(&self) -> DeviceView {
        DeviceView {
            device_id: self.device_id.clone(),
            device_name: self.device_name.clone(),
            is_active: true,
            created_at: self.created_at,
        }
    }
}

/// Durable record for one identity.
///
/// `devices` is kept in trust order, oldest first. Every entry in the list is
/// active; removed devices are dropped, never flagged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub devices: Vec<Device>,
    pub max_devices: usize,
}

impl Account {
    #[must_use]
    pub fn new(email: &str, max_devices: usize) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            phone_number: None,
            devices: Vec::new(),
            max_devices,
        }
    }

    #[must_use]
    pub fn position(&self, device_id: &str) -> Option<usize> {
        self.devices
            .iter()
            .position(|device| device.device_id == device_id)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.devices.len() >= self.max_devices
    }

    #[must_use]
    pub fn is_profile_complete(&self) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.name) && present(&self.phone_number)
    }

    #[must_use]
    pub fn view(&self) -> AccountView {
        AccountView {
            user_id: self.user_id,
            email: self.email.clone(),
            name: self.name.clone(),
            phone_number: self.phone_number.clone(),
            devices: self.devices.iter().map(Device::view).collect(),
            max_devices: self.max_devices,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub device_id: String,
    pub device_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub devices: Vec<DeviceView>,
    pub max_devices: usize,
}

/// How a `resolve` call should treat a device the account does not know.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Interactive login: unknown devices are admitted when capacity allows.
    #[default]
    Login,
    /// Periodic re-check from an already admitted device: unknown devices are
    /// reported as not recognized and never admitted.
    Refresh,
}

impl ResolveMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Refresh => "refresh",
        }
    }
}

/// Query string accepted by `GET /v1/user`.
#[derive(Clone, Debug, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ResolveQuery {
    pub email: String,
    pub device_id: String,
    pub device_name: String,
    #[serde(default)]
    #[param(inline)]
    pub mode: ResolveMode,
}

/// Result of a `resolve` call. None of these are failures; the client
/// branches on the variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Outcome {
    Admitted {
        account: AccountView,
        /// Device dropped to make room, only under the oldest-first policy.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        evicted: Option<DeviceView>,
    },
    /// Account is full; the caller picks a device to remove from `devices`.
    LimitReached {
        user_id: Uuid,
        devices: Vec<DeviceView>,
    },
    ProfileIncomplete {
        account: AccountView,
    },
    NotRecognized,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admitted { .. } => "admitted",
            Self::LimitReached { .. } => "limit_reached",
            Self::ProfileIncomplete { .. } => "profile_incomplete",
            Self::NotRecognized => "not_recognized",
        }
    }

    /// Account id, known for every outcome except `NotRecognized`.
    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::Admitted { account, .. } | Self::ProfileIncomplete { account } => {
                Some(account.user_id)
            }
            Self::LimitReached { user_id, .. } => Some(*user_id),
            Self::NotRecognized => None,
        }
    }

    /// Account snapshot carried by admitting outcomes.
    #[must_use]
    pub fn account(&self) -> Option<&AccountView> {
        match self {
            Self::Admitted { account, .. } | Self::ProfileIncomplete { account } => Some(account),
            Self::LimitReached { .. } | Self::NotRecognized => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveDeviceRequest {
    pub user_id: Uuid,
    pub device_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub user_id: Uuid,
    pub name: String,
    pub phone_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_complete_requires_both_fields() {
        let mut account = Account::new("a@example.com", DEFAULT_MAX_DEVICES);
        assert!(!account.is_profile_complete());
        account.name = Some("Ada".to_string());
        assert!(!account.is_profile_complete());
        account.phone_number = Some(String::new());
        assert!(!account.is_profile_complete());
        account.phone_number = Some("555-1234".to_string());
        assert!(account.is_profile_complete());
    }

    #[test]
    fn outcome_uses_tagged_camel_case() -> serde_json::Result<()> {
        let user_id = Uuid::nil();
        let outcome = Outcome::LimitReached {
            user_id,
            devices: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&outcome)?,
            json!({
                "outcome": "limitReached",
                "userId": "00000000-0000-0000-0000-000000000000",
                "devices": []
            })
        );
        assert_eq!(
            serde_json::to_value(Outcome::NotRecognized)?,
            json!({"outcome": "notRecognized"})
        );
        Ok(())
    }

    #[test]
    fn device_view_is_active() {
        let device = Device::new("a", "Mac", Utc::now());
        let view = device.view();
        assert!(view.is_active);
        assert_eq!(view.device_id, "a");
    }
}
