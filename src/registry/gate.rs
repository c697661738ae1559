//! Admission control for devices logging into an account.
//!
//! Evaluated in order on every resolve:
//! 1. Known device: refresh its label in place, admit.
//! 2. Free capacity: append the device, admit.
//! 3. Account full: refuse with the current list (`Explicit`) or drop the
//!    oldest device and append (`OldestFirst`).
//!
//! A `Refresh` resolve never admits an unknown device; it reports it as not
//! recognized so a displaced device learns about its eviction.

use chrono::{DateTime, Utc};
use std::{fmt, str::FromStr};

use super::model::{Account, Device, ResolveMode};

/// What to do when a new device arrives at a full account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Refuse and let the user pick the device to remove.
    #[default]
    Explicit,
    /// Silently drop the oldest trusted device.
    OldestFirst,
}

impl EvictionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::OldestFirst => "oldest-first",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "explicit" => Ok(Self::Explicit),
            "oldest-first" | "oldest_first" | "fifo" => Ok(Self::OldestFirst),
            other => Err(format!(
                "invalid eviction policy '{other}', expected 'explicit' or 'oldest-first'"
            )),
        }
    }
}

/// Decision taken for one resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Device was already trusted; only its label may have changed.
    Recognized,
    /// Device took a free slot.
    Appended,
    /// Device took the slot of the evicted oldest device.
    Replaced(Device),
    /// Account is full; nothing changed.
    Refused,
    /// Refresh from a device the account no longer trusts.
    NotRecognized,
}

/// Apply the admission rules to `account` in place.
pub fn admit(
    account: &mut Account,
    device_id: &str,
    device_name: &str,
    mode: ResolveMode,
    policy: EvictionPolicy,
    now: DateTime<Utc>,
) -> Admission {
    if let Some(index) = account.position(device_id) {
        let device = &mut account.devices[index];
        if device.device_name != device_name {
            device.device_name = device_name.to_string();
        }
        return Admission::Recognized;
    }

    if mode == ResolveMode::Refresh {
        return Admission::NotRecognized;
    }

    if !account.is_full() {
        account.devices.push(Device::new(device_id, device_name, now));
        return Admission::Appended;
    }

    match policy {
        EvictionPolicy::Explicit => Admission::Refused,
        EvictionPolicy::OldestFirst => {
            // Capacity may have been lowered below the current size; trim
            // from the front until the new device fits.
            let mut evicted = None;
            while account.is_full() && !account.devices.is_empty() {
                evicted = Some(account.devices.remove(0));
            }
            match evicted {
                Some(evicted) => {
                    account.devices.push(Device::new(device_id, device_name, now));
                    Admission::Replaced(evicted)
                }
                // Zero capacity: there is nothing to evict and nowhere to go.
                None => Admission::Refused,
            }
        }
    }
}

/// Remove `device_id` from the account. Returns whether anything changed.
pub fn remove(account: &mut Account, device_id: &str) -> bool {
    match account.position(device_id) {
        Some(index) => {
            account.devices.remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn full_account() -> (Account, DateTime<Utc>) {
        let start = Utc::now();
        let mut account = Account::new("a@example.com", 3);
        for (offset, id) in ["A", "B", "C"].iter().enumerate() {
            let at = start + Duration::seconds(i64::try_from(offset).unwrap_or(0));
            admit(&mut account, id, id, ResolveMode::Login, EvictionPolicy::Explicit, at);
        }
        (account, start)
    }

    fn ids(account: &Account) -> Vec<&str> {
        account
            .devices
            .iter()
            .map(|device| device.device_id.as_str())
            .collect()
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("explicit".parse(), Ok(EvictionPolicy::Explicit));
        assert_eq!("Oldest-First".parse(), Ok(EvictionPolicy::OldestFirst));
        assert!("random".parse::<EvictionPolicy>().is_err());
        assert_eq!(EvictionPolicy::default(), EvictionPolicy::Explicit);
    }

    #[test]
    fn known_device_keeps_position_and_created_at() {
        let (mut account, start) = full_account();
        let before = account.devices[1].clone();

        let admission = admit(
            &mut account,
            "B",
            "Renamed",
            ResolveMode::Login,
            EvictionPolicy::Explicit,
            start + Duration::hours(1),
        );

        assert_eq!(admission, Admission::Recognized);
        assert_eq!(ids(&account), vec!["A", "B", "C"]);
        assert_eq!(account.devices[1].device_name, "Renamed");
        assert_eq!(account.devices[1].created_at, before.created_at);
    }

    #[test]
    fn free_slot_appends() {
        let mut account = Account::new("a@example.com", 3);
        let now = Utc::now();
        let admission = admit(
            &mut account,
            "A",
            "Mac",
            ResolveMode::Login,
            EvictionPolicy::Explicit,
            now,
        );
        assert_eq!(admission, Admission::Appended);
        assert_eq!(account.devices.len(), 1);
        assert_eq!(account.devices[0].created_at, now);
    }

    #[test]
    fn explicit_policy_refuses_without_mutation() {
        let (mut account, start) = full_account();
        let before = account.clone();

        let admission = admit(
            &mut account,
            "D",
            "New Device",
            ResolveMode::Login,
            EvictionPolicy::Explicit,
            start,
        );

        assert_eq!(admission, Admission::Refused);
        assert_eq!(account, before);
    }

    #[test]
    fn oldest_first_policy_evicts_front() {
        let (mut account, start) = full_account();

        let admission = admit(
            &mut account,
            "D",
            "New Device",
            ResolveMode::Login,
            EvictionPolicy::OldestFirst,
            start + Duration::minutes(5),
        );

        match admission {
            Admission::Replaced(evicted) => assert_eq!(evicted.device_id, "A"),
            other => panic!("unexpected admission: {other:?}"),
        }
        assert_eq!(ids(&account), vec!["B", "C", "D"]);
    }

    #[test]
    fn oldest_first_with_zero_capacity_refuses() {
        let mut account = Account::new("a@example.com", 0);
        let admission = admit(
            &mut account,
            "A",
            "Mac",
            ResolveMode::Login,
            EvictionPolicy::OldestFirst,
            Utc::now(),
        );
        assert_eq!(admission, Admission::Refused);
        assert!(account.devices.is_empty());
    }

    #[test]
    fn refresh_never_admits_unknown_device() {
        let mut account = Account::new("a@example.com", 3);
        let admission = admit(
            &mut account,
            "ghost",
            "Mac",
            ResolveMode::Refresh,
            EvictionPolicy::OldestFirst,
            Utc::now(),
        );
        assert_eq!(admission, Admission::NotRecognized);
        assert!(account.devices.is_empty());
    }

    #[test]
    fn refresh_recognizes_known_device() {
        let (mut account, start) = full_account();
        let admission = admit(
            &mut account,
            "C",
            "C",
            ResolveMode::Refresh,
            EvictionPolicy::Explicit,
            start,
        );
        assert_eq!(admission, Admission::Recognized);
    }

    #[test]
    fn capacity_never_exceeded() {
        let mut account = Account::new("a@example.com", 3);
        let now = Utc::now();
        for round in 0..20 {
            for policy in [EvictionPolicy::Explicit, EvictionPolicy::OldestFirst] {
                let id = format!("device-{round}");
                admit(&mut account, &id, "x", ResolveMode::Login, policy, now);
                assert!(account.devices.len() <= account.max_devices);
            }
        }
    }

    #[test]
    fn remove_is_idempotent() {
        let (mut account, _) = full_account();
        assert!(remove(&mut account, "B"));
        let once = account.clone();
        assert!(!remove(&mut account, "B"));
        assert_eq!(account, once);
        assert_eq!(ids(&account), vec!["A", "C"]);
    }
}
