//! Profile completeness: name and phone number must be present before the
//! account is fully usable. Device admission never depends on it.

use regex::Regex;

use super::{
    error::RegistryError,
    gate::Admission,
    model::{Account, Outcome},
};

/// Lightweight email sanity check applied before an account is looked up.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Digits, spaces, `-`, parentheses and an optional leading `+`.
pub fn valid_phone_number(phone_number: &str) -> bool {
    Regex::new(r"^\+?[\d\s\-()]+$").is_ok_and(|re| re.is_match(phone_number))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate and trim a profile submission.
///
/// # Errors
/// Returns `RegistryError::Validation` naming the first offending field.
pub fn validate(name: &str, phone_number: &str) -> Result<(String, String), RegistryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistryError::Validation("Name is required"));
    }

    let phone_number = phone_number.trim();
    if phone_number.is_empty() {
        return Err(RegistryError::Validation("Phone number is required"));
    }
    if !valid_phone_number(phone_number) {
        return Err(RegistryError::Validation("Please enter a valid phone number"));
    }

    Ok((name.to_string(), phone_number.to_string()))
}

/// Turn an admission decision into the outcome reported to the client,
/// applying the completeness check to admitted devices.
pub fn outcome(account: &Account, admission: Admission) -> Outcome {
    let evicted = match admission {
        Admission::Refused => {
            return Outcome::LimitReached {
                user_id: account.user_id,
                devices: account.view().devices,
            }
        }
        Admission::NotRecognized => return Outcome::NotRecognized,
        Admission::Replaced(evicted) => Some(evicted.view()),
        Admission::Recognized | Admission::Appended => None,
    };

    if account.is_profile_complete() {
        Outcome::Admitted {
            account: account.view(),
            evicted,
        }
    } else {
        Outcome::ProfileIncomplete {
            account: account.view(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::model::Device;
    use chrono::Utc;

    #[test]
    fn phone_pattern_is_permissive() {
        assert!(valid_phone_number("555-1234"));
        assert!(valid_phone_number("+1 (555) 123-4567"));
        assert!(!valid_phone_number("555-CALL-NOW"));
        assert!(!valid_phone_number("1+2"));
        assert!(!valid_phone_number(""));
    }

    #[test]
    fn valid_email_rejects_missing_at() {
        assert!(valid_email("user@example.com"));
        assert!(!valid_email("user.example.com"));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn validate_rejects_empty_name() {
        assert!(matches!(
            validate("", "555-1234"),
            Err(RegistryError::Validation("Name is required"))
        ));
        assert!(matches!(
            validate("   ", "555-1234"),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn validate_trims_fields() {
        let result = validate("  Ada  ", " 555-1234 ");
        assert!(matches!(result, Ok((ref name, ref phone)) if name == "Ada" && phone == "555-1234"));
    }

    #[test]
    fn incomplete_profile_still_reports_registered_device() {
        let mut account = Account::new("a@example.com", 3);
        account.devices.push(Device::new("A", "Mac", Utc::now()));

        match outcome(&account, Admission::Appended) {
            Outcome::ProfileIncomplete { account } => assert_eq!(account.devices.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn complete_profile_is_admitted() {
        let mut account = Account::new("a@example.com", 3);
        account.name = Some("Ada".to_string());
        account.phone_number = Some("555-1234".to_string());

        assert!(matches!(
            outcome(&account, Admission::Recognized),
            Outcome::Admitted { evicted: None, .. }
        ));
    }

    #[test]
    fn refused_lists_active_devices() {
        let mut account = Account::new("a@example.com", 1);
        account.devices.push(Device::new("A", "Mac", Utc::now()));

        match outcome(&account, Admission::Refused) {
            Outcome::LimitReached { user_id, devices } => {
                assert_eq!(user_id, account.user_id);
                assert_eq!(devices.len(), 1);
                assert!(devices.iter().all(|device| device.is_active));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
