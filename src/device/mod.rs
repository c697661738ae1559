//! Client-side device identity.
//!
//! A device id is generated once and kept in a small JSON file so the same
//! machine is recognized across runs. Deleting the file issues a new identity.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_IDENTITY_FILE: &str = ".devicecap-identity.json";

const MOBILE_PATTERN: &str = "Mobile|Android|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to write identity file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode identity: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    pub device_id: String,
    /// Account the device was last admitted to; lets `logout` run without
    /// resolving again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

impl DeviceIdentity {
    #[must_use]
    pub fn generate() -> Self {
        Self {
            device_id: Uuid::new_v4().to_string(),
            user_id: None,
        }
    }

    /// Load the identity stored at `path`, creating it when missing.
    ///
    /// A file that cannot be read or parsed is replaced by a fresh identity.
    ///
    /// # Errors
    /// Returns an error only if a new identity cannot be written.
    pub fn load_or_create(path: &Path) -> Result<Self, IdentityError> {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(identity) if !identity.device_id.trim().is_empty() => {
                    debug!(device_id = %identity.device_id, "loaded device identity");
                    return Ok(identity);
                }
                Ok(_) => warn!(path = %path.display(), "identity file has an empty device id, regenerating"),
                Err(err) => warn!(path = %path.display(), "identity file is corrupt, regenerating: {err}"),
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no identity file, generating");
            }
            Err(err) => warn!(path = %path.display(), "identity file unreadable, regenerating: {err}"),
        }

        let identity = Self::generate();
        identity.store(path)?;
        Ok(identity)
    }

    /// Persist the identity, replacing the file atomically.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn store(&self, path: &Path) -> Result<(), IdentityError> {
        let contents = serde_json::to_string_pretty(self)?;
        let write_err = |source| IdentityError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)
    }

    /// Remember the account this device was admitted to.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn remember_user(&mut self, user_id: Uuid, path: &Path) -> Result<(), IdentityError> {
        if self.user_id == Some(user_id) {
            return Ok(());
        }
        self.user_id = Some(user_id);
        self.store(path)
    }
}

/// Human-readable label derived from a platform or user-agent string.
#[must_use]
pub fn device_name(platform: &str) -> String {
    let contains = |needle: &str| platform.to_lowercase().contains(&needle.to_lowercase());

    let mobile = RegexBuilder::new(MOBILE_PATTERN)
        .case_insensitive(true)
        .build()
        .is_ok_and(|re| re.is_match(platform));

    let name = if mobile {
        if contains("iphone") {
            "iPhone"
        } else if contains("ipad") {
            "iPad"
        } else if contains("android") {
            "Android Device"
        } else {
            "Mobile Device"
        }
    } else if contains("mac") {
        "Mac"
    } else if contains("windows") {
        "Windows PC"
    } else if contains("linux") {
        "Linux PC"
    } else {
        "Desktop Browser"
    };

    name.to_string()
}

/// Platform description of the running host, used when none is supplied.
#[must_use]
pub fn local_platform() -> String {
    match std::env::consts::OS {
        "macos" => "Macintosh".to_string(),
        "windows" => "Windows".to_string(),
        "linux" => "Linux".to_string(),
        "ios" => "iPhone".to_string(),
        "android" => "Android".to_string(),
        other => other.to_string(),
    }
}
