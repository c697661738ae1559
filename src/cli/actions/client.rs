use crate::{
    client::{HttpSessionApi, InvalidationDetector},
    device::{self, DeviceIdentity},
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

/// Arguments shared by the client actions.
#[derive(Debug, Clone)]
pub struct ClientArgs {
    pub api_url: String,
    pub email: String,
    pub identity_file: PathBuf,
    pub platform: Option<String>,
}

impl ClientArgs {
    /// Load this device's identity and build a detector talking to the
    /// registry over HTTP.
    ///
    /// # Errors
    /// Returns an error if the identity file cannot be written or the API URL
    /// is invalid.
    pub fn session(&self) -> Result<(DeviceIdentity, InvalidationDetector<HttpSessionApi>)> {
        let identity = DeviceIdentity::load_or_create(&self.identity_file).with_context(|| {
            format!(
                "Failed to load device identity from {}",
                self.identity_file.display()
            )
        })?;

        let platform = self
            .platform
            .clone()
            .unwrap_or_else(device::local_platform);
        let device_name = device::device_name(&platform);
        debug!(
            device_id = %identity.device_id,
            device_name = %device_name,
            "device identity loaded"
        );

        let api = HttpSessionApi::new(&self.api_url)
            .with_context(|| format!("Invalid API URL: {}", self.api_url))?;

        let detector = InvalidationDetector::new(api, &self.email, &identity.device_id, &device_name)
            .with_user_id(identity.user_id);

        Ok((identity, detector))
    }
}
