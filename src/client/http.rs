use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::{api::SessionApi, error::ClientError};
use crate::{
    registry::{AccountView, Outcome, ResolveMode},
    APP_USER_AGENT,
};

const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// `SessionApi` over the registry's HTTP interface.
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: Client,
    base_url: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveDeviceBody<'a> {
    user_id: Uuid,
    device_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileBody<'a> {
    user_id: Uuid,
    name: &'a str,
    phone_number: &'a str,
}

impl HttpSessionApi {
    /// # Errors
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        // Keep the base path when joining relative endpoints.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "request rejected: {message}");
    Err(ClientError::Http {
        status: status.as_u16(),
        message,
    })
}

impl SessionApi for HttpSessionApi {
    #[instrument(skip(self, mode), fields(mode = mode.as_str()))]
    async fn resolve(
        &self,
        email: &str,
        device_id: &str,
        device_name: &str,
        mode: ResolveMode,
    ) -> Result<Outcome, ClientError> {
        let response = self
            .client
            .get(self.endpoint("v1/user")?)
            .query(&[
                ("email", email),
                ("deviceId", device_id),
                ("deviceName", device_name),
                ("mode", mode.as_str()),
            ])
            .send()
            .await?;

        Ok(check(response).await?.json::<Outcome>().await?)
    }

    #[instrument(skip(self))]
    async fn remove_device(&self, user_id: Uuid, device_id: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.endpoint("v1/user/logout")?)
            .json(&RemoveDeviceBody { user_id, device_id })
            .send()
            .await?;

        // A missing account is already the desired end state.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, name, phone_number))]
    async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        phone_number: &str,
    ) -> Result<AccountView, ClientError> {
        let response = self
            .client
            .post(self.endpoint("v1/user/update")?)
            .json(&UpdateProfileBody {
                user_id,
                name,
                phone_number,
            })
            .send()
            .await?;

        Ok(check(response).await?.json::<AccountView>().await?)
    }
}
