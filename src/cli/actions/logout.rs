use crate::cli::actions::client::ClientArgs;
use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub client: ClientArgs,
}

/// Remove this device from its account.
/// # Errors
/// Returns an error if the registry call fails.
pub async fn execute(args: Args) -> Result<()> {
    let (identity, mut detector) = args.client.session()?;

    if identity.user_id.is_none() {
        println!("This device has not logged in yet");
        return Ok(());
    }

    detector.logout().await.context("Logout failed")?;
    info!(device_id = %identity.device_id, "device removed");
    println!("Logged out device {}", identity.device_id);

    Ok(())
}
