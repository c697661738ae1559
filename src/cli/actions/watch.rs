use crate::{
    cli::actions::client::ClientArgs,
    client::{HttpSessionApi, InvalidationDetector, SessionState},
    registry::DeviceView,
};
use anyhow::{anyhow, bail, Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub client: ClientArgs,
    pub poll_interval: Duration,
    pub evict: Option<String>,
    pub profile: Option<(String, String)>,
}

/// Log in, then watch the session until this device is evicted or the user
/// presses Ctrl-C, which logs the device out.
/// # Errors
/// Returns an error if the login is refused or a registry call fails.
pub async fn execute(args: Args) -> Result<()> {
    let (mut identity, detector) = args.client.session()?;

    let (notifier, mut changes) = mpsc::unbounded_channel();
    let mut detector = detector
        .with_poll_interval(args.poll_interval)
        .with_notifier(notifier);

    tokio::spawn(async move {
        while let Some(state) = changes.recv().await {
            info!(state = state.name(), "session state changed");
        }
    });

    detector.login().await.context("Login failed")?;
    admit(&mut detector, args.evict.as_deref()).await?;

    let SessionState::Active {
        account,
        profile_complete,
    } = detector.state().clone()
    else {
        bail!("unexpected session state: {}", detector.state().name());
    };

    identity
        .remember_user(account.user_id, &args.client.identity_file)
        .context("Failed to store the account id")?;

    if !profile_complete {
        match &args.profile {
            Some((name, phone_number)) => {
                detector
                    .complete_profile(name, phone_number)
                    .await
                    .context("Failed to update the profile")?;
                println!("Profile updated");
            }
            None => println!(
                "Profile incomplete: run again with --name and --phone-number to finish it"
            ),
        }
    }

    println!(
        "Logged in as {} on device {} ({}/{} devices)",
        account.email,
        identity.device_id,
        account.devices.len(),
        account.max_devices
    );

    let state = detector
        .watch(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {err}");
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Session check failed")?
        .clone();

    match state {
        SessionState::Evicted => {
            println!("This device was signed out from another device");
            detector.acknowledge_eviction()?;
        }
        SessionState::LoggedOut => {}
        _ => {
            detector.logout().await.context("Logout failed")?;
            println!("Logged out");
        }
    }

    Ok(())
}

/// Resolve a `LimitPending` login, evicting `evict` when given.
async fn admit(
    detector: &mut InvalidationDetector<HttpSessionApi>,
    evict: Option<&str>,
) -> Result<()> {
    let SessionState::LimitPending { devices, .. } = detector.state() else {
        return Ok(());
    };

    let Some(evict) = evict else {
        print_devices(devices);
        bail!("device limit reached, run again with --evict <DEVICE_ID>");
    };

    if !devices.iter().any(|device| device.device_id == evict) {
        print_devices(devices);
        return Err(anyhow!("device {evict} is not registered on this account"));
    }

    detector
        .evict_and_retry(evict)
        .await
        .context("Failed to remove the device")?;

    if let SessionState::LimitPending { devices, .. } = detector.state() {
        print_devices(devices);
        bail!("another device took the freed slot");
    }

    Ok(())
}

fn print_devices(devices: &[DeviceView]) {
    println!("Device limit reached. Signed-in devices:");
    for device in devices {
        println!(
            "  {}  {}  since {}",
            device.device_id,
            device.device_name,
            device.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}
