use crate::{
    cli::{
        actions::{client::ClientArgs, logout, server, watch, Action},
        commands,
    },
    registry::EvictionPolicy,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::server::SUBCOMMAND, sub_m)) => server_args(sub_m).map(Action::Server),
        Some((commands::client::WATCH, sub_m)) => watch_args(sub_m).map(Action::Watch),
        Some((commands::client::LOGOUT, sub_m)) => Ok(Action::Logout(logout::Args {
            client: client_args(sub_m)?,
        })),
        Some((other, _)) => bail!("unknown subcommand: {other}"),
        None => bail!("missing subcommand"),
    }
}

fn server_args(matches: &ArgMatches) -> Result<server::Args> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .filter(|dsn| !dsn.trim().is_empty())
        .map(|dsn| SecretString::from(dsn.clone()));
    let max_devices = matches
        .get_one::<u32>("max-devices")
        .copied()
        .context("missing required argument: --max-devices")?;
    let policy = matches
        .get_one::<String>("eviction-policy")
        .map_or(Ok(EvictionPolicy::default()), |policy| {
            policy.parse::<EvictionPolicy>()
        })
        .map_err(|err| anyhow!(err))?;
    let frontend_base_url = matches.get_one::<String>("frontend-base-url").cloned();

    Ok(server::Args {
        port,
        dsn,
        max_devices: usize::try_from(max_devices).context("invalid --max-devices")?,
        policy,
        frontend_base_url,
    })
}

fn watch_args(matches: &ArgMatches) -> Result<watch::Args> {
    let poll_seconds = matches.get_one::<u64>("poll-seconds").copied().unwrap_or(60);
    let profile = match (
        matches.get_one::<String>("name"),
        matches.get_one::<String>("phone-number"),
    ) {
        (Some(name), Some(phone_number)) => Some((name.clone(), phone_number.clone())),
        _ => None,
    };

    Ok(watch::Args {
        client: client_args(matches)?,
        poll_interval: Duration::from_secs(poll_seconds),
        evict: matches.get_one::<String>("evict").cloned(),
        profile,
    })
}

fn client_args(matches: &ArgMatches) -> Result<ClientArgs> {
    Ok(ClientArgs {
        api_url: matches
            .get_one::<String>("api-url")
            .cloned()
            .context("missing required argument: --api-url")?,
        email: matches
            .get_one::<String>("email")
            .cloned()
            .context("missing required argument: --email")?,
        identity_file: matches
            .get_one::<String>("identity-file")
            .map(PathBuf::from)
            .context("missing required argument: --identity-file")?,
        platform: matches.get_one::<String>("platform").cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn dispatch(args: &[&str]) -> Result<Action> {
        let matches = commands::new().try_get_matches_from(args)?;
        handler(&matches)
    }

    #[test]
    fn server_action() -> Result<()> {
        temp_env::with_vars_unset(
            ["DEVICECAP_DSN", "DEVICECAP_FRONTEND_BASE_URL", "DEVICECAP_MAX_DEVICES"],
            || -> Result<()> {
                let action = dispatch(&[
                    "devicecap",
                    "server",
                    "--eviction-policy",
                    "oldest-first",
                ])?;
                let Action::Server(args) = action else {
                    bail!("expected a server action");
                };
                assert!(args.dsn.is_none());
                assert_eq!(args.max_devices, 3);
                assert_eq!(args.policy, EvictionPolicy::OldestFirst);
                Ok(())
            },
        )
    }

    #[test]
    fn watch_action() -> Result<()> {
        temp_env::with_vars_unset(
            ["DEVICECAP_POLL_SECONDS", "DEVICECAP_IDENTITY_FILE", "DEVICECAP_PLATFORM"],
            || -> Result<()> {
                let action = dispatch(&[
                    "devicecap",
                    "watch",
                    "--email",
                    "ada@example.com",
                    "--poll-seconds",
                    "5",
                    "--platform",
                    "iPhone",
                    "--name",
                    "Ada",
                    "--phone-number",
                    "555-1234",
                ])?;
                let Action::Watch(args) = action else {
                    bail!("expected a watch action");
                };
                assert_eq!(args.poll_interval, Duration::from_secs(5));
                assert_eq!(args.client.email, "ada@example.com");
                assert_eq!(args.client.platform.as_deref(), Some("iPhone"));
                assert_eq!(
                    args.client.identity_file,
                    PathBuf::from(crate::device::DEFAULT_IDENTITY_FILE)
                );
                assert_eq!(
                    args.profile,
                    Some(("Ada".to_string(), "555-1234".to_string()))
                );
                assert!(args.evict.is_none());
                Ok(())
            },
        )
    }

    #[test]
    fn logout_action() -> Result<()> {
        temp_env::with_var("DEVICECAP_API_URL", Some("http://registry:9000"), || -> Result<()> {
            let action = dispatch(&["devicecap", "logout", "--email", "ada@example.com"])?;
            let Action::Logout(args) = action else {
                bail!("expected a logout action");
            };
            assert_eq!(args.client.api_url, "http://registry:9000");
            Ok(())
        })
    }
}
