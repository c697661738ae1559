use clap::{Arg, Command};

use crate::device::DEFAULT_IDENTITY_FILE;

pub const WATCH: &str = "watch";
pub const LOGOUT: &str = "logout";

/// Arguments shared by every client subcommand.
fn with_client_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Base URL of the registry service")
                .default_value("http://localhost:8080")
                .env("DEVICECAP_API_URL"),
        )
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .help("Account email, as provided by the identity provider")
                .env("DEVICECAP_EMAIL")
                .required(true),
        )
        .arg(
            Arg::new("identity-file")
                .long("identity-file")
                .help("Where this device's id is stored")
                .default_value(DEFAULT_IDENTITY_FILE)
                .env("DEVICECAP_IDENTITY_FILE"),
        )
        .arg(
            Arg::new("platform")
                .long("platform")
                .help("Platform or user-agent string used to name this device")
                .env("DEVICECAP_PLATFORM"),
        )
}

#[must_use]
pub fn watch() -> Command {
    let command = Command::new(WATCH)
        .about("Log this device in and watch for eviction")
        .arg(
            Arg::new("poll-seconds")
                .long("poll-seconds")
                .help("Seconds between session checks")
                .default_value("60")
                .env("DEVICECAP_POLL_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("evict")
                .long("evict")
                .help("Device id to remove if the account is full")
                .value_name("DEVICE_ID"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .help("Profile name, sent when the profile is incomplete")
                .requires("phone-number"),
        )
        .arg(
            Arg::new("phone-number")
                .long("phone-number")
                .help("Profile phone number, sent when the profile is incomplete")
                .requires("name"),
        );

    with_client_args(command)
}

#[must_use]
pub fn logout() -> Command {
    with_client_args(Command::new(LOGOUT).about("Remove this device from the account"))
}
