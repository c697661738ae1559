use clap::{Arg, Command};

pub const SUBCOMMAND: &str = "server";

#[must_use]
pub fn subcommand() -> Command {
    Command::new(SUBCOMMAND)
        .about("Run the device registry HTTP service")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("DEVICECAP_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .long_help(
                    "PostgreSQL connection string. When omitted, accounts are kept in memory and lost on restart.",
                )
                .env("DEVICECAP_DSN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("max-devices")
                .long("max-devices")
                .help("Devices allowed per new account")
                .default_value("3")
                .env("DEVICECAP_MAX_DEVICES")
                .value_parser(clap::value_parser!(u32).range(1..=1000)),
        )
        .arg(
            Arg::new("eviction-policy")
                .long("eviction-policy")
                .help("What to do when a full account logs in from a new device")
                .long_help(
                    "explicit: refuse and return the device list so the user removes one.\noldest-first: sign out the oldest device automatically.",
                )
                .default_value("explicit")
                .env("DEVICECAP_EVICTION_POLICY")
                .value_parser(["explicit", "oldest-first"]),
        )
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Browser origin allowed by CORS, any origin when omitted")
                .env("DEVICECAP_FRONTEND_BASE_URL"),
        )
}
