use crate::{
    api,
    registry::{Backend, EvictionPolicy, MemoryStore, PgStore, Registry, RegistryConfig},
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc};
use tracing::{info, warn};
use url::Url;

pub struct Args {
    pub port: u16,
    pub dsn: Option<SecretString>,
    pub max_devices: usize,
    pub policy: EvictionPolicy,
    pub frontend_base_url: Option<String>,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field(
                "dsn",
                &self.dsn.as_ref().map(|dsn| redact_dsn(dsn.expose_secret())),
            )
            .field("max_devices", &self.max_devices)
            .field("policy", &self.policy)
            .field("frontend_base_url", &self.frontend_base_url)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store = match &args.dsn {
        Some(dsn) => Backend::Postgres(
            PgStore::connect(dsn.expose_secret())
                .await
                .context("Failed to connect to the account database")?,
        ),
        None => {
            warn!("No DSN configured, accounts are kept in memory and lost on restart");
            Backend::Memory(MemoryStore::new())
        }
    };

    let config = RegistryConfig::new()
        .with_max_devices(args.max_devices)
        .with_policy(args.policy);
    let registry = Arc::new(Registry::new(store, config));

    api::new(args.port, registry, args.frontend_base_url.as_deref()).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "dsn",
            args.dsn
                .as_ref()
                .map_or_else(|| "none (memory)".to_string(), |dsn| {
                    redact_dsn(dsn.expose_secret())
                }),
        ),
        ("max_devices", args.max_devices.to_string()),
        ("eviction_policy", args.policy.to_string()),
        (
            "frontend_base_url",
            args.frontend_base_url
                .clone()
                .unwrap_or_else(|| "any".to_string()),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
