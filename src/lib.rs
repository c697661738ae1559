//! # Devicecap
//!
//! `devicecap` caps how many devices may hold a session for one account at the
//! same time. A device logs in once, is remembered by its device id, and keeps
//! its slot until it logs out or is evicted to make room for another device.
//!
//! ## Admission
//!
//! Every login runs the admission gate against the account's ordered device
//! list:
//!
//! 1. **Known device:** the label is refreshed in place and the device is admitted.
//! 2. **Free slot:** the device is appended and admitted.
//! 3. **Full account:** depending on the configured policy the login is refused
//!    with the current list, so the user can pick a device to remove
//!    (`explicit`), or the oldest device is dropped (`oldest-first`).
//!
//! Admitted accounts without a name and phone number are reported as
//! *profile incomplete*; the device still holds its slot.
//!
//! ## Eviction detection
//!
//! There is no push channel. Each client re-checks its session periodically in
//! `refresh` mode, which never admits an unknown device. A device that was
//! removed gets *not recognized* back and its [`client::InvalidationDetector`]
//! moves to the evicted state.
//!
//! ## Storage
//!
//! Accounts live either in process memory (default) or in `PostgreSQL`, one row
//! per account with the device list stored as a JSONB array. See
//! `sql/schema.sql`.

pub mod api;
pub mod cli;
pub mod client;
pub mod device;
pub mod registry;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
