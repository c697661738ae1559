//! Device-side view of the registry: the `SessionApi` seam, its HTTP binding
//! and the invalidation detector that drives a device through its session.

mod api;
pub mod detector;
mod error;
mod http;

pub use api::SessionApi;
pub use detector::{InvalidationDetector, SessionState, DEFAULT_POLL_INTERVAL};
pub use error::ClientError;
pub use http::HttpSessionApi;
