use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server responded {status}: {message}")]
    Http { status: u16, message: String },
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },
    #[error("unexpected outcome '{0}' for a login")]
    UnexpectedOutcome(&'static str),
}

impl ClientError {
    /// Errors worth retrying on the next poll.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Registry(err) => err.is_transient(),
            Self::Url(_) | Self::InvalidTransition { .. } | Self::UnexpectedOutcome(_) => false,
        }
    }
}
