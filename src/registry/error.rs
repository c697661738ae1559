use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("account not found")]
    NotFound,
    #[error("{0}")]
    Validation(&'static str),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),
    #[error("corrupt account record: {0}")]
    CorruptRecord(String),
}

impl RegistryError {
    /// Transient failures are safe to retry; nothing was written.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
