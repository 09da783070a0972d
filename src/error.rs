use photostrip_core::CollageError;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the store, the sinks and the collage service.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Collage(#[from] CollageError),

    #[error("image not found: {0}")]
    NotFound(Uuid),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("image sink rejected our credentials")]
    Unauthorized,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
