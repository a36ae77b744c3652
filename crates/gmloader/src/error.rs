use thiserror::Error;

/// Errors raised while resolving an intercepted request.
///
/// Every variant ends up as a `500` response at the router boundary; the
/// two "not found" outcomes are not errors and are modelled as `None`
/// returns instead.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("store `{name}` is at version {found}, expected at most {expected}")]
    VersionMismatch {
        name: String,
        found: i64,
        expected: i64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed manifest record: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("failed to decode binary content: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to build response: {0}")]
    Http(#[from] http::Error),

    #[error("control channel closed")]
    ControlClosed,

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LoaderError>;
