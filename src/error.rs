// Error taxonomy for the library. Each component has its own enum so
// callers can tell a broken credential file apart from a failed upload;
// `Error` is the umbrella returned by the session controller.

use std::path::PathBuf;
use thiserror::Error;

/// The credential file could not be read, parsed or written.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize credentials: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Failures while obtaining or renewing an access token.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Callback URL has no '#' fragment carrying the token")]
    MissingFragment,

    #[error("Malformed callback parameter '{0}' (expected key=value)")]
    MalformedPair(String),

    #[error("Invalid expires_in value '{0}'")]
    InvalidExpiry(String),

    #[error("Authorization abandoned: {0}")]
    Interaction(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to refresh access token: {status} - {body}")]
    Refresh { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Terminal outcome of a failed upload. Never retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Upload failed with HTTP status {0}")]
    HttpStatus(u16),

    #[error("Upload transport error: {0}")]
    Transport(String),

    #[error("Malformed upload response: {0}")]
    MalformedResponse(String),
}

/// Any failure surfaced by [`crate::session::SessionController`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

pub type Result<T> = std::result::Result<T, Error>;
