//! Error types for the dev tips Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while gating or publishing dev tips.
#[derive(Error, Debug)]
pub enum Error {
    /// Network or decoding failure while talking to the tip/image source
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The tip source returned an empty list
    #[error("No dev tips to choose from")]
    EmptyTipSet,

    /// An image referenced by a tip returned 404
    #[error("imageURL not found: {0}")]
    ImageNotFound(String),

    /// A required credential is absent from the environment
    #[error("{0} is not in the environment")]
    MissingCredential(&'static str),

    /// A single media upload failed
    #[error("Media upload failed: {0}")]
    Media(String),

    /// One or more media uploads failed; carries every per-image message
    #[error("{}", .0.join("\n\n"))]
    Upload(Vec<String>),

    /// Creating the post failed
    #[error("Post failed: {0}")]
    Post(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Fetch(err.to_string())
    }
}
