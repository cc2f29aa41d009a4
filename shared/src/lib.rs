//! Shared library for the dev tips Lambda functions.
//!
//! This crate provides configuration, telemetry, the tip/image sources, the
//! Twitter client and the publishing pipeline used by both handlers.

pub mod config;
pub mod error;
pub mod http;
pub mod images;
pub mod publish;
pub mod telemetry;
pub mod tips;
pub mod twitter;

pub use config::Config;
pub use error::{Error, Result};
pub use images::ImageSource;
pub use publish::{PublishFailure, Publisher, Stage};
pub use telemetry::{Event, MemorySink, Telemetry, TelemetrySink, TracingSink};
pub use tips::{select_tip, Tip, TipSource};
pub use twitter::{
    bootstrap, upload_images, CredentialSource, Credentials, PostedMessage, ProcessEnv,
    SocialClient, SocialConnector, TwitterClient, TwitterConnector, UploadOutcome, UploadedMedia,
};
