//! Configuration management for Lambda functions.

use std::env;

use crate::{Error, Result};

/// Origin serving `dev-tips.json` and the tip images.
pub const DEFAULT_TIPS_BASE_URL: &str = "https://christopherbiscardi.com";

/// Dataset telemetry events are reported under.
pub const DEFAULT_TELEMETRY_DATASET: &str = "netlify-lambdas";

/// Prefix for variables owned by these functions (`CB_SIMPLE_AUTH`).
pub const ENV_PREFIX: &str = "CB";

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Base origin for the tip list and image paths
    pub tips_base_url: String,
    /// Shared secret expected in the `X-Simple-Auth` header
    pub simple_auth: Option<String>,
    /// Telemetry dataset name
    pub telemetry_dataset: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let tips_base_url = env::var("DEV_TIPS_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_TIPS_BASE_URL.to_string());

        let tips_base_url = tips_base_url.trim_end_matches('/').to_string();
        if !tips_base_url.starts_with("http://") && !tips_base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "DEV_TIPS_BASE_URL must be an http(s) origin, got {}",
                tips_base_url
            )));
        }

        Ok(Self {
            tips_base_url,
            simple_auth: env::var(format!("{}_SIMPLE_AUTH", ENV_PREFIX))
                .ok()
                .filter(|secret| !secret.is_empty()),
            telemetry_dataset: env::var("TELEMETRY_DATASET")
                .unwrap_or_else(|_| DEFAULT_TELEMETRY_DATASET.to_string()),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("tips_base_url", &self.tips_base_url)
            .field("simple_auth", &self.simple_auth.as_ref().map(|_| "<redacted>"))
            .field("telemetry_dataset", &self.telemetry_dataset)
            .finish()
    }
}
