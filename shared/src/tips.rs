//! Dev tip list retrieval and selection.

use rand::Rng;
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::{Error, Result};

/// One publishable dev tip, as served in `dev-tips.json`.
///
/// ```json
/// {
///   "id": "1a9401d4-f558-5321-9459-e26707b8f52f",
///   "tweet": "bat (https://github.com/sharkdp/bat) is a cat replacement ...",
///   "images": ["/dev-tip-images/cli-bat-replaces-cat-0"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tip {
    pub id: String,
    /// Message body to post
    #[serde(rename = "tweet")]
    pub text: String,
    /// Image locators relative to the tip source origin
    #[serde(rename = "images", default, deserialize_with = "null_as_empty")]
    pub image_paths: Vec<String>,
}

/// Treat `"images": null` the same as an absent or empty list.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Client for the tip list endpoint.
#[derive(Debug, Clone)]
pub struct TipSource {
    http_client: reqwest::Client,
    base_url: String,
}

impl TipSource {
    /// `http_client` is expected to carry the request timeout.
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// Fetch and decode the full tip list.
    pub async fn fetch(&self) -> Result<Vec<Tip>> {
        let url = format!("{}/dev-tips.json", self.base_url);

        let response = self.http_client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("GET {} returned {}", url, status)));
        }

        let tips: Vec<Tip> = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to decode dev tips: {}", e)))?;

        info!(count = tips.len(), "Fetched dev tips");
        Ok(tips)
    }
}

/// Pick one tip uniformly at random, returning its index alongside it.
pub fn select_tip<'a, R: Rng + ?Sized>(tips: &'a [Tip], rng: &mut R) -> Result<(usize, &'a Tip)> {
    if tips.is_empty() {
        return Err(Error::EmptyTipSet);
    }

    let index = rng.gen_range(0..tips.len());
    Ok((index, &tips[index]))
}
