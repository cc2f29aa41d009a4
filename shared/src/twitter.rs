//! Twitter client: credential bootstrap, media upload and status posting.
//!
//! Requests are signed with OAuth 1.0a (HMAC-SHA1) using the four user
//! credentials. The orchestrator only sees the [`SocialClient`] and
//! [`SocialConnector`] traits so it can run against an in-memory client in
//! tests.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::{Error, Result};

pub const ACCESS_TOKEN_VAR: &str = "TWITTER_ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET_VAR: &str = "TWITTER_ACCESS_TOKEN_SECRET";
pub const CONSUMER_KEY_VAR: &str = "TWITTER_CONSUMER_KEY";
pub const CONSUMER_SECRET_VAR: &str = "TWITTER_CONSUMER_SECRET";

pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com";
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://upload.twitter.com";

type HmacSha1 = Hmac<Sha1>;

/// Somewhere credentials can be looked up by variable name.
pub trait CredentialSource: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// The process environment, read at lookup time.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl CredentialSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl CredentialSource for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// OAuth 1.0a user credentials.
#[derive(Clone)]
pub struct Credentials {
    pub access_token: String,
    pub access_token_secret: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl Credentials {
    /// Read all four credentials, failing on the first one that is absent.
    pub fn load(source: &dyn CredentialSource) -> Result<Self> {
        let get = |name: &'static str| source.lookup(name).ok_or(Error::MissingCredential(name));

        Ok(Self {
            access_token: get(ACCESS_TOKEN_VAR)?,
            access_token_secret: get(ACCESS_TOKEN_SECRET_VAR)?,
            consumer_key: get(CONSUMER_KEY_VAR)?,
            consumer_secret: get(CONSUMER_SECRET_VAR)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials { <redacted> }")
    }
}

/// Media id returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub media_id: String,
}

/// Identifier of a created post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub post_id: String,
}

/// An authenticated social media client.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Upload one base64-encoded image.
    async fn upload_media(&self, base64_image: &str) -> Result<UploadedMedia>;

    /// Create a post. `media_ids` is a comma-separated id list, possibly empty.
    async fn post_message(&self, text: &str, media_ids: &str) -> Result<PostedMessage>;
}

/// Produces authenticated clients from credentials.
pub trait SocialConnector: Send + Sync {
    fn authenticate(&self, credentials: Credentials) -> Arc<dyn SocialClient>;
}

/// Load credentials and authenticate.
pub fn bootstrap(
    source: &dyn CredentialSource,
    connector: &dyn SocialConnector,
) -> Result<Arc<dyn SocialClient>> {
    let credentials = Credentials::load(source)?;
    Ok(connector.authenticate(credentials))
}

/// Result of uploading a batch of images.
#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub uploaded: Vec<UploadedMedia>,
    pub failed: Vec<Error>,
}

impl UploadOutcome {
    /// Comma-joined media ids, in upload order.
    pub fn media_ids(&self) -> String {
        self.uploaded
            .iter()
            .map(|media| media.media_id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// All-or-nothing view: any failed image fails the whole batch.
    pub fn into_result(self) -> Result<Vec<UploadedMedia>> {
        if self.failed.is_empty() {
            Ok(self.uploaded)
        } else {
            Err(Error::Upload(
                self.failed.iter().map(|e| e.to_string()).collect(),
            ))
        }
    }
}

/// Upload every image, continuing past failures.
pub async fn upload_images(images: &[String], client: &dyn SocialClient) -> UploadOutcome {
    let mut outcome = UploadOutcome::default();

    for image in images {
        match client.upload_media(image).await {
            Ok(media) => outcome.uploaded.push(media),
            Err(e) => {
                error!("Media upload failed: {}", e);
                outcome.failed.push(e);
            }
        }
    }

    outcome
}

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

#[derive(Debug, Deserialize)]
struct StatusUpdateResponse {
    id_str: String,
}

/// Builds [`TwitterClient`]s that share one HTTP client.
#[derive(Debug, Clone)]
pub struct TwitterConnector {
    http_client: reqwest::Client,
    api_base_url: String,
    upload_base_url: String,
}

impl TwitterConnector {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self::with_base_urls(http_client, DEFAULT_API_BASE_URL, DEFAULT_UPLOAD_BASE_URL)
    }

    /// Point the client at alternative API origins.
    pub fn with_base_urls(
        http_client: reqwest::Client,
        api_base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_base_url: api_base_url.into(),
            upload_base_url: upload_base_url.into(),
        }
    }
}

impl SocialConnector for TwitterConnector {
    fn authenticate(&self, credentials: Credentials) -> Arc<dyn SocialClient> {
        Arc::new(TwitterClient {
            http_client: self.http_client.clone(),
            api_base_url: self.api_base_url.clone(),
            upload_base_url: self.upload_base_url.clone(),
            credentials,
        })
    }
}

/// Twitter API v1.1 client signing each request with OAuth 1.0a.
pub struct TwitterClient {
    http_client: reqwest::Client,
    api_base_url: String,
    upload_base_url: String,
    credentials: Credentials,
}

impl TwitterClient {
    /// POST a signed form and return the response body on success.
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> std::result::Result<String, String> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let authorization =
            authorization_header(&self.credentials, "POST", url, form, &nonce, &timestamp)?;

        let response = self
            .http_client
            .post(url)
            .header("authorization", authorization)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("POST {} failed: {}", url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("POST {} returned {} but the body could not be read: {}", url, status, e))?;

        if !status.is_success() {
            return Err(format!("POST {} returned {}: {}", url, status, body));
        }

        Ok(body)
    }
}

#[async_trait]
impl SocialClient for TwitterClient {
    async fn upload_media(&self, base64_image: &str) -> Result<UploadedMedia> {
        let url = format!("{}/1.1/media/upload.json", self.upload_base_url);

        let body = self
            .post_form(&url, &[("media_data", base64_image)])
            .await
            .map_err(Error::Media)?;

        let parsed: MediaUploadResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Media(format!("Failed to parse upload response: {}", e)))?;

        info!(media_id = %parsed.media_id_string, "Uploaded media");
        Ok(UploadedMedia {
            media_id: parsed.media_id_string,
        })
    }

    async fn post_message(&self, text: &str, media_ids: &str) -> Result<PostedMessage> {
        let url = format!("{}/1.1/statuses/update.json", self.api_base_url);

        let mut form = vec![("status", text)];
        if !media_ids.is_empty() {
            form.push(("media_ids", media_ids));
        }

        let body = self.post_form(&url, &form).await.map_err(Error::Post)?;

        let parsed: StatusUpdateResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Post(format!("Failed to parse status response: {}", e)))?;

        info!(post_id = %parsed.id_str, "Posted status");
        Ok(PostedMessage {
            post_id: parsed.id_str,
        })
    }
}

/// RFC 3986 percent-encoding as OAuth 1.0a requires.
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Compute the base64 HMAC-SHA1 signature for a request.
///
/// `params` holds every query and form parameter of the request; the oauth
/// protocol parameters are passed separately.
fn signature(
    credentials: &Credentials,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    oauth_params: &[(&str, &str)],
) -> std::result::Result<String, String> {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .chain(oauth_params.iter())
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&parameter_string)
    );
    let signing_key = format!(
        "{}&{}",
        encode(&credentials.consumer_secret),
        encode(&credentials.access_token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| format!("Invalid signing key: {}", e))?;
    mac.update(base_string.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build the `Authorization: OAuth ...` header value.
fn authorization_header(
    credentials: &Credentials,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    nonce: &str,
    timestamp: &str,
) -> std::result::Result<String, String> {
    let oauth_params = [
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let signature = signature(credentials, method, url, params, &oauth_params)?;

    let mut signed: Vec<(&str, &str)> = oauth_params.to_vec();
    signed.push(("oauth_signature", signature.as_str()));
    signed.sort();

    let header = signed
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {}", header))
}
