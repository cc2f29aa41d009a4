//! Dev tip publishing pipeline.
//!
//! Runs fetch, select, image retrieval, credential bootstrap, upload and post
//! in order. The first failing stage ends the run; nothing is retried and
//! media that was already uploaded is left in place.

use rand::Rng;
use std::sync::Arc;
use tracing::{error, info};

use crate::images::ImageSource;
use crate::telemetry::Event;
use crate::tips::{select_tip, TipSource};
use crate::twitter::{bootstrap, upload_images, CredentialSource, PostedMessage, SocialConnector};
use crate::Error;

/// Pipeline stage, used to pick the response message on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Select,
    RetrieveImages,
    Bootstrap,
    Upload,
    Post,
}

impl Stage {
    /// Fixed response body reported when this stage fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Stage::Fetch => "Failed to get list of dev tips",
            Stage::Select => "No dev tips available",
            Stage::RetrieveImages => "Failed to fetch images",
            Stage::Bootstrap => "Failed to bootstrap",
            Stage::Upload => "Failed to upload images",
            Stage::Post => "Failed to send tweet",
        }
    }
}

/// A pipeline failure and the stage it happened in.
#[derive(Debug)]
pub struct PublishFailure {
    pub stage: Stage,
    pub error: Error,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, PublishFailure>;
}

impl<T> AtStage<T> for crate::Result<T> {
    fn at(self, stage: Stage) -> Result<T, PublishFailure> {
        self.map_err(|error| PublishFailure { stage, error })
    }
}

/// Everything needed to publish one dev tip.
pub struct Publisher {
    tips: TipSource,
    images: ImageSource,
    credentials: Arc<dyn CredentialSource>,
    connector: Arc<dyn SocialConnector>,
}

impl Publisher {
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        credentials: Arc<dyn CredentialSource>,
        connector: Arc<dyn SocialConnector>,
    ) -> Self {
        Self {
            tips: TipSource::new(http_client.clone(), base_url),
            images: ImageSource::new(http_client, base_url),
            credentials,
            connector,
        }
    }

    /// Run the pipeline, recording progress on `ev`.
    ///
    /// On failure the `error` field is set to the failure's message.
    pub async fn publish<R: Rng + Send + ?Sized>(
        &self,
        ev: &mut Event,
        rng: &mut R,
    ) -> Result<PostedMessage, PublishFailure> {
        let result = self.run(ev, rng).await;

        match &result {
            Ok(posted) => {
                ev.add_field("status_code", 200);
                ev.add_field("tweet_id", posted.post_id.clone());
            }
            Err(failure) => {
                error!(stage = ?failure.stage, "Dev tip publish failed: {}", failure.error);
                ev.add_field("error", failure.error.to_string());
            }
        }

        result
    }

    async fn run<R: Rng + Send + ?Sized>(
        &self,
        ev: &mut Event,
        rng: &mut R,
    ) -> Result<PostedMessage, PublishFailure> {
        let tips = self.tips.fetch().await.at(Stage::Fetch)?;

        let (index, tip) = select_tip(&tips, rng).at(Stage::Select)?;
        ev.add([
            ("num_tips", serde_json::Value::from(tips.len())),
            ("tip_index_to_tweet", index.into()),
            ("tweet", tip.text.clone().into()),
            ("num_images", tip.image_paths.len().into()),
        ]);
        info!(tip_id = %tip.id, index, "Selected dev tip");

        let images = self
            .images
            .fetch_all(&tip.image_paths)
            .await
            .at(Stage::RetrieveImages)?;

        let client = bootstrap(self.credentials.as_ref(), self.connector.as_ref()).at(Stage::Bootstrap)?;

        let outcome = upload_images(&images, client.as_ref()).await;
        let media_ids = outcome.media_ids();
        outcome.into_result().at(Stage::Upload)?;

        client
            .post_message(&tip.text, &media_ids)
            .await
            .at(Stage::Post)
    }
}
