//! Publish Dev Tip Lambda - Tweets a random dev tip with its images.
//!
//! Each invocation fetches the tip list, picks one tip at random, downloads
//! its images, uploads them to Twitter and posts the tip text with the
//! uploaded media attached. Any failing step ends the invocation with a 500.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::http::{build_client, request_id, text_response};
use shared::{
    Config, CredentialSource, ProcessEnv, Publisher, SocialConnector, Telemetry,
    TwitterConnector,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SUCCESS_BODY: &str = "Hello, World";

/// Application state shared across requests.
struct AppState {
    publisher: Publisher,
    telemetry: Telemetry,
}

impl AppState {
    fn new(
        config: &Config,
        http_client: reqwest::Client,
        credentials: Arc<dyn CredentialSource>,
        connector: Arc<dyn SocialConnector>,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            publisher: Publisher::new(http_client, &config.tips_base_url, credentials, connector),
            telemetry,
        }
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let mut ev = state.telemetry.new_event();
    ev.add([
        ("method", serde_json::Value::from(event.method().as_str())),
        ("request_id", request_id(&event).into()),
        ("request_path", event.uri().path().into()),
        ("name", "publish-dev-tip".into()),
    ]);

    let mut rng = StdRng::from_entropy();
    match state.publisher.publish(&mut ev, &mut rng).await {
        Ok(posted) => {
            info!(post_id = %posted.post_id, "Published dev tip");
            text_response(200, SUCCESS_BODY)
        }
        Err(failure) => text_response(500, failure.stage.failure_message()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env()?;
    let http_client = build_client()?;
    let state = Arc::new(AppState::new(
        &config,
        http_client.clone(),
        Arc::new(ProcessEnv),
        Arc::new(TwitterConnector::new(http_client)),
        Telemetry::tracing(config.telemetry_dataset.clone()),
    ));

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use shared::{Credentials, MemorySink, PostedMessage, SocialClient, UploadedMedia};
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct EchoClient;

    #[async_trait]
    impl SocialClient for EchoClient {
        async fn upload_media(&self, _base64_image: &str) -> shared::Result<UploadedMedia> {
            Ok(UploadedMedia {
                media_id: "42".to_string(),
            })
        }

        async fn post_message(&self, _text: &str, _media_ids: &str) -> shared::Result<PostedMessage> {
            Ok(PostedMessage {
                post_id: "99".to_string(),
            })
        }
    }

    struct EchoConnector;

    impl SocialConnector for EchoConnector {
        fn authenticate(&self, _credentials: Credentials) -> Arc<dyn SocialClient> {
            Arc::new(EchoClient)
        }
    }

    fn credentials() -> HashMap<String, String> {
        [
            "TWITTER_ACCESS_TOKEN",
            "TWITTER_ACCESS_TOKEN_SECRET",
            "TWITTER_CONSUMER_KEY",
            "TWITTER_CONSUMER_SECRET",
        ]
        .into_iter()
        .map(|name| (name.to_string(), "value".to_string()))
        .collect()
    }

    fn state(server: &MockServer, credentials: HashMap<String, String>) -> (Arc<AppState>, Arc<MemorySink>) {
        let sink = MemorySink::new();
        let config = Config {
            tips_base_url: server.uri(),
            simple_auth: None,
            telemetry_dataset: "test".to_string(),
        };
        let state = AppState::new(
            &config,
            build_client().unwrap(),
            Arc::new(credentials),
            Arc::new(EchoConnector),
            Telemetry::new("test", sink.clone()),
        );
        (Arc::new(state), sink)
    }

    fn request() -> Request {
        lambda_http::http::Request::builder()
            .method("POST")
            .uri("/.netlify/functions/publish-dev-tip")
            .body(Body::Empty)
            .unwrap()
    }

    fn body_text(response: &Response<Body>) -> String {
        match response.body() {
            Body::Text(text) => text.clone(),
            other => panic!("expected text body, got {:?}", other),
        }
    }

    async fn tip_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dev-tips.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "a", "tweet": "try fd instead of find", "images": ["/img/fd-0"]}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/fd-0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_success_response() {
        let server = tip_server().await;
        let (state, sink) = state(&server, credentials());

        let response = handler(state, request()).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(body_text(&response), SUCCESS_BODY);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["name"], json!("publish-dev-tip"));
        assert_eq!(events[0]["method"], json!("POST"));
        assert_eq!(events[0]["status_code"], json!(200));
        assert_eq!(events[0]["tweet_id"], json!("99"));
    }

    #[tokio::test]
    async fn test_bootstrap_failure_response() {
        let server = tip_server().await;
        let mut creds = credentials();
        creds.remove("TWITTER_CONSUMER_SECRET");
        let (state, sink) = state(&server, creds);

        let response = handler(state, request()).await.unwrap();

        assert_eq!(response.status(), 500);
        assert_eq!(body_text(&response), "Failed to bootstrap");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0]["error"],
            json!("TWITTER_CONSUMER_SECRET is not in the environment")
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_response() {
        let server = MockServer::start().await;
        let (state, sink) = state(&server, credentials());

        let response = handler(state, request()).await.unwrap();

        assert_eq!(response.status(), 500);
        assert_eq!(body_text(&response), "Failed to get list of dev tips");
        assert_eq!(sink.events().len(), 1);
    }
}
