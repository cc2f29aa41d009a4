//! Dev Tips Lambda - Shared-secret gated webhook endpoint.
//!
//! Requests must be non-GET and carry an `X-Simple-Auth` header matching the
//! configured secret. Anything else gets the same 404 decoy, so the gate looks
//! like a missing page. Each invocation reports one telemetry event.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{request_id, text_response};
use shared::{Config, Telemetry};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AUTH_HEADER: &str = "x-simple-auth";
const DECOY_BODY: &str = "hey, how's it going?";
const SUCCESS_BODY: &str = "Hello, World";

/// Application state shared across requests.
struct AppState {
    simple_auth: Option<String>,
    telemetry: Telemetry,
}

impl AppState {
    fn new(config: &Config, telemetry: Telemetry) -> Self {
        if config.simple_auth.is_none() {
            warn!("CB_SIMPLE_AUTH is not set; every request will be rejected");
        }

        Self {
            simple_auth: config.simple_auth.clone(),
            telemetry,
        }
    }

    fn is_authorized(&self, event: &Request) -> bool {
        let Some(secret) = self.simple_auth.as_deref() else {
            return false;
        };

        event
            .headers()
            .get(AUTH_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|provided| provided == secret)
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str().to_string();

    let mut ev = state.telemetry.new_event();
    ev.add([
        ("method", serde_json::Value::from(method.as_str())),
        ("request_id", request_id(&event).into()),
        ("request_path", event.uri().path().into()),
        ("name", "devtips".into()),
    ]);

    if method == "GET" || !state.is_authorized(&event) {
        info!(method = %method, "Rejected request");
        return text_response(404, DECOY_BODY);
    }

    ev.add_field("status_code", 200);
    text_response(200, SUCCESS_BODY)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env()?;
    let telemetry = Telemetry::tracing(config.telemetry_dataset.clone());
    let state = Arc::new(AppState::new(&config, telemetry));

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
