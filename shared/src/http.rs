//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Request, RequestExt, Response};
use std::time::Duration;

use crate::Result;

/// Timeout applied to every outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the outbound HTTP client shared by a handler.
pub fn build_client() -> Result<reqwest::Client> {
    build_client_with_timeout(REQUEST_TIMEOUT)
}

pub fn build_client_with_timeout(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Create a plain-text response with the given status code and body.
pub fn text_response(status: u16, body: &str) -> std::result::Result<Response<Body>, lambda_http::Error> {
    let response = Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(Body::from(body.to_string()))
        .map_err(Box::new)?;

    Ok(response)
}

/// API Gateway request id, when the event came through API Gateway.
pub fn request_id(event: &Request) -> Option<String> {
    use lambda_http::request::RequestContext;

    match event.request_context_ref()? {
        RequestContext::ApiGatewayV1(ctx) => ctx.request_id.clone(),
        RequestContext::ApiGatewayV2(ctx) => ctx.request_id.clone(),
        _ => None,
    }
}
