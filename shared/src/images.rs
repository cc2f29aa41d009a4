//! Tip image retrieval.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use tracing::{info, warn};

use crate::{Error, Result};

/// Client for the image paths referenced by tips.
#[derive(Debug, Clone)]
pub struct ImageSource {
    http_client: reqwest::Client,
    base_url: String,
}

impl ImageSource {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// Download every image in order and return each as base64.
    ///
    /// Stops at the first failure; nothing is returned for the images that
    /// did download.
    pub async fn fetch_all(&self, image_paths: &[String]) -> Result<Vec<String>> {
        let mut images = Vec::with_capacity(image_paths.len());

        for image_path in image_paths {
            images.push(self.fetch_one(image_path).await?);
        }

        Ok(images)
    }

    async fn fetch_one(&self, image_path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, image_path);

        let response = self.http_client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                warn!(image_path, "Dev tip image not found");
                Err(Error::ImageNotFound(image_path.to_string()))
            }
            status if !status.is_success() => {
                Err(Error::Fetch(format!("GET {} returned {}", url, status)))
            }
            _ => {
                let bytes = response.bytes().await?;
                info!(image_path, size = bytes.len(), "Fetched dev tip image");
                Ok(STANDARD.encode(&bytes))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn paths(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    async fn source(server: &MockServer) -> ImageSource {
        ImageSource::new(crate::http::build_client().unwrap(), server.uri())
    }

    #[tokio::test]
    async fn test_empty_list_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let images = source(&server).await.fetch_all(&[]).await.unwrap();
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_images_encoded_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/first"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/second"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xd8, 0xff]))
            .mount(&server)
            .await;

        let images = source(&server)
            .await
            .fetch_all(&paths(&["/img/first", "/img/second"]))
            .await
            .unwrap();

        assert_eq!(images, vec!["aGVsbG8=".to_string(), "/9j/".to_string()]);
    }

    async fn assert_aborts_on_missing(missing_at: usize) {
        let names = ["/img/0", "/img/1", "/img/2"];
        let server = MockServer::start().await;

        for (i, name) in names.iter().enumerate() {
            let (status, expected_calls) = if i < missing_at {
                (200, 1)
            } else if i == missing_at {
                (404, 1)
            } else {
                (200, 0)
            };

            Mock::given(method("GET"))
                .and(path(*name))
                .respond_with(ResponseTemplate::new(status).set_body_bytes(b"png".to_vec()))
                .expect(expected_calls)
                .mount(&server)
                .await;
        }

        let result = source(&server).await.fetch_all(&paths(&names)).await;

        match result {
            Err(Error::ImageNotFound(missing)) => assert_eq!(missing, names[missing_at]),
            other => panic!("expected ImageNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_first_image_aborts() {
        assert_aborts_on_missing(0).await;
    }

    #[tokio::test]
    async fn test_missing_middle_image_aborts() {
        assert_aborts_on_missing(1).await;
    }

    #[tokio::test]
    async fn test_missing_last_image_aborts() {
        assert_aborts_on_missing(2).await;
    }

    #[tokio::test]
    async fn test_server_error_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = source(&server).await.fetch_all(&paths(&["/img/broken"])).await;
        assert!(matches!(result, Err(Error::Fetch(_))));
    }
}
