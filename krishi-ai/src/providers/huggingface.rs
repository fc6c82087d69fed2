//! Hugging Face Inference API provider
//!
//! Posts the JPEG-encoded leaf to a hosted image-classification model and
//! returns its ranked PlantVillage labels.
//!
//! # API Reference
//! - Endpoint: `POST {base_url}/{model}` with the raw image as body
//! - Auth: `Authorization: Bearer <token>`
//! - Success: `[{"label": "Tomato___Late_blight", "score": 0.93}, ...]`
//! - Loading: HTTP 503 `{"error": "Model ... is currently loading", "estimated_time": 20.0}`

use super::{status_error, MAX_RANKED_ENTRIES};
use crate::image_input::LeafImage;
use crate::types::{ClassificationProvider, LabelScore, ProviderError, RawClassification};
use async_trait::async_trait;
use krishi_common::config::HuggingFaceConfig;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const PROVIDER_NAME: &str = "huggingface";

/// Hugging Face Inference API client
///
/// The underlying `reqwest::Client` pools connections and is shared by all
/// concurrent requests.
pub struct HuggingFaceProvider {
    http_client: Client,
    timeout: Duration,
    endpoint: String,
    token: String,
}

impl HuggingFaceProvider {
    pub fn new(config: &HuggingFaceConfig, token: String) -> Result<Self, ProviderError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            timeout,
            endpoint: format!("{}/{}", config.base_url.trim_end_matches('/'), config.model),
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ClassificationProvider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn classify(&self, image: &LeafImage) -> Result<RawClassification, ProviderError> {
        let body = image
            .to_jpeg()
            .map_err(|e| ProviderError::Inference(format!("JPEG encoding failed: {}", e)))?;

        debug!(endpoint = %self.endpoint, bytes = body.len(), "Querying Hugging Face");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_http(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_http(e, self.timeout))?;
        parse_response(&text)
    }
}

#[derive(Debug, Deserialize)]
struct HfLabel {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct HfError {
    error: String,
    #[serde(default)]
    estimated_time: Option<f64>,
}

/// Parse a 2xx body into ranked labels
///
/// The API occasionally wraps results in an extra array, and may report a
/// loading model in a 200 body; both are handled.
fn parse_response(text: &str) -> Result<RawClassification, ProviderError> {
    if let Ok(labels) = serde_json::from_str::<Vec<HfLabel>>(text) {
        return Ok(to_ranked(labels));
    }
    if let Ok(mut nested) = serde_json::from_str::<Vec<Vec<HfLabel>>>(text) {
        if !nested.is_empty() {
            return Ok(to_ranked(nested.swap_remove(0)));
        }
    }
    if let Ok(err) = serde_json::from_str::<HfError>(text) {
        if err.estimated_time.is_some() || err.error.contains("loading") {
            return Err(ProviderError::WarmingUp(err.error));
        }
        return Err(ProviderError::Api {
            status: 200,
            message: err.error,
        });
    }
    Err(ProviderError::Parse(format!(
        "unexpected Hugging Face response: {}",
        text.chars().take(200).collect::<String>()
    )))
}

fn to_ranked(labels: Vec<HfLabel>) -> RawClassification {
    RawClassification::ranked(
        labels
            .into_iter()
            .map(|l| LabelScore::new(l.label, l.score))
            .collect(),
    )
    .truncate(MAX_RANKED_ENTRIES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_list() {
        let raw = parse_response(
            r#"[{"label":"Tomato___Early_blight","score":0.05},{"label":"Tomato___Late_blight","score":0.93}]"#,
        )
        .unwrap();
        assert_eq!(raw.top().unwrap().label, "Tomato___Late_blight");
        assert_eq!(raw.entries.len(), 2);
    }

    #[test]
    fn test_parse_nested_list() {
        let raw = parse_response(r#"[[{"label":"Apple___healthy","score":0.8}]]"#).unwrap();
        assert_eq!(raw.top().unwrap().label, "Apple___healthy");
    }

    #[test]
    fn test_parse_empty_list() {
        let raw = parse_response("[]").unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn test_parse_loading_body() {
        let err = parse_response(r#"{"error":"Model x is currently loading","estimated_time":20.0}"#)
            .unwrap_err();
        assert!(err.is_warming_up());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_response("<html>"), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_endpoint_joins_model() {
        let config = HuggingFaceConfig {
            base_url: "http://localhost:9999/models/".to_string(),
            model: "org/model".to_string(),
            ..HuggingFaceConfig::default()
        };
        let provider = HuggingFaceProvider::new(&config, "t".to_string()).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:9999/models/org/model");
    }
}
