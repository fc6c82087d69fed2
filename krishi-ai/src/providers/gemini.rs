//! Gemini provider
//!
//! Sends the leaf inline to Gemini `generateContent` with a prompt that
//! restricts the answer to canonical disease ids, so its single ranked entry is
//! already in catalog vocabulary and passes through the taxonomy mapper as-is.
//!
//! # API Reference
//! - Endpoint: `POST {base_url}/models/{model}:generateContent?key=<api key>`
//! - Answer text (JSON mode): `{"disease_id": "...", "confidence": 0.9}`
//! - Overloaded / loading: HTTP 503

use super::status_error;
use crate::catalog;
use crate::image_input::LeafImage;
use crate::types::{ClassificationProvider, LabelScore, ProviderError, RawClassification};
use async_trait::async_trait;
use base64::Engine;
use krishi_common::config::GeminiConfig;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub const PROVIDER_NAME: &str = "gemini";

pub struct GeminiProvider {
    http_client: Client,
    timeout: Duration,
    endpoint: String,
    api_key: String,
    prompt: String,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig, api_key: String) -> Result<Self, ProviderError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            timeout,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key,
            prompt: build_prompt(),
        })
    }
}

/// Prompt listing every canonical id the model may answer with
fn build_prompt() -> String {
    let ids: Vec<&str> = catalog::ids().collect();
    format!(
        "You are an expert plant pathologist. Analyze the leaf in this image for diseases.\n\
         Classify it into exactly ONE of these disease_id strings: {}.\n\
         If the image is not a plant leaf, or the leaf is healthy, use \"{}\".\n\
         If the disease is not on the list but is very similar to one, pick the closest match.\n\
         Respond with JSON only, in this format:\n\
         {{\"disease_id\": \"one_of_the_exact_strings_above\", \"confidence\": 0.95}}",
        ids.join(", "),
        catalog::DEFAULT_DISEASE_ID
    )
}

#[async_trait]
impl ClassificationProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn classify(&self, image: &LeafImage) -> Result<RawClassification, ProviderError> {
        let jpeg = image
            .to_jpeg()
            .map_err(|e| ProviderError::Inference(format!("JPEG encoding failed: {}", e)))?;

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": self.prompt },
                    { "inline_data": {
                        "mime_type": "image/jpeg",
                        "data": base64::engine::general_purpose::STANDARD.encode(&jpeg),
                    }},
                ]
            }],
            "generationConfig": { "response_mime_type": "application/json" },
        });

        debug!(endpoint = %self.endpoint, "Querying Gemini");

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
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
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Diagnosis {
    disease_id: String,
    confidence: f64,
}

/// Extract the model's JSON answer from a `generateContent` body
fn parse_response(text: &str) -> Result<RawClassification, ProviderError> {
    let response: GenerateResponse = serde_json::from_str(text)
        .map_err(|e| ProviderError::Parse(format!("Gemini envelope: {}", e)))?;

    let answer = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text);

    // No candidate text means the model declined (e.g. safety block)
    let Some(answer) = answer else {
        return Ok(RawClassification::default());
    };

    let diagnosis: Diagnosis = serde_json::from_str(strip_code_fence(&answer))
        .map_err(|e| ProviderError::Parse(format!("Gemini answer: {}", e)))?;

    Ok(RawClassification::ranked(vec![LabelScore::new(
        diagnosis.disease_id.trim(),
        diagnosis.confidence,
    )]))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|t| t.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
