//! Classification providers
//!
//! One adapter per inference source, all implementing `ClassificationProvider`:
//! 1. **local_model** - in-process ONNX classifier (`local`)
//! 2. **huggingface** - Hugging Face Inference API (`huggingface`)
//! 3. **gemini** - Gemini multimodal API prompted in canonical vocabulary (`gemini`)
//!
//! The provider list is assembled once at startup from configuration. A
//! provider whose credentials or model artifacts are missing is left out of
//! the list rather than failing on every request.

pub mod gemini;
pub mod huggingface;
pub mod local_model;

use crate::image_input::LeafImage;
use crate::types::{ClassificationProvider, ProviderError, RawClassification};
use krishi_common::config::TomlConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use gemini::GeminiProvider;
pub use huggingface::HuggingFaceProvider;
pub use local_model::LocalModelProvider;

/// Entries kept from any provider: top-1 plus four alternates
pub const MAX_RANKED_ENTRIES: usize = 5;

/// Run one provider attempt, retrying once if the upstream is warming up
///
/// Only `ProviderError::WarmingUp` earns the retry, and only one. Every other
/// failure, and a second warm-up signal, is returned to the caller unchanged.
pub async fn classify_with_warmup_retry(
    provider: &dyn ClassificationProvider,
    image: &LeafImage,
    retry_delay: Duration,
) -> Result<RawClassification, ProviderError> {
    match provider.classify(image).await {
        Err(e) if e.is_warming_up() => {
            info!(
                provider = provider.name(),
                delay_ms = retry_delay.as_millis() as u64,
                error = %e,
                "Provider warming up, retrying once"
            );
            tokio::time::sleep(retry_delay).await;
            provider.classify(image).await
        }
        other => other,
    }
}

/// Build the provider list in configured priority order
///
/// Unknown identifiers and unavailable providers are logged and skipped.
pub fn build_providers(config: &TomlConfig) -> Vec<Arc<dyn ClassificationProvider>> {
    let mut providers: Vec<Arc<dyn ClassificationProvider>> = Vec::new();

    for id in &config.providers.priority {
        match build_provider(id, config) {
            Ok(provider) => {
                info!(provider = provider.name(), "Provider enabled");
                providers.push(provider);
            }
            Err(e) => warn!(provider = %id, error = %e, "Provider skipped"),
        }
    }

    if providers.is_empty() {
        warn!("No inference providers available; every prediction will use the offline fallback");
    }

    providers
}

fn build_provider(
    id: &str,
    config: &TomlConfig,
) -> Result<Arc<dyn ClassificationProvider>, ProviderError> {
    debug!(provider = id, "Configuring provider");
    match id {
        local_model::PROVIDER_NAME => {
            let provider = LocalModelProvider::load(&config.providers.local)?;
            Ok(Arc::new(provider))
        }
        huggingface::PROVIDER_NAME => {
            let token = config.huggingface_token().ok_or_else(|| {
                ProviderError::NotAvailable(format!(
                    "no token configured (set {} or providers.huggingface.token)",
                    krishi_common::config::HF_TOKEN_ENV_VAR
                ))
            })?;
            let provider = HuggingFaceProvider::new(&config.providers.huggingface, token)?;
            Ok(Arc::new(provider))
        }
        gemini::PROVIDER_NAME => {
            let key = config.gemini_api_key().ok_or_else(|| {
                ProviderError::NotAvailable(format!(
                    "no API key configured (set {} or providers.gemini.api_key)",
                    krishi_common::config::GEMINI_KEY_ENV_VAR
                ))
            })?;
            let provider = GeminiProvider::new(&config.providers.gemini, key)?;
            Ok(Arc::new(provider))
        }
        other => Err(ProviderError::NotAvailable(format!(
            "unknown provider identifier '{}'",
            other
        ))),
    }
}

/// Map an HTTP error status to the adapter-local failure it represents
///
/// 503 is how both remote APIs report a model that is still loading.
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> ProviderError {
    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        ProviderError::WarmingUp(body)
    } else {
        ProviderError::Api {
            status: status.as_u16(),
            message: body,
        }
    }
}
