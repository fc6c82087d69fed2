//! Prediction Orchestrator
//!
//! Tries providers one at a time in priority order and turns the first usable
//! answer into a canonical prediction. Attempts are sequential on purpose: a
//! lower-priority provider that happens to answer faster must never displace a
//! higher-priority one.
//!
//! # States
//! ```text
//! Trying(0) ─fail/empty→ Trying(1) ─fail/empty→ … ─→ Fallback
//!     │                      │
//!     └──ranked result───────┴──────────────────────→ Succeeded
//! ```
//!
//! Provider failures never reach the caller. The only errors are an
//! undecodable image (when a provider needs pixels) and a mapped id missing
//! from the catalog.

use crate::catalog;
use crate::confidence;
use crate::fallback;
use crate::image_input::{ImageInputError, LeafImage};
use crate::providers::classify_with_warmup_retry;
use crate::taxonomy;
use crate::types::{
    CanonicalPrediction, ClassificationProvider, LabelScore, Prediction, PredictionOutcome,
    ProviderError, RawClassification,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors a caller can observe
#[derive(Debug, Error)]
pub enum PredictError {
    /// Input failed to decode; should have been rejected upstream
    #[error(transparent)]
    InvalidImage(#[from] ImageInputError),

    /// Mapped id is not in the catalog: mapper and catalog have drifted apart
    #[error("Catalog inconsistency: '{disease_id}' (from '{raw_label}') is not a catalog id")]
    CatalogInconsistency {
        disease_id: String,
        raw_label: String,
    },
}

/// Attempt policy shared by all providers
#[derive(Debug, Clone, Copy)]
pub struct AttemptPolicy {
    /// Delay before the single warm-up retry
    pub warmup_retry_delay: Duration,
    /// Deadline for one provider attempt, retry included
    pub attempt_timeout: Duration,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            warmup_retry_delay: Duration::from_millis(2000),
            attempt_timeout: Duration::from_millis(30_000),
        }
    }
}

impl AttemptPolicy {
    pub fn from_config(config: &krishi_common::config::ProvidersConfig) -> Self {
        Self {
            warmup_retry_delay: Duration::from_millis(config.warmup_retry_delay_ms),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
        }
    }
}

/// Provider priority plus attempt policy, fixed at construction
///
/// Holds no per-request state; share it behind an `Arc` and call
/// [`Orchestrator::predict`] concurrently.
pub struct Orchestrator {
    providers: Vec<Arc<dyn ClassificationProvider>>,
    policy: AttemptPolicy,
}

impl Orchestrator {
    pub fn new(providers: Vec<Arc<dyn ClassificationProvider>>, policy: AttemptPolicy) -> Self {
        Self { providers, policy }
    }

    /// Provider names in the order they are tried
    pub fn provider_order(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Decode `image_bytes` and predict
    ///
    /// With no providers configured the bytes go straight to the offline
    /// predictor and are never decoded.
    pub async fn predict(&self, image_bytes: &[u8]) -> Result<Prediction, PredictError> {
        if self.providers.is_empty() {
            return self.fall_back(image_bytes);
        }
        let image = LeafImage::decode(image_bytes)?;
        self.predict_image(&image).await
    }

    /// Predict for an already-decoded image
    pub async fn predict_image(&self, image: &LeafImage) -> Result<Prediction, PredictError> {
        for provider in &self.providers {
            let name = provider.name();
            debug!(provider = name, "Trying provider");

            match self.attempt(provider.as_ref(), image).await {
                Ok(raw) => {
                    let Some(top) = raw.top() else {
                        warn!(provider = name, "Provider returned no labels, trying next");
                        continue;
                    };
                    let prediction = canonicalize(top, &raw)?;
                    info!(
                        provider = name,
                        disease_id = %prediction.disease_id,
                        raw_label = %prediction.raw_label,
                        confidence = prediction.confidence,
                        "Prediction succeeded"
                    );
                    return Ok(Prediction {
                        outcome: PredictionOutcome::Succeeded {
                            provider: name.to_string(),
                        },
                        prediction,
                    });
                }
                Err(e) => {
                    warn!(provider = name, error = %e, "Provider failed, trying next");
                }
            }
        }

        self.fall_back(image.bytes())
    }

    fn fall_back(&self, image_bytes: &[u8]) -> Result<Prediction, PredictError> {
        let prediction = fallback::predict(image_bytes);
        ensure_cataloged(&prediction)?;
        info!(
            disease_id = %prediction.disease_id,
            confidence = prediction.confidence,
            providers = self.providers.len(),
            "No provider answered, using offline fallback"
        );
        Ok(Prediction {
            outcome: PredictionOutcome::Fallback,
            prediction,
        })
    }

    async fn attempt(
        &self,
        provider: &dyn ClassificationProvider,
        image: &LeafImage,
    ) -> Result<RawClassification, ProviderError> {
        let deadline = self.policy.attempt_timeout;
        tokio::time::timeout(
            deadline,
            classify_with_warmup_retry(provider, image, self.policy.warmup_retry_delay),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout(deadline)))
    }
}

/// Map and normalise the top entry of a ranked result
fn canonicalize(
    top: &LabelScore,
    raw: &RawClassification,
) -> Result<CanonicalPrediction, PredictError> {
    let prediction = CanonicalPrediction {
        disease_id: taxonomy::map_label(&top.label).to_string(),
        confidence: confidence::normalize(top.score),
        raw_label: top.label.clone(),
        alternates: confidence::alternates(raw),
    };
    ensure_cataloged(&prediction)?;
    Ok(prediction)
}

fn ensure_cataloged(prediction: &CanonicalPrediction) -> Result<(), PredictError> {
    if catalog::contains(&prediction.disease_id) {
        return Ok(());
    }
    error!(
        disease_id = %prediction.disease_id,
        raw_label = %prediction.raw_label,
        "Predicted id missing from catalog"
    );
    Err(PredictError::CatalogInconsistency {
        disease_id: prediction.disease_id.clone(),
        raw_label: prediction.raw_label.clone(),
    })
}
