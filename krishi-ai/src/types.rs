//! Core Types and Trait Definitions for krishi-ai
//!
//! Defines the uniform provider contract used by the orchestrator:
//! - **ClassificationProvider:** one implementation per inference source
//! - **RawClassification:** provider-native ranked labels for one image
//! - **ProviderError:** adapter-local failure taxonomy
//!
//! Canonical output types (`CanonicalPrediction`, `Prediction`) live here too
//! so that the API layer and tests share one vocabulary.

use crate::image_input::LeafImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Raw provider output
// ============================================================================

/// One `(label, score)` pair as reported by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// Provider-native label
    pub label: String,
    /// Provider score, nominally 0.0-1.0
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Ranked provider output for one image
///
/// Entries are ordered by descending score. Construction through
/// [`RawClassification::ranked`] enforces the ordering; providers that already
/// return sorted output may use it anyway.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawClassification {
    pub entries: Vec<LabelScore>,
}

impl RawClassification {
    /// Sort entries by descending score (NaN scores sink to the end)
    pub fn ranked(mut entries: Vec<LabelScore>) -> Self {
        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or_else(|| a.score.is_nan().cmp(&b.score.is_nan()))
        });
        Self { entries }
    }

    pub fn top(&self) -> Option<&LabelScore> {
        self.entries.first()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the first `n` entries
    pub fn truncate(mut self, n: usize) -> Self {
        self.entries.truncate(n);
        self
    }
}

// ============================================================================
// Provider contract
// ============================================================================

/// Uniform "classify image → ranked labels" contract
///
/// Implementations are constructed once at startup and shared across
/// concurrent requests, so `classify` takes `&self` and any lazily created
/// handles must be safe for concurrent use.
///
/// # Input contract
/// `image` is already decoded and normalised to RGB. Undecodable uploads are
/// rejected before an orchestrator is ever invoked.
#[async_trait::async_trait]
pub trait ClassificationProvider: Send + Sync {
    /// Stable identifier used in priority configuration and provenance
    fn name(&self) -> &'static str;

    /// Classify one image
    ///
    /// # Errors
    /// Any `ProviderError` is local to this provider; the orchestrator moves on
    /// to the next provider.
    async fn classify(&self, image: &LeafImage) -> Result<RawClassification, ProviderError>;
}

/// Adapter-local failure
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Attempt exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Upstream returned a non-success status
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Upstream response could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    /// Upstream model is loading; a single delayed retry is permitted
    #[error("Model warming up: {0}")]
    WarmingUp(String),

    /// Missing credentials or model artifacts
    #[error("Provider not available: {0}")]
    NotAvailable(String),

    /// Local inference failure
    #[error("Inference error: {0}")]
    Inference(String),
}

impl ProviderError {
    pub fn is_warming_up(&self) -> bool {
        matches!(self, ProviderError::WarmingUp(_))
    }

    /// Classify a transport failure from a client configured with `timeout`
    pub fn from_http(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(timeout)
        } else if e.is_decode() {
            ProviderError::Parse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

// ============================================================================
// Canonical output
// ============================================================================

/// Alternate candidate shown alongside the top prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternate {
    pub label: String,
    pub confidence: f64,
}

/// Orchestrator output in canonical vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPrediction {
    /// Catalog key; always present in the catalog
    pub disease_id: String,
    /// Normalised confidence (0.0-1.0, 4 decimals)
    pub confidence: f64,
    /// Provider-native label of the top entry
    pub raw_label: String,
    /// Ranked candidates as reported, top entry included
    pub alternates: Vec<Alternate>,
}

/// How a prediction was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionOutcome {
    /// A live provider answered
    Succeeded { provider: String },
    /// Every provider failed or none was configured
    Fallback,
}

impl PredictionOutcome {
    /// Provenance string for logs and scan history
    pub fn source(&self) -> &str {
        match self {
            PredictionOutcome::Succeeded { provider } => provider,
            PredictionOutcome::Fallback => "fallback",
        }
    }
}

/// Tagged orchestrator result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub outcome: PredictionOutcome,
    pub prediction: CanonicalPrediction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_sorts_descending() {
        let raw = RawClassification::ranked(vec![
            LabelScore::new("a", 0.1),
            LabelScore::new("b", 0.7),
            LabelScore::new("c", 0.2),
        ]);
        let labels: Vec<_> = raw.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "c", "a"]);
        assert_eq!(raw.top().unwrap().label, "b");
    }

    #[test]
    fn test_ranked_puts_nan_last() {
        let raw = RawClassification::ranked(vec![
            LabelScore::new("nan", f64::NAN),
            LabelScore::new("real", 0.3),
        ]);
        assert_eq!(raw.top().unwrap().label, "real");
    }

    #[test]
    fn test_outcome_source() {
        let ok = PredictionOutcome::Succeeded {
            provider: "local".to_string(),
        };
        assert_eq!(ok.source(), "local");
        assert_eq!(PredictionOutcome::Fallback.source(), "fallback");
    }

    #[test]
    fn test_warming_up_detection() {
        assert!(ProviderError::WarmingUp("loading".into()).is_warming_up());
        assert!(!ProviderError::Network("down".into()).is_warming_up());
    }
}
