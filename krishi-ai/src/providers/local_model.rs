//! Local ONNX model provider
//!
//! Runs a PlantVillage image classifier (MobileNetV2, 224×224 input) in-process
//! with tract. The model is loaded and optimised once when the provider is
//! built; each request runs on tokio's blocking pool because inference is
//! CPU-bound.
//!
//! # Artifacts
//! - `model_path`: ONNX graph with a single `[1, 3, 224, 224]` f32 input
//! - `labels_path`: one label per line, in output index order
//!
//! Both must exist for the provider to be enabled.

use super::MAX_RANKED_ENTRIES;
use crate::image_input::{LeafImage, MODEL_INPUT_SIZE};
use crate::types::{ClassificationProvider, LabelScore, ProviderError, RawClassification};
use async_trait::async_trait;
use krishi_common::config::LocalModelConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tract_onnx::prelude::*;

pub const PROVIDER_NAME: &str = "local";

/// ImageNet normalization mean values (RGB)
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

type OnnxPlan = TypedRunnableModel<TypedModel>;

pub struct LocalModelProvider {
    model: Arc<OnnxPlan>,
    labels: Arc<Vec<String>>,
}

impl LocalModelProvider {
    /// Load model and labels from configured artifacts
    ///
    /// # Errors
    /// `NotAvailable` when artifacts are unconfigured or missing, `Inference`
    /// when the graph fails to load or optimise.
    pub fn load(config: &LocalModelConfig) -> Result<Self, ProviderError> {
        let (Some(model_path), Some(labels_path)) = (&config.model_path, &config.labels_path) else {
            return Err(ProviderError::NotAvailable(
                "model_path and labels_path must both be configured".to_string(),
            ));
        };
        if !config.artifacts_present() {
            return Err(ProviderError::NotAvailable(format!(
                "model artifacts not found ({}, {})",
                model_path.display(),
                labels_path.display()
            )));
        }

        let labels = load_labels(labels_path)?;
        let size = MODEL_INPUT_SIZE as usize;

        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| {
                ProviderError::Inference(format!(
                    "failed to load ONNX model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        info!(
            model = %model_path.display(),
            classes = labels.len(),
            "Local model loaded"
        );

        Ok(Self {
            model: Arc::new(model),
            labels: Arc::new(labels),
        })
    }
}

#[async_trait]
impl ClassificationProvider for LocalModelProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn classify(&self, image: &LeafImage) -> Result<RawClassification, ProviderError> {
        let model = Arc::clone(&self.model);
        let labels = Arc::clone(&self.labels);
        let image = image.clone();

        // Resize and inference both stay inside the closure; tract outputs are not Send
        let probabilities =
            tokio::task::spawn_blocking(move || run_model(&model, to_nchw_tensor(&image)))
                .await
                .map_err(|e| ProviderError::Inference(format!("inference task failed: {}", e)))??;

        debug!(classes = probabilities.len(), "Local inference complete");
        rank(&probabilities, &labels)
    }
}

fn load_labels(path: &Path) -> Result<Vec<String>, ProviderError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ProviderError::NotAvailable(format!("cannot read labels {}: {}", path.display(), e))
    })?;
    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if labels.is_empty() {
        return Err(ProviderError::NotAvailable(format!(
            "labels file {} is empty",
            path.display()
        )));
    }
    Ok(labels)
}

/// Resize, normalise with ImageNet statistics and lay out as CHW
fn to_nchw_tensor(image: &LeafImage) -> Vec<f32> {
    let resized = image.resized(MODEL_INPUT_SIZE);
    let num_pixels = (MODEL_INPUT_SIZE * MODEL_INPUT_SIZE) as usize;
    let mut data = vec![0.0f32; 3 * num_pixels];

    for (i, pixel) in resized.pixels().enumerate() {
        for c in 0..3 {
            data[c * num_pixels + i] =
                (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    data
}

fn run_model(model: &OnnxPlan, input: Vec<f32>) -> Result<Vec<f32>, ProviderError> {
    let size = MODEL_INPUT_SIZE as usize;
    let tensor: Tensor = tract_ndarray::Array4::from_shape_vec((1, 3, size, size), input)
        .map_err(|e| ProviderError::Inference(format!("bad input shape: {}", e)))?
        .into();

    let outputs = model
        .run(tvec!(tensor.into()))
        .map_err(|e| ProviderError::Inference(e.to_string()))?;
    let first = outputs
        .first()
        .ok_or_else(|| ProviderError::Inference("model produced no outputs".to_string()))?;
    let logits: Vec<f32> = first
        .to_array_view::<f32>()
        .map_err(|e| ProviderError::Inference(e.to_string()))?
        .iter()
        .copied()
        .collect();

    Ok(softmax(&logits))
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.iter().map(|e| e / sum).collect()
    } else {
        exps
    }
}

/// Pair probabilities with labels and keep the best entries
fn rank(probabilities: &[f32], labels: &[String]) -> Result<RawClassification, ProviderError> {
    if probabilities.len() != labels.len() {
        return Err(ProviderError::Inference(format!(
            "model has {} outputs but {} labels are configured",
            probabilities.len(),
            labels.len()
        )));
    }

    let entries = labels
        .iter()
        .zip(probabilities)
        .map(|(label, &p)| LabelScore::new(label.clone(), p as f64))
        .collect();

    Ok(RawClassification::ranked(entries).truncate(MAX_RANKED_ENTRIES))
}
