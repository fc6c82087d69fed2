//! Leaf upload and prediction endpoint

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::catalog;
use crate::confidence;
use crate::db::ScanRecord;
use crate::image_input::{self, ImageInfo, LeafImage, MAX_UPLOAD_BYTES};
use crate::knowledge::Treatment;
use crate::types::{Alternate, Prediction};
use crate::{ApiError, ApiResult, AppState};

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// Request body cap; leaves room for multipart framing so that slightly
/// oversized images still get a descriptive 400
const MAX_REQUEST_BYTES: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: PredictionBody,
    pub details: DetailsBody,
    pub image_info: ImageInfo,
}

#[derive(Debug, Serialize)]
pub struct PredictionBody {
    pub disease_id: String,
    pub disease: String,
    pub crop: String,
    pub confidence: f64,
    pub confidence_percent: f64,
    pub raw_label: String,
    /// Provider identifier or `fallback`
    pub source: String,
    pub alternates: Vec<Alternate>,
}

#[derive(Debug, Serialize)]
pub struct DetailsBody {
    pub description: String,
    pub treatment: Vec<Treatment>,
    pub prevention: Vec<String>,
}

struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<PredictResponse>> {
    let upload = read_upload(multipart).await?;
    image_input::validate_upload(upload.content_type.as_deref(), upload.bytes.len())?;

    let size_kb = (upload.bytes.len() as f64 / 1024.0 * 100.0).round() / 100.0;

    // Decoding is CPU-bound
    let image = tokio::task::spawn_blocking(move || LeafImage::decode(&upload.bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("decode task failed: {}", e)))??;

    let Prediction {
        outcome,
        prediction,
    } = state.orchestrator.predict_image(&image).await?;

    let disease = catalog::get(&prediction.disease_id).ok_or_else(|| {
        ApiError::Internal(format!("'{}' is not a catalog id", prediction.disease_id))
    })?;
    let Some(info) = state.knowledge.lookup(disease.id) else {
        error!(disease_id = disease.id, "Knowledge base has no entry for catalog id");
        return Err(ApiError::Internal(format!(
            "no knowledge base entry for '{}'",
            disease.id
        )));
    };

    let source = outcome.source().to_string();
    info!(
        disease_id = %prediction.disease_id,
        source = %source,
        confidence = prediction.confidence,
        filename = upload.filename.as_deref().unwrap_or("-"),
        "Leaf analysed"
    );

    let record = ScanRecord {
        disease_id: prediction.disease_id.clone(),
        disease_name: disease.name.to_string(),
        crop: disease.crop.to_string(),
        confidence: prediction.confidence,
        source: source.clone(),
        image_filename: upload.filename,
        image_size_kb: Some(size_kb),
    };
    let recorder = state.recorder.clone();
    tokio::spawn(async move {
        if let Err(e) = recorder.record(record).await {
            warn!(error = %e, "Failed to record scan");
        }
    });

    Ok(Json(PredictResponse {
        success: true,
        prediction: PredictionBody {
            confidence_percent: confidence::as_percent(prediction.confidence),
            disease_id: prediction.disease_id,
            disease: disease.name.to_string(),
            crop: disease.crop.to_string(),
            confidence: prediction.confidence,
            raw_label: prediction.raw_label,
            source,
            alternates: prediction.alternates,
        },
        details: DetailsBody {
            description: info.description,
            treatment: info.treatment,
            prevention: info.prevention,
        },
        image_info: image.info(),
    }))
}

/// Pull the `file` field out of the multipart body
async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        return Ok(Upload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}

pub fn predict_routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
}
