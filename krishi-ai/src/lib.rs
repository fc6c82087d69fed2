//! krishi-ai library interface
//!
//! Crop-leaf disease inference: uploaded leaf images are classified by the
//! first available provider and answered in one canonical disease vocabulary,
//! with a deterministic offline predictor when no provider answers.

pub mod api;
pub mod catalog;
pub mod confidence;
pub mod db;
pub mod error;
pub mod fallback;
pub mod image_input;
pub mod knowledge;
pub mod orchestrator;
pub mod providers;
pub mod taxonomy;
pub mod types;

pub use crate::error::{ApiError, ApiResult};
pub use crate::orchestrator::{AttemptPolicy, Orchestrator, PredictError};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::ScanRecorder;
use crate::knowledge::KnowledgeBase;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub knowledge: Arc<dyn KnowledgeBase>,
    pub recorder: Arc<dyn ScanRecorder>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        knowledge: Arc<dyn KnowledgeBase>,
        recorder: Arc<dyn ScanRecorder>,
    ) -> Self {
        Self {
            orchestrator,
            knowledge,
            recorder,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::disease_routes())
        .merge(api::predict_routes())
        .merge(api::history_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
