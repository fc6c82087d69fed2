//! Catalog listing

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::catalog;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DiseaseSummary {
    pub id: &'static str,
    pub disease: &'static str,
    pub crop: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiseasesResponse {
    pub total: usize,
    pub diseases: Vec<DiseaseSummary>,
}

/// GET /diseases
pub async fn list_diseases() -> Json<DiseasesResponse> {
    let diseases: Vec<DiseaseSummary> = catalog::CATALOG
        .iter()
        .map(|d| DiseaseSummary {
            id: d.id,
            disease: d.name,
            crop: d.crop,
        })
        .collect();

    Json(DiseasesResponse {
        total: diseases.len(),
        diseases,
    })
}

pub fn disease_routes() -> Router<AppState> {
    Router::new().route("/diseases", get(list_diseases))
}
