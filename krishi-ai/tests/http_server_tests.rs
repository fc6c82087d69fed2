//! HTTP Server & Routing Integration Tests
//!
//! Drives the full router with `oneshot`, a temporary SQLite database and the
//! bundled knowledge base.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use krishi_ai::db::{init_database_pool, SqliteScanRecorder};
use krishi_ai::knowledge::{DiseaseInfo, KnowledgeBase, StaticKnowledgeBase};
use krishi_ai::types::{ClassificationProvider, LabelScore, ProviderError, RawClassification};
use krishi_ai::image_input::LeafImage;
use krishi_ai::{build_router, fallback, AppState, AttemptPolicy, Orchestrator};
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "krishi-test-boundary";

struct FixedProvider;

#[async_trait::async_trait]
impl ClassificationProvider for FixedProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn classify(&self, _image: &LeafImage) -> Result<RawClassification, ProviderError> {
        Ok(RawClassification::ranked(vec![
            LabelScore::new("Tomato___Late_blight", 0.93),
            LabelScore::new("Tomato___Early_blight", 0.05),
        ]))
    }
}

/// Knowledge base that knows nothing
struct EmptyKnowledge;

impl KnowledgeBase for EmptyKnowledge {
    fn lookup(&self, _disease_id: &str) -> Option<DiseaseInfo> {
        None
    }
}

/// Router plus the temp dir keeping its database alive
async fn test_app(providers: Vec<Arc<dyn ClassificationProvider>>) -> (Router, TempDir) {
    test_app_with(providers, Arc::new(StaticKnowledgeBase::bundled().unwrap())).await
}

async fn test_app_with(
    providers: Vec<Arc<dyn ClassificationProvider>>,
    knowledge: Arc<dyn KnowledgeBase>,
) -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let pool = init_database_pool(&dir.path().join("krishi.db")).await.unwrap();

    let orchestrator = Orchestrator::new(
        providers,
        AttemptPolicy {
            warmup_retry_delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(5),
        },
    );
    let state = AppState::new(
        Arc::new(orchestrator),
        knowledge,
        Arc::new(SqliteScanRecorder::new(pool)),
    );
    (build_router(state), dir)
}

fn leaf_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(40, 30, Rgb([60, 120, 40]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn multipart_request(field: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"leaf.png\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

/// Scan recording is fire-and-forget; wait for it to land
async fn wait_for_history(app: &Router, expected: usize) -> Value {
    for _ in 0..50 {
        let (_, body) = get(app, "/history").await;
        if body["total"].as_u64() == Some(expected as u64) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("history never reached {} scans", expected);
}

#[tokio::test]
async fn health_reports_provider_order() {
    let (app, _dir) = test_app(vec![Arc::new(FixedProvider)]).await;
    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "krishi-ai");
    assert_eq!(body["providers"], serde_json::json!(["fixed"]));
}

#[tokio::test]
async fn diseases_lists_catalog() {
    let (app, _dir) = test_app(vec![]).await;
    let (status, body) = get(&app, "/diseases").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 15);
    let ids: Vec<&str> = body["diseases"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"tomato_late_blight"));
    assert!(ids.contains(&"healthy_leaf"));
}

#[tokio::test]
async fn predict_with_provider() {
    let (app, _dir) = test_app(vec![Arc::new(FixedProvider)]).await;
    let (status, body) = send(&app, multipart_request("file", "image/png", &leaf_png())).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);

    let prediction = &body["prediction"];
    assert_eq!(prediction["disease_id"], "tomato_late_blight");
    assert_eq!(prediction["disease"], "Late Blight");
    assert_eq!(prediction["crop"], "Tomato");
    assert_eq!(prediction["confidence"], 0.93);
    assert_eq!(prediction["confidence_percent"], 93.0);
    assert_eq!(prediction["raw_label"], "Tomato___Late_blight");
    assert_eq!(prediction["source"], "fixed");
    assert_eq!(prediction["alternates"].as_array().unwrap().len(), 2);

    assert!(!body["details"]["treatment"].as_array().unwrap().is_empty());
    assert_eq!(body["image_info"]["original_width"], 40);
    assert_eq!(body["image_info"]["original_height"], 30);
    assert_eq!(body["image_info"]["format"], "PNG");

    let history = wait_for_history(&app, 1).await;
    assert_eq!(history["scans"][0]["disease_id"], "tomato_late_blight");
    assert_eq!(history["scans"][0]["source"], "fixed");
    assert_eq!(history["scans"][0]["image_filename"], "leaf.png");
}

#[tokio::test]
async fn predict_without_providers_uses_fallback() {
    let (app, _dir) = test_app(vec![]).await;
    let bytes = leaf_png();
    let expected = fallback::predict(&bytes);

    let (status, body) = send(&app, multipart_request("file", "image/png", &bytes)).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["prediction"]["source"], "fallback");
    assert_eq!(body["prediction"]["disease_id"], expected.disease_id.as_str());
    assert_eq!(body["prediction"]["confidence"], expected.confidence);

    // Same bytes, same answer
    let (_, again) = send(&app, multipart_request("file", "image/png", &bytes)).await;
    assert_eq!(again["prediction"], body["prediction"]);
}

#[tokio::test]
async fn predict_rejects_bad_uploads() {
    let (app, _dir) = test_app(vec![]).await;

    let (status, body) = send(&app, multipart_request("file", "application/pdf", b"%PDF")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_IMAGE");

    let (status, body) = send(&app, multipart_request("file", "image/jpeg", b"leaf.jpg")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_IMAGE");

    let (status, _) = send(&app, multipart_request("file", "image/png", b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, multipart_request("photo", "image/png", &leaf_png())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn history_limit_validated() {
    let (app, _dir) = test_app(vec![]).await;

    let (status, body) = get(&app, "/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, _) = get(&app, "/history?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/history?limit=101").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/history?limit=100").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn stats_count_by_disease() {
    let (app, _dir) = test_app(vec![Arc::new(FixedProvider)]).await;
    for _ in 0..2 {
        let (status, _) = send(&app, multipart_request("file", "image/png", &leaf_png())).await;
        assert_eq!(status, StatusCode::OK);
    }
    wait_for_history(&app, 2).await;

    let (status, body) = get(&app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_scans"], 2);
    assert_eq!(body["diseases"][0]["disease_id"], "tomato_late_blight");
    assert_eq!(body["diseases"][0]["scan_count"], 2);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (app, _dir) = test_app(vec![]).await;
    let (status, _) = get(&app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn predict_without_knowledge_entry_is_internal_error() {
    let (app, _dir) = test_app_with(vec![Arc::new(FixedProvider)], Arc::new(EmptyKnowledge)).await;

    let (status, body) = send(&app, multipart_request("file", "image/png", &leaf_png())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("tomato_late_blight"));

    let (_, history) = get(&app, "/history").await;
    assert_eq!(history["total"], 0);
}
