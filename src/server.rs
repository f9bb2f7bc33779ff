use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use crate::handlers::{AdvisorHandler, DetectionHandler, PredictResponse};
use crate::models::{BreedSuggestion, NutritionPlan};

// Room for multipart headers and boundaries on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub struct AppState {
    pub detection: DetectionHandler,
    pub advisor: AdvisorHandler,
}

#[derive(Debug, Default, Deserialize)]
struct BreedRequest {
    #[serde(default)]
    breed: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AskRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    device: String,
    model_loaded: bool,
}

#[derive(Debug, Serialize)]
struct SuggestionsResponse {
    suggestions: Vec<BreedSuggestion>,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    answer: Vec<String>,
}

#[derive(Debug, Serialize)]
struct NutritionResponse {
    success: bool,
    plan: NutritionPlan,
    breed: String,
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.detection.limits().max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/predict", post(predict_handler))
        .route("/suggest_breeds", post(suggest_breeds_handler))
        .route("/ask", post(ask_handler))
        .route("/nutrition", post(nutrition_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// A malformed or missing JSON body is handled like a body without the field.
fn json_or_default<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            log::warn!("⚠️ Unreadable JSON body: {}", rejection.body_text());
            T::default()
        }
    }
}

async fn root_handler() -> &'static str {
    "AquaBov API is Running!"
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let loaded = state.detection.is_loaded();

    Json(HealthResponse {
        status: if loaded { "healthy" } else { "unhealthy" },
        device: state.detection.device().to_string(),
        model_loaded: loaded,
    })
}

async fn predict_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    state.detection.ensure_loaded()?;

    let mut multipart = multipart.map_err(|rejection| {
        log::warn!("⚠️ Not a multipart upload: {}", rejection.body_text());
        ApiError::BadRequest("No image uploaded".to_string())
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(&state.detection, e))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        state.detection.check_filename(filename.as_deref())?;

        let data = field
            .bytes()
            .await
            .map_err(|e| upload_error(&state.detection, e))?;

        return state
            .detection
            .predict(filename.as_deref(), data.to_vec())
            .await
            .map(Json);
    }

    Err(ApiError::BadRequest("No image uploaded".to_string()))
}

fn upload_error(detection: &DetectionHandler, error: MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        detection.too_large()
    } else {
        ApiError::BadRequest(format!("Invalid multipart upload: {}", error.body_text()))
    }
}

async fn suggest_breeds_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BreedRequest>, JsonRejection>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let request = json_or_default(payload);
    let suggestions = state
        .advisor
        .suggest_breeds(request.breed.as_deref())
        .await?;

    Ok(Json(SuggestionsResponse { suggestions }))
}

async fn ask_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let request = json_or_default(payload);
    let answer = state.advisor.ask(request.query.as_deref()).await?;

    Ok(Json(AskResponse { answer }))
}

async fn nutrition_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BreedRequest>, JsonRejection>,
) -> Response {
    let request = json_or_default(payload);

    match state.advisor.nutrition_plan(request.breed.as_deref()).await {
        Ok(plan) => Json(NutritionResponse {
            success: true,
            plan,
            breed: request.breed.unwrap_or_default(),
        })
        .into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadLimits;
    use crate::handlers::advisor::tests::StubGenerator;
    use crate::handlers::detection::tests::{gir_detection, png_bytes, StubDetector};
    use crate::models::AiReply;
    use crate::services::{Detector, GeminiService, TextGenerator};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "AQUABOVBOUNDARY";

    fn app(
        detector: Option<Arc<dyn Detector>>,
        ai: Arc<dyn TextGenerator>,
        limits: UploadLimits,
    ) -> Router {
        create_router(AppState {
            detection: DetectionHandler::new(detector, limits),
            advisor: AdvisorHandler::new(ai),
        })
    }

    fn stub_app(detections: Vec<crate::models::Detection>, reply: AiReply) -> Router {
        app(
            Some(Arc::new(StubDetector { detections })),
            StubGenerator::new(reply),
            UploadLimits::default(),
        )
    }

    fn upload(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_root() {
        let app = stub_app(vec![], AiReply::Text(String::new()));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        assert_eq!(&bytes[..], b"AquaBov API is Running!");
    }

    #[tokio::test]
    async fn test_health_reports_model_state() {
        let request = || Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(stub_app(vec![], AiReply::Text(String::new())), request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy", "device": "stub", "model_loaded": true}));

        let unloaded = app(None, StubGenerator::new(AiReply::Text(String::new())), UploadLimits::default());
        let (_, body) = send(unloaded, request()).await;
        assert_eq!(body, json!({"status": "unhealthy", "device": "none", "model_loaded": false}));
    }

    #[tokio::test]
    async fn test_predict_success() {
        let app = stub_app(vec![gir_detection()], AiReply::Text(String::new()));

        let (status, body) = send(app, upload("image", "cow.png", &png_bytes(16, 16))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["breed"], "Gir");
        assert_eq!(body["confidence"], 0.91);
        assert_eq!(body["width_cm"], 55.56);
        assert_eq!(body["height_cm"], 33.33);
        assert!(body["message"].as_str().unwrap().starts_with("✅"));
    }

    #[tokio::test]
    async fn test_predict_without_detections_is_soft_message() {
        let app = stub_app(vec![], AiReply::Text(String::new()));

        let (status, body) = send(app, upload("image", "cow.jpeg", &png_bytes(16, 16))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"message": "⚠️ Could not confidently identify the breed. Try a clearer image."})
        );
    }

    #[tokio::test]
    async fn test_predict_rejects_text_file() {
        let app = stub_app(vec![gir_detection()], AiReply::Text(String::new()));

        let (status, body) = send(app, upload("image", "cow.txt", b"moo")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": "Invalid file format. Only PNG, JPG, JPEG allowed."})
        );
    }

    #[tokio::test]
    async fn test_predict_without_image_field() {
        let app = stub_app(vec![gir_detection()], AiReply::Text(String::new()));

        let (status, body) = send(app, upload("photo", "cow.png", &png_bytes(4, 4))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No image uploaded"}));
    }

    #[tokio::test]
    async fn test_predict_rejects_oversized_upload() {
        let limits = UploadLimits {
            max_upload_bytes: 100,
            ..UploadLimits::default()
        };
        let app = app(
            Some(Arc::new(StubDetector { detections: vec![] })),
            StubGenerator::new(AiReply::Text(String::new())),
            limits,
        );

        let (status, body) = send(app, upload("image", "cow.png", &[0u8; 500])).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].as_str().unwrap().starts_with("File too large"));
    }

    #[tokio::test]
    async fn test_predict_body_over_stream_limit() {
        let limits = UploadLimits {
            max_upload_bytes: 100,
            ..UploadLimits::default()
        };
        let app = app(
            Some(Arc::new(StubDetector { detections: vec![] })),
            StubGenerator::new(AiReply::Text(String::new())),
            limits,
        );

        let (status, body) = send(app, upload("image", "cow.png", &vec![0u8; 300 * 1024])).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body,
            json!({"error": "File too large. Maximum size is 100 bytes."})
        );
    }

    #[tokio::test]
    async fn test_predict_rejects_non_multipart_body() {
        let app = stub_app(vec![gir_detection()], AiReply::Text(String::new()));

        let (status, body) = send(app, post_json("/predict", json!({"image": "cow.png"}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No image uploaded"}));
    }

    #[tokio::test]
    async fn test_predict_without_model() {
        let app = app(None, StubGenerator::new(AiReply::Text(String::new())), UploadLimits::default());

        let (status, body) = send(app, upload("image", "cow.png", &png_bytes(4, 4))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Model not loaded"}));
    }

    #[tokio::test]
    async fn test_ask_empty_query() {
        let app = stub_app(vec![], AiReply::Text("unused".into()));

        let (status, body) = send(app, post_json("/ask", json!({"query": ""}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Query cannot be empty"}));
    }

    #[tokio::test]
    async fn test_ask_returns_bullets() {
        let app = stub_app(vec![], AiReply::Text("Feed green fodder.\n\nProvide shade.".into()));

        let (status, body) = send(app, post_json("/ask", json!({"query": "Summer care?"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"answer": ["• Feed green fodder.", "• Provide shade."]}));
    }

    #[tokio::test]
    async fn test_suggest_breeds_success() {
        let reply = AiReply::Suggestions(json!([
            {"breed": "Sahiwal", "benefit": "Heat tolerance"},
            {"breed": "Jersey", "benefit": "Butterfat"}
        ]));
        let app = stub_app(vec![], reply);

        let (status, body) = send(app, post_json("/suggest_breeds", json!({"breed": "Gir"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suggestions"][1], json!({"breed": "Jersey", "benefit": "Butterfat"}));
    }

    #[tokio::test]
    async fn test_suggest_breeds_with_unreachable_endpoint() {
        let gemini = GeminiService::new(
            Some("test_key".to_string()),
            "gemini-test".to_string(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();
        let app = app(
            Some(Arc::new(StubDetector { detections: vec![] })),
            Arc::new(gemini),
            UploadLimits::default(),
        );

        let (status, body) = send(app, post_json("/suggest_breeds", json!({"breed": "Gir"}))).await;

        assert!(status.is_server_error());
        assert!(body.get("error").is_some());
    }

    #[tokio::test]
    async fn test_suggest_breeds_without_body() {
        let app = stub_app(vec![], AiReply::Text("unused".into()));
        let request = Request::builder()
            .method("POST")
            .uri("/suggest_breeds")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No breed provided"}));
    }

    #[tokio::test]
    async fn test_nutrition_success_mixes_defaults() {
        let reply = AiReply::Text("Forage:\n- Name: Napier Grass\n- Amount: 10 kg/day\n".into());
        let app = stub_app(vec![], reply);

        let (status, body) = send(app, post_json("/nutrition", json!({"breed": "Gir"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["breed"], "Gir");
        assert_eq!(
            body["plan"]["forage"],
            json!({
                "name": "Napier Grass",
                "amount": "10 kg/day",
                "description": "High-quality forage for digestive health"
            })
        );
        assert_eq!(body["plan"]["supplement"]["name"], "Mineral Mix");
    }

    #[tokio::test]
    async fn test_nutrition_failures() {
        let app = stub_app(vec![], AiReply::Error("Gemini API key not found".into()));
        let (status, body) = send(app, post_json("/nutrition", json!({"breed": "Gir"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"success": false, "error": "AI service error", "details": "Gemini API key not found"})
        );

        let app = stub_app(vec![], AiReply::Text("unused".into()));
        let (status, body) = send(app, post_json("/nutrition", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "error": "Breed not provided"}));
    }
}
