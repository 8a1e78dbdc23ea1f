use crate::config::Config;
use crate::errors::AppError;
use crate::models::{
    ErrorResponse, HealthResponse, LoanApplication, PredictionResult, RiskLevel, RiskScore,
};
use crate::predictor::Predictor;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Preprocessing and inference pipeline around the loaded model.
    pub predictor: Predictor,
}

#[derive(OpenApi)]
#[openapi(
    paths(home, health, predict),
    components(schemas(
        LoanApplication,
        PredictionResult,
        RiskScore,
        RiskLevel,
        ErrorResponse,
        HealthResponse
    ))
)]
pub struct ApiDoc;

/// Liveness check.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn home() -> &'static str {
    "Model API is running!"
}

/// Health check endpoint.
///
/// Reports the service version and which model is serving predictions.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let model = state.predictor.model();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model: model.name().to_string(),
            features: model.schema().len(),
        }),
    )
}

/// POST /predict
///
/// Scores one loan application. The body is parsed by hand so that malformed
/// JSON is reported through the same `{"error": ...}` envelope as every other
/// failure.
#[utoipa::path(
    post,
    path = "/predict",
    request_body = LoanApplication,
    responses(
        (status = 200, description = "Prediction computed", body = PredictionResult),
        (status = 400, description = "Missing column, bad date or invalid value", body = ErrorResponse),
        (status = 413, description = "Request body exceeds MAX_BODY_BYTES", body = ErrorResponse),
        (status = 500, description = "Unexpected failure", body = ErrorResponse)
    )
)]
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictionResult>, AppError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    })?;
    tracing::info!("POST /predict - {} bytes", body.len());

    let record: serde_json::Value = serde_json::from_slice(&body)?;
    let result = state.predictor.predict_record(&record)?;

    Ok(Json(result))
}

/// GET /api-docs/openapi.json
pub async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the HTTP router with tracing, CORS and a request size limit.
pub fn router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/api-docs/openapi.json", get(openapi_spec))
        .layer(
            ServiceBuilder::new()
                // Oversized bodies surface as a rejection in `predict`
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
