use std::path::Path;
use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use frontend_core::{HealthReport, InstanceStatus, ServiceBanner};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    /// Name reported by `/health`, lower-cased service name.
    service_label: Arc<str>,
    metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(service_name: &str, metrics: PrometheusHandle) -> Self {
        Self {
            service_label: service_name.to_lowercase().into(),
            metrics,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health_check, actuator_health, service_banner),
    components(schemas(HealthReport, InstanceStatus, ServiceBanner))
)]
struct ApiDoc;

/// Health, diagnostics and the single-page app. Paths without a route or a
/// matching file under `static_dir` get the app's `index.html` so client-side
/// routing can take over.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/health", get(health_check))
        .route("/actuator/health", get(actuator_health))
        .route("/test", get(service_banner))
        .route("/metrics", get(render_metrics))
        .route("/api-docs/openapi.json", get(openapi_json))
        .fallback_service(spa)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Instance is up", body = HealthReport))
)]
async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport::up().with_service(&*state.service_label))
}

#[utoipa::path(
    get,
    path = "/actuator/health",
    responses((status = 200, description = "Instance is up", body = HealthReport))
)]
async fn actuator_health() -> Json<HealthReport> {
    Json(HealthReport::up())
}

#[utoipa::path(
    get,
    path = "/test",
    responses((status = 200, description = "Liveness banner", body = ServiceBanner))
)]
async fn service_banner() -> Json<ServiceBanner> {
    Json(ServiceBanner {
        message: "Frontend Service is running".to_string(),
    })
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
