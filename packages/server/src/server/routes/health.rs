use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    services: ServicesHealth,
}

#[derive(Serialize)]
pub struct ServicesHealth {
    #[serde(rename = "self")]
    api: String,
    downstream: String,
}

/// Health check endpoint
///
/// Checks the inference backend alongside the API itself.
/// Returns 200 OK when both are healthy, 503 Service Unavailable when the
/// backend is unreachable (the API still answers, so callers can tell the
/// two failure modes apart).
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let downstream_healthy = state.inference.is_healthy().await;

    let (status_code, overall) = if downstream_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall.to_string(),
            services: ServicesHealth {
                api: "ok".to_string(),
                downstream: if downstream_healthy {
                    "ok".to_string()
                } else {
                    "unavailable".to_string()
                },
            },
        }),
    )
}
