//! HTTP handlers. Every response is JSON; storage failures become
//! `500 { error }`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::metrics;
use crate::queries;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn storage_error(route: &str, e: sqlx::Error) -> Response {
    error!(route, "storage error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn dashboard_handler(State(state): State<Arc<AppState>>) -> Response {
    match queries::load_dashboard(&state.pool).await {
        Ok(data) => Json(metrics::build_dashboard(&data)).into_response(),
        Err(e) => storage_error("/dashboard", e),
    }
}

async fn insights_handler(State(state): State<Arc<AppState>>) -> Response {
    match queries::insights(&state.pool).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => storage_error("/insights", e),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    // CORS for the dashboard frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/insights", get(insights_handler))
        .layer(cors)
        .with_state(state)
}
