//! HTTP surface.

mod docs;
mod render;
mod users;

use axum::{
    extract::{DefaultBodyLimit, FromRequest, State},
    response::Json,
    routing::get,
    Router,
};
use shared::HealthResponse;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// JSON body extractor whose rejections use the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.body_limit_bytes();
    Router::new()
        .route("/health", get(health))
        .merge(docs::routes())
        .merge(users::routes())
        .merge(render::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(_state): State<AppState>) -> Json<HealthResponse> {
    info!("GET /health");
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
