use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/render/{identifier}", get(render_document))
}

/// Public read-only HTML view of a document.
async fn render_document(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Response> {
    info!("GET /render/{}", identifier);
    let response = match state.docs.get(&identifier).await? {
        Some(doc) => Html(shared::render::render_page(&doc)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("Documentation {identifier} not found."),
        )
            .into_response(),
    };
    Ok(response)
}
