use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use shared::access::{authorize, Action};
use shared::{Caller, Document, DocumentDraft, DocumentSummary, DocumentUpdate, Envelope};
use tracing::{info, warn};

use super::ApiJson;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/docs", get(list_documents).post(create_document))
        .route("/api/docs/id/{identifier}", get(get_document))
        .route(
            "/api/docs/{identifier}",
            put(update_document).delete(delete_document),
        )
}

fn missing(identifier: &str) -> ApiError {
    ApiError::not_found(format!("Document {identifier} not found"))
}

fn permit(caller: &Caller, action: Action, doc: Option<&Document>) -> ApiResult<()> {
    let owner = doc.and_then(|d| d.created_by.as_deref());
    authorize(caller, action, owner).map_err(|denied| {
        warn!(
            "{:?} by {} ({}) denied: {}",
            action, caller.user_id, caller.role, denied
        );
        ApiError::from(denied)
    })
}

async fn load(state: &AppState, identifier: &str) -> ApiResult<Document> {
    state
        .docs
        .get(identifier)
        .await?
        .ok_or_else(|| missing(identifier))
}

async fn list_documents(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> ApiResult<Json<Envelope<Vec<DocumentSummary>>>> {
    info!("GET /api/docs");
    let summaries = state.docs.list().await?;
    let total = summaries.len();
    Ok(Json(Envelope::ok(summaries).with_total(total)))
}

async fn get_document(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(identifier): Path<String>,
) -> ApiResult<Json<Envelope<Document>>> {
    info!("GET /api/docs/id/{}", identifier);
    let doc = load(&state, &identifier).await?;
    Ok(Json(Envelope::ok(doc)))
}

async fn create_document(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(draft): ApiJson<DocumentDraft>,
) -> ApiResult<(StatusCode, Json<Envelope<Document>>)> {
    info!("POST /api/docs {}", draft.identifier);
    permit(&caller, Action::Create, None)?;
    draft.validate()?;

    let doc = draft.into_document(Some(caller.user_id), Utc::now());
    let doc = state.docs.insert(doc).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(doc).with_message("Document created successfully")),
    ))
}

async fn update_document(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(identifier): Path<String>,
    ApiJson(update): ApiJson<DocumentUpdate>,
) -> ApiResult<Json<Envelope<Document>>> {
    info!("PUT /api/docs/{}", identifier);
    let mut doc = load(&state, &identifier).await?;
    permit(&caller, Action::Update, Some(&doc))?;

    if let Some(requested) = update.identifier.as_deref() {
        if requested.trim() != identifier {
            return Err(ApiError::validation(format!(
                "Identifier {} does not match document {identifier}",
                requested.trim()
            )));
        }
    }
    update.apply(&mut doc, Utc::now())?;

    let doc = state
        .docs
        .replace(doc)
        .await?
        .ok_or_else(|| missing(&identifier))?;
    Ok(Json(
        Envelope::ok(doc).with_message("Document updated successfully"),
    ))
}

async fn delete_document(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(identifier): Path<String>,
) -> ApiResult<Json<Envelope<Document>>> {
    info!("DELETE /api/docs/{}", identifier);
    let doc = load(&state, &identifier).await?;
    permit(&caller, Action::Delete, Some(&doc))?;

    let removed = state
        .docs
        .delete(&identifier)
        .await?
        .ok_or_else(|| missing(&identifier))?;
    Ok(Json(
        Envelope::ok(removed).with_message("Document deleted successfully"),
    ))
}
