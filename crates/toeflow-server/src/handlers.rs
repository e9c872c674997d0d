//! Route handlers. Each one resolves the acting identity from headers and
//! hands it to the workflow explicitly.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use toeflow_core::{
    Actor, Document, DocumentId, NewDocument, ReviewId, ReviewRequest, ReviewableFields,
};
use toeflow_review::{
    DocumentEdit, DocumentFeedback, FanOut, Reconciliation, SubmitOutcome,
};
use toeflow_store::{Order, RecordStore};

use crate::error::ApiResult;
use crate::identity::Acting;
use crate::state::AppState;

// ── Documents ──

pub async fn list_documents<S: RecordStore>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.workflow.documents(Order::CreatedDesc)?))
}

pub async fn create_document<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
    Json(draft): Json<NewDocument>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let document = state.workflow.create_document(draft, &actor)?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn get_document<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.workflow.document(&DocumentId::new(id))?))
}

pub async fn update_document<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
    Path(id): Path<String>,
    Json(edit): Json<DocumentEdit>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.workflow.edit_document(&DocumentId::new(id), edit, &actor)?))
}

pub async fn delete_document<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.workflow.delete_document(&DocumentId::new(id), &actor)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn send_document<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.workflow.mark_sent(&DocumentId::new(id), &actor)?))
}

pub async fn sign_document<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.workflow.mark_signed(&DocumentId::new(id), &actor)?))
}

pub async fn expire_document<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.workflow.mark_expired(&DocumentId::new(id), &actor)?))
}

// ── Reviews ──

#[derive(Debug, Deserialize)]
pub struct ReviewerBody {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestReviewsBody {
    pub reviewers: Vec<ReviewerBody>,
}

pub async fn request_reviews<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
    Path(id): Path<String>,
    Json(body): Json<RequestReviewsBody>,
) -> ApiResult<(StatusCode, Json<FanOut>)> {
    let reviewers: Vec<Actor> = body
        .reviewers
        .into_iter()
        .map(|r| {
            let name = if r.name.is_empty() { r.email.clone() } else { r.name };
            Actor::new(r.email, name)
        })
        .collect();
    let fan_out = state
        .workflow
        .request_reviews(&DocumentId::new(id), &reviewers, &actor)?;
    Ok((StatusCode::CREATED, Json(fan_out)))
}

pub async fn list_reviews<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ReviewRequest>>> {
    Ok(Json(state.workflow.reviews_for_document(&DocumentId::new(id))?))
}

pub async fn feedback<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DocumentFeedback>> {
    Ok(Json(state.workflow.feedback(&DocumentId::new(id))?))
}

pub async fn pending_reviews<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
) -> ApiResult<Json<Vec<ReviewRequest>>> {
    Ok(Json(state.workflow.awaiting_review(&actor)?))
}

pub async fn get_review<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReviewRequest>> {
    Ok(Json(state.workflow.review(&ReviewId::new(id))?))
}

/// A reviewer's candidate fields. Omitting `fields` approves the document as is.
#[derive(Debug, Deserialize)]
pub struct SubmitReviewBody {
    #[serde(default)]
    pub fields: Option<ReviewableFields>,
    #[serde(default)]
    pub comments: String,
}

pub async fn submit_review<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
    Path(id): Path<String>,
    Json(body): Json<SubmitReviewBody>,
) -> ApiResult<Json<SubmitOutcome>> {
    let review_id = ReviewId::new(id);
    let mut session = state.workflow.open_session(&review_id, &actor)?;
    if let Some(fields) = body.fields {
        session.replace_fields(fields)?;
    }
    let submission = session.submit(body.comments)?;
    Ok(Json(state.workflow.submit_review(&review_id, submission, &actor)?))
}

pub async fn accept_review<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
    Path(id): Path<String>,
) -> ApiResult<Json<Reconciliation>> {
    Ok(Json(state.workflow.accept_review(&DocumentId::new(id), &actor)?))
}

pub async fn discard_review<S: RecordStore>(
    State(state): State<AppState<S>>,
    Acting(actor): Acting,
    Path(id): Path<String>,
) -> ApiResult<Json<Reconciliation>> {
    Ok(Json(state.workflow.discard_review(&DocumentId::new(id), &actor)?))
}
