//! API router.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use toeflow_review::Workflow;
use toeflow_store::RecordStore;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn router<S: RecordStore + 'static>(workflow: Arc<Workflow<S>>) -> Router {
    Router::new()
        // Documents
        .route(
            "/documents",
            get(handlers::list_documents::<S>).post(handlers::create_document::<S>),
        )
        .route(
            "/documents/:id",
            get(handlers::get_document::<S>)
                .patch(handlers::update_document::<S>)
                .delete(handlers::delete_document::<S>),
        )
        .route("/documents/:id/send", post(handlers::send_document::<S>))
        .route("/documents/:id/sign", post(handlers::sign_document::<S>))
        .route("/documents/:id/expire", post(handlers::expire_document::<S>))
        // Review cycle
        .route(
            "/documents/:id/reviews",
            get(handlers::list_reviews::<S>).post(handlers::request_reviews::<S>),
        )
        .route("/documents/:id/feedback", get(handlers::feedback::<S>))
        .route("/documents/:id/accept-review", post(handlers::accept_review::<S>))
        .route("/documents/:id/discard-review", post(handlers::discard_review::<S>))
        .route("/reviews/pending", get(handlers::pending_reviews::<S>))
        .route("/reviews/:id", get(handlers::get_review::<S>))
        .route("/reviews/:id/submit", post(handlers::submit_review::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(workflow))
}
