//! Reviewer notification hook.
//!
//! Delivery (email, chat) is outside this crate; the workflow only reports
//! each newly created review request once its fan-out has committed.

use toeflow_core::ReviewRequest;
use tracing::info;

pub trait ReviewNotifier: Send + Sync {
    fn review_requested(&self, review: &ReviewRequest);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ReviewNotifier for NoopNotifier {
    fn review_requested(&self, _review: &ReviewRequest) {}
}

/// Logs each request through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ReviewNotifier for LogNotifier {
    fn review_requested(&self, review: &ReviewRequest) {
        info!(
            review = %review.id,
            document = %review.document_id,
            reviewer = %review.reviewer.id,
            requester = %review.requester.id,
            "review requested"
        );
    }
}
