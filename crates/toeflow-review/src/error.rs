use thiserror::Error;
use toeflow_core::{DocumentId, FieldError, ReviewId, ReviewStatus, SessionError, TransitionError};
use toeflow_store::StoreError;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("cannot send for review: document {document} has {pending} pending review request(s)")]
    ReviewsOutstanding { document: DocumentId, pending: usize },

    #[error("at least one reviewer is required")]
    EmptyReviewerSet,

    #[error("review {review} is already {status}")]
    StaleSubmission { review: ReviewId, status: ReviewStatus },

    #[error("{actor} is not the assigned reviewer for review {review}")]
    NotAssignedReviewer { review: ReviewId, actor: String },

    #[error("document {0} is signed and cannot be deleted")]
    DocumentSigned(DocumentId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    InvalidField(#[from] FieldError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReviewError {
    /// Rejections of a lifecycle move, including fan-out while reviews are pending.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition(_) | Self::ReviewsOutstanding { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::DocumentNotFound(_) | StoreError::ReviewNotFound(_))
        )
    }
}
