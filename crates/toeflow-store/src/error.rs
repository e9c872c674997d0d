use thiserror::Error;
use toeflow_core::{DocumentId, ReviewId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("review request not found: {0}")]
    ReviewNotFound(ReviewId),

    #[error("record already exists: {0}")]
    Duplicate(String),

    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
