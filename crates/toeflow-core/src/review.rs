//! Review requests fanned out to individual reviewers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::changes::ChangeDescriptor;
use crate::document::{Actor, DocumentId, ReviewSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(String);

impl ReviewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReviewId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Completed,
    Archived,
}

impl ReviewStatus {
    /// A review is resolved once it has left `pending`.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Archived => "archived",
        })
    }
}

/// One reviewer's task against one document.
///
/// Siblings share a `document_id`; the request does not own the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub id: ReviewId,
    pub document_id: DocumentId,
    pub requester: Actor,
    pub reviewer: Actor,
    pub status: ReviewStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub review_data: Option<ReviewSnapshot>,
    #[serde(default)]
    pub changes_made: Vec<ChangeDescriptor>,
    #[serde(default)]
    pub has_changes: bool,
}

impl ReviewRequest {
    pub fn new(
        document_id: DocumentId,
        requester: &Actor,
        reviewer: &Actor,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReviewId::generate(),
            document_id,
            requester: requester.clone(),
            reviewer: reviewer.clone(),
            status: ReviewStatus::Pending,
            requested_at,
            completed_at: None,
            comments: String::new(),
            review_data: None,
            changes_made: Vec::new(),
            has_changes: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReviewStatus::Pending
    }

    /// Completed in the current cycle and proposing edits.
    pub fn proposes_changes(&self) -> bool {
        self.status == ReviewStatus::Completed && self.has_changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_is_pending() {
        let author = Actor::new("a@firm.example", "A");
        let reviewer = Actor::new("r@firm.example", "R");
        let req = ReviewRequest::new(DocumentId::new("doc-1"), &author, &reviewer, Utc::now());
        assert!(req.is_pending());
        assert!(!req.status.is_resolved());
        assert!(!req.proposes_changes());
        assert!(req.completed_at.is_none());
    }

    #[test]
    fn resolved_statuses() {
        assert!(ReviewStatus::Completed.is_resolved());
        assert!(ReviewStatus::Archived.is_resolved());
        assert_eq!(ReviewStatus::Archived.to_string(), "archived");
    }
}
