//! What the author reads before accepting or discarding: each completed
//! review's comments, change summary and word-level diffs against the
//! pre-review baseline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use toeflow_core::text_diff;
use toeflow_core::{
    Actor, ChangeDescriptor, DiffSegment, DocumentId, DocumentStatus, ReviewId, ReviewRequest,
    ReviewSnapshot, ReviewStatus, ReviewableField, Totals,
};
use toeflow_store::{RecordStore, ReviewFilter};

use crate::{ReviewError, Workflow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    pub field: ReviewableField,
    pub segments: Vec<DiffSegment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewFeedback {
    pub review_id: ReviewId,
    pub reviewer: Actor,
    pub comments: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub has_changes: bool,
    pub changes: Vec<ChangeDescriptor>,
    /// Only scalar fields that differ.
    pub field_diffs: Vec<FieldDiff>,
    pub totals_before: Totals,
    pub totals_after: Option<Totals>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentFeedback {
    pub document_id: DocumentId,
    pub status: DocumentStatus,
    pub baseline: ReviewSnapshot,
    pub reviews: Vec<ReviewFeedback>,
}

/// Diff every scalar field that differs between `baseline` and `candidate`.
pub fn compare(baseline: &ReviewSnapshot, candidate: &ReviewSnapshot) -> Vec<FieldDiff> {
    ReviewableField::SCALARS
        .iter()
        .filter_map(|field| {
            let before = field.text(&baseline.fields)?;
            let after = field.text(&candidate.fields)?;
            (before != after).then(|| FieldDiff {
                field: *field,
                segments: text_diff::diff(before, after),
            })
        })
        .collect()
}

fn review_feedback(baseline: &ReviewSnapshot, review: ReviewRequest) -> ReviewFeedback {
    let field_diffs = review
        .review_data
        .as_ref()
        .map(|candidate| compare(baseline, candidate))
        .unwrap_or_default();
    ReviewFeedback {
        totals_after: review.review_data.map(|data| data.totals),
        review_id: review.id,
        reviewer: review.reviewer,
        comments: review.comments,
        completed_at: review.completed_at,
        has_changes: review.has_changes,
        changes: review.changes_made,
        field_diffs,
        totals_before: baseline.totals,
    }
}

impl<S: RecordStore> Workflow<S> {
    /// Feedback from the current review cycle's completed reviews. The
    /// baseline is the pre-review version while one is held, otherwise the
    /// live document.
    pub fn feedback(&self, document_id: &DocumentId) -> Result<DocumentFeedback, ReviewError> {
        self.store().read(|t| {
            let document = t.get_document(document_id)?;
            let baseline = document
                .pre_review_version
                .as_ref()
                .map(|version| version.snapshot.clone())
                .unwrap_or_else(|| document.snapshot());
            let reviews = t
                .filter_reviews(&ReviewFilter::for_document(document_id).with_status(ReviewStatus::Completed))
                .into_iter()
                .map(|review| review_feedback(&baseline, review))
                .collect();
            Ok(DocumentFeedback {
                document_id: document.id,
                status: document.status,
                baseline,
                reviews,
            })
        })
    }
}
