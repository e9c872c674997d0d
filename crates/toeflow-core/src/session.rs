//! A reviewer's private working copy of a document.
//!
//! A session is seeded from the live document, edited in isolation, and
//! submitted once. The change summary is recomputed after every edit so the
//! caller always has a current count to show.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::changes::{ChangeDescriptor, summarize};
use crate::config::ReviewConfig;
use crate::document::{
    Document, DocumentId, FeeLineItem, FieldError, ReviewSnapshot, ReviewableFields,
};
use crate::review::{ReviewId, ReviewRequest, ReviewStatus};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("review session has already been submitted")]
    AlreadySubmitted,

    #[error("cannot edit while previewing the original")]
    PreviewingOriginal,

    #[error("no fee item at index {index} (fee structure has {len})")]
    NoSuchFeeItem { index: usize, len: usize },

    #[error("document {0} is not available to seed the review")]
    MissingDocument(DocumentId),

    #[error("review {review} is {status}, not pending")]
    StaleRequest {
        review: ReviewId,
        status: ReviewStatus,
    },

    #[error("submission is for document {found}, expected {expected}")]
    DocumentMismatch {
        expected: DocumentId,
        found: DocumentId,
    },

    #[error(transparent)]
    InvalidField(#[from] FieldError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing,
    Submitted,
}

/// Frozen result of a review session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub document_id: DocumentId,
    pub original: ReviewSnapshot,
    pub candidate: ReviewSnapshot,
    pub changes: Vec<ChangeDescriptor>,
    pub comments: String,
    pub has_changes: bool,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    document_id: DocumentId,
    original: ReviewSnapshot,
    candidate: ReviewableFields,
    changes: Vec<ChangeDescriptor>,
    state: SessionState,
    showing_original: bool,
    config: ReviewConfig,
}

impl ReviewSession {
    /// Seed original and candidate from the live document.
    pub fn seed(document: &Document, config: ReviewConfig) -> Result<Self, SessionError> {
        document.fields.validate()?;
        Ok(Self {
            document_id: document.id.clone(),
            original: document.snapshot(),
            candidate: document.fields.clone(),
            changes: Vec::new(),
            state: SessionState::Editing,
            showing_original: false,
            config,
        })
    }

    /// Seed a session for `request`, checking it is still open and that its
    /// document was found.
    pub fn for_request(
        request: &ReviewRequest,
        document: Option<&Document>,
        config: ReviewConfig,
    ) -> Result<Self, SessionError> {
        if request.status != ReviewStatus::Pending {
            return Err(SessionError::StaleRequest {
                review: request.id.clone(),
                status: request.status,
            });
        }
        let document =
            document.ok_or_else(|| SessionError::MissingDocument(request.document_id.clone()))?;
        if document.id != request.document_id {
            return Err(SessionError::DocumentMismatch {
                expected: request.document_id.clone(),
                found: document.id.clone(),
            });
        }
        Self::seed(document, config)
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn original(&self) -> &ReviewSnapshot {
        &self.original
    }

    pub fn candidate(&self) -> &ReviewableFields {
        &self.candidate
    }

    /// The fields a viewer should see: the original while previewing.
    pub fn visible(&self) -> &ReviewableFields {
        if self.showing_original {
            &self.original.fields
        } else {
            &self.candidate
        }
    }

    pub fn changes(&self) -> &[ChangeDescriptor] {
        &self.changes
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn is_showing_original(&self) -> bool {
        self.showing_original
    }

    /// Flip the read-only preview of the original. Returns the new setting.
    pub fn toggle_original(&mut self) -> bool {
        self.showing_original = !self.showing_original;
        self.showing_original
    }

    pub fn set_scope_of_work(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.edit(|fields| {
            fields.scope_of_work = text;
            Ok(())
        })
    }

    pub fn set_assumptions(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.edit(|fields| {
            fields.assumptions = text;
            Ok(())
        })
    }

    pub fn set_exclusions(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.edit(|fields| {
            fields.exclusions = text;
            Ok(())
        })
    }

    pub fn set_fee_item(&mut self, index: usize, item: FeeLineItem) -> Result<(), SessionError> {
        self.edit(|fields| {
            let len = fields.fee_structure.len();
            let slot = fields
                .fee_structure
                .get_mut(index)
                .ok_or(SessionError::NoSuchFeeItem { index, len })?;
            *slot = item;
            Ok(())
        })
    }

    pub fn add_fee_item(&mut self, item: FeeLineItem) -> Result<(), SessionError> {
        self.edit(|fields| {
            fields.fee_structure.push(item);
            Ok(())
        })
    }

    pub fn remove_fee_item(&mut self, index: usize) -> Result<FeeLineItem, SessionError> {
        self.edit(|fields| {
            let len = fields.fee_structure.len();
            if index >= len {
                return Err(SessionError::NoSuchFeeItem { index, len });
            }
            Ok(fields.fee_structure.remove(index))
        })
    }

    /// Replace the whole candidate, e.g. from a form post.
    pub fn replace_fields(&mut self, candidate: ReviewableFields) -> Result<(), SessionError> {
        self.edit(|fields| {
            *fields = candidate;
            Ok(())
        })
    }

    /// Run one mutation against a scratch copy of the candidate, keeping it
    /// only if the mutation and validation succeed.
    fn edit<T>(
        &mut self,
        mutate: impl FnOnce(&mut ReviewableFields) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        if self.state == SessionState::Submitted {
            return Err(SessionError::AlreadySubmitted);
        }
        if self.showing_original {
            return Err(SessionError::PreviewingOriginal);
        }
        let mut scratch = self.candidate.clone();
        let out = mutate(&mut scratch)?;
        scratch.validate()?;
        self.candidate = scratch;
        self.changes = summarize(&self.original.fields, &self.candidate);
        debug!(
            document = %self.document_id,
            changes = self.changes.len(),
            "review summary recomputed"
        );
        Ok(out)
    }

    /// Freeze the session and produce the submission. A session with no
    /// changes submits as an approval.
    pub fn submit(&mut self, comments: impl Into<String>) -> Result<ReviewSubmission, SessionError> {
        if self.state == SessionState::Submitted {
            return Err(SessionError::AlreadySubmitted);
        }
        let changes = summarize(&self.original.fields, &self.candidate);
        let candidate = ReviewSnapshot::from_fields(self.candidate.clone(), self.config.tax_rate);
        self.changes = changes.clone();
        self.state = SessionState::Submitted;
        self.showing_original = false;
        Ok(ReviewSubmission {
            document_id: self.document_id.clone(),
            original: self.original.clone(),
            candidate,
            has_changes: !changes.is_empty(),
            changes,
            comments: comments.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Actor, NewDocument};
    use chrono::Utc;

    fn document() -> Document {
        Document::new(
            NewDocument {
                title: "TOE".into(),
                client_name: "Client".into(),
                fields: ReviewableFields {
                    scope_of_work: "Survey the site.".into(),
                    fee_structure: vec![
                        FeeLineItem::new("Survey", 1000.0),
                        FeeLineItem::new("Report", 500.0),
                    ],
                    assumptions: "Access provided.".into(),
                    exclusions: "Travel.".into(),
                },
            },
            &Actor::new("author@firm.example", "Author"),
            Utc::now(),
            0.15,
        )
    }

    fn session() -> ReviewSession {
        ReviewSession::seed(&document(), ReviewConfig::default()).unwrap()
    }

    #[test]
    fn fresh_session_has_no_changes() {
        let s = session();
        assert_eq!(s.state(), SessionState::Editing);
        assert_eq!(s.change_count(), 0);
        assert_eq!(s.candidate(), &s.original().fields);
    }

    #[test]
    fn edits_recompute_summary() {
        let mut s = session();
        s.set_scope_of_work("Survey the entire site carefully.").unwrap();
        assert_eq!(s.change_count(), 1);
        s.add_fee_item(FeeLineItem::new("Visit", 100.0)).unwrap();
        assert_eq!(s.change_count(), 2);
        s.remove_fee_item(2).unwrap();
        assert_eq!(s.change_count(), 1);
        s.set_scope_of_work("Survey the site.").unwrap();
        assert!(!s.has_changes());
    }

    #[test]
    fn candidate_never_aliases_original() {
        let mut s = session();
        s.set_fee_item(0, FeeLineItem::new("Survey", 1200.0)).unwrap();
        assert_eq!(s.original().fields.fee_structure[0].cost, 1000.0);
        assert_eq!(s.candidate().fee_structure[0].cost, 1200.0);
    }

    #[test]
    fn preview_blocks_edits() {
        let mut s = session();
        s.set_exclusions("Travel and parking.").unwrap();
        assert!(s.toggle_original());
        assert_eq!(s.visible().exclusions, "Travel.");
        assert_eq!(s.set_exclusions("x"), Err(SessionError::PreviewingOriginal));
        assert!(!s.toggle_original());
        assert_eq!(s.visible().exclusions, "Travel and parking.");
    }

    #[test]
    fn out_of_range_fee_index_is_rejected() {
        let mut s = session();
        assert_eq!(
            s.set_fee_item(5, FeeLineItem::default()),
            Err(SessionError::NoSuchFeeItem { index: 5, len: 2 })
        );
        assert_eq!(
            s.remove_fee_item(2),
            Err(SessionError::NoSuchFeeItem { index: 2, len: 2 })
        );
    }

    #[test]
    fn invalid_cost_leaves_candidate_untouched() {
        let mut s = session();
        let result = s.set_fee_item(0, FeeLineItem::new("Survey", f64::INFINITY));
        assert!(matches!(result, Err(SessionError::InvalidField(_))));
        assert_eq!(s.candidate().fee_structure[0].cost, 1000.0);
    }

    #[test]
    fn submit_folds_in_recomputed_totals() {
        let mut s = session();
        s.add_fee_item(FeeLineItem::new("Visit", 500.0)).unwrap();
        let submission = s.submit("Added a site visit").unwrap();
        assert!(submission.has_changes);
        assert_eq!(submission.changes.len(), 1);
        assert_eq!(submission.candidate.totals.total_fee, 2000.0);
        assert!((submission.candidate.totals.total_fee_with_gst - 2300.0).abs() < 1e-9);
        assert_eq!(submission.original.totals.total_fee, 1500.0);
        assert_eq!(submission.comments, "Added a site visit");
    }

    #[test]
    fn unchanged_submission_is_an_approval() {
        let mut s = session();
        let submission = s.submit("Looks good").unwrap();
        assert!(!submission.has_changes);
        assert!(submission.changes.is_empty());
        assert_eq!(submission.candidate.fields, submission.original.fields);
    }

    #[test]
    fn second_submit_is_rejected() {
        let mut s = session();
        s.submit("").unwrap();
        assert_eq!(s.submit(""), Err(SessionError::AlreadySubmitted));
        assert_eq!(s.set_assumptions("late"), Err(SessionError::AlreadySubmitted));
        assert_eq!(s.state(), SessionState::Submitted);
    }

    #[test]
    fn for_request_requires_pending_and_document() {
        let doc = document();
        let author = Actor::new("author@firm.example", "Author");
        let reviewer = Actor::new("r@firm.example", "R");
        let mut request = ReviewRequest::new(doc.id.clone(), &author, &reviewer, Utc::now());

        assert_eq!(
            ReviewSession::for_request(&request, None, ReviewConfig::default()).unwrap_err(),
            SessionError::MissingDocument(doc.id.clone())
        );
        assert!(ReviewSession::for_request(&request, Some(&doc), ReviewConfig::default()).is_ok());

        request.status = ReviewStatus::Archived;
        assert!(matches!(
            ReviewSession::for_request(&request, Some(&doc), ReviewConfig::default()),
            Err(SessionError::StaleRequest { .. })
        ));
    }
}
