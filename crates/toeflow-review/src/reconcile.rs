//! Accepting or discarding the outcome of a review cycle.
//!
//! Both run in one store transaction: the status change, the
//! `pre_review_version` update, the field merge and the archiving of every
//! review request commit together or not at all.

use serde::Serialize;
use toeflow_core::lifecycle::{self, Transition};
use toeflow_core::{Actor, Document, DocumentId, ReviewId, ReviewRequest, ReviewStatus};
use toeflow_store::{RecordStore, ReviewFilter, ReviewPatch, Tables};
use tracing::{info, warn};

use crate::{ReviewError, Workflow};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reconciliation {
    Accepted {
        document: Document,
        applied_from: ReviewId,
        archived: usize,
    },
    Discarded {
        document: Document,
        archived: usize,
    },
    /// No completed review proposes changes. Nothing was modified.
    NothingToReconcile { document: Document },
}

impl Reconciliation {
    pub fn document(&self) -> &Document {
        match self {
            Self::Accepted { document, .. }
            | Self::Discarded { document, .. }
            | Self::NothingToReconcile { document } => document,
        }
    }
}

/// The completed review whose changes get merged: the latest `completed_at`
/// among those with changes. Ties fall back to the later `requested_at`, then
/// to the greater review id, so the choice never depends on input order.
pub fn latest_with_changes(reviews: &[ReviewRequest]) -> Option<&ReviewRequest> {
    reviews
        .iter()
        .filter(|review| review.proposes_changes() && review.review_data.is_some())
        .max_by(|a, b| {
            (a.completed_at, a.requested_at, &a.id).cmp(&(b.completed_at, b.requested_at, &b.id))
        })
}

fn archive_all(t: &mut Tables, document_id: &DocumentId) -> Result<usize, ReviewError> {
    let open: Vec<ReviewId> = t
        .filter_reviews(&ReviewFilter::for_document(document_id))
        .into_iter()
        .filter(|review| review.status != ReviewStatus::Archived)
        .map(|review| review.id)
        .collect();
    for id in &open {
        t.update_review(id, ReviewPatch::status(ReviewStatus::Archived))?;
    }
    Ok(open.len())
}

impl<S: RecordStore> Workflow<S> {
    /// Merge the latest reviewer's candidate into the document and move it
    /// to `ready_to_send`. Other reviewers' edits are informational only.
    pub fn accept_review(
        &self,
        document_id: &DocumentId,
        actor: &Actor,
    ) -> Result<Reconciliation, ReviewError> {
        let at = self.now();
        self.store().transaction(|t| {
            let mut document = t.get_document(document_id)?;
            lifecycle::ensure(&document, Transition::AcceptChanges)?;

            let reviews = t.filter_reviews(&ReviewFilter::for_document(document_id));
            let Some((chosen, data)) = latest_with_changes(&reviews)
                .and_then(|review| review.review_data.clone().map(|data| (review, data)))
            else {
                warn!(document = %document_id, "accept requested but no review proposes changes");
                return Ok(Reconciliation::NothingToReconcile { document });
            };

            document.fields = data.fields;
            document.totals = data.totals;
            lifecycle::apply(
                &mut document,
                Transition::AcceptChanges,
                actor,
                at,
                format!("Accepted changes from {}", chosen.reviewer),
            )?;
            let archived = archive_all(t, document_id)?;
            let document = t.replace_document(document)?;

            info!(
                document = %document_id,
                review = %chosen.id,
                reviewer = %chosen.reviewer.id,
                archived,
                "review changes accepted"
            );
            Ok(Reconciliation::Accepted {
                document,
                applied_from: chosen.id.clone(),
                archived,
            })
        })
    }

    /// Drop every candidate and return the document to `draft` with its
    /// pre-review fields.
    pub fn discard_review(
        &self,
        document_id: &DocumentId,
        actor: &Actor,
    ) -> Result<Reconciliation, ReviewError> {
        let at = self.now();
        self.store().transaction(|t| {
            let mut document = t.get_document(document_id)?;
            lifecycle::ensure(&document, Transition::DiscardChanges)?;

            let reviews = t.filter_reviews(&ReviewFilter::for_document(document_id));
            if latest_with_changes(&reviews).is_none() {
                warn!(document = %document_id, "discard requested but no review proposes changes");
                return Ok(Reconciliation::NothingToReconcile { document });
            }

            lifecycle::apply(
                &mut document,
                Transition::DiscardChanges,
                actor,
                at,
                "Discarded review changes",
            )?;
            let archived = archive_all(t, document_id)?;
            let document = t.replace_document(document)?;

            info!(document = %document_id, archived, "review changes discarded");
            Ok(Reconciliation::Discarded { document, archived })
        })
    }
}
