//! Review fan-out and fan-in.
//!
//! Fan-out creates one pending request per reviewer and moves the document
//! into `internal_review`. Each submission completes one request; the
//! submission that leaves no request pending drives the lifecycle out of
//! `internal_review`. Both happen inside a single store transaction, so two
//! reviewers submitting at once cannot both see "still waiting".

use serde::Serialize;
use toeflow_core::lifecycle::{self, AllReviewsResolved, Transition};
use toeflow_core::{
    Actor, Document, DocumentId, DocumentStatus, ReviewId, ReviewRequest, ReviewSession,
    ReviewStatus, ReviewSubmission, SessionError,
};
use toeflow_store::{RecordStore, ReviewFilter, ReviewPatch};
use tracing::info;

use crate::{ReviewError, Workflow};

/// Result of a fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct FanOut {
    pub document: Document,
    pub reviews: Vec<ReviewRequest>,
}

/// What a submission did to the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FanIn {
    /// Other reviewers still have to submit.
    Waiting { pending: usize },
    /// This was the last one; the document moved on.
    Resolved {
        transition: Transition,
        status: DocumentStatus,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub review: ReviewRequest,
    pub fan_in: FanIn,
}

/// Drop blank identities and repeats of the same email, keeping first-seen order.
fn distinct_reviewers(reviewers: &[Actor]) -> Vec<Actor> {
    let mut out: Vec<Actor> = Vec::with_capacity(reviewers.len());
    for reviewer in reviewers {
        if reviewer.id.trim().is_empty() || out.iter().any(|seen| seen.matches(reviewer)) {
            continue;
        }
        out.push(reviewer.clone());
    }
    out
}

impl<S: RecordStore> Workflow<S> {
    /// Fan out: one pending review request per distinct reviewer.
    pub fn request_reviews(
        &self,
        document_id: &DocumentId,
        reviewers: &[Actor],
        requester: &Actor,
    ) -> Result<FanOut, ReviewError> {
        let reviewers = distinct_reviewers(reviewers);
        if reviewers.is_empty() {
            return Err(ReviewError::EmptyReviewerSet);
        }
        let at = self.now();

        let fan_out = self.store().transaction(|t| {
            let pending = t
                .filter_reviews(&ReviewFilter::for_document(document_id).with_status(ReviewStatus::Pending))
                .len();
            if pending > 0 {
                return Err(ReviewError::ReviewsOutstanding {
                    document: document_id.clone(),
                    pending,
                });
            }

            let mut document = t.get_document(document_id)?;
            let names: Vec<&str> = reviewers.iter().map(|r| r.name.as_str()).collect();
            lifecycle::apply(
                &mut document,
                Transition::SendForReview,
                requester,
                at,
                format!("Sent for review to {}", names.join(", ")),
            )?;

            let reviews = reviewers
                .iter()
                .map(|reviewer| {
                    t.create_review(ReviewRequest::new(document_id.clone(), requester, reviewer, at))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let document = t.replace_document(document)?;
            Ok(FanOut { document, reviews })
        })?;

        info!(
            document = %document_id,
            requester = %requester.id,
            reviewers = fan_out.reviews.len(),
            "review requested"
        );
        for review in &fan_out.reviews {
            self.notifier().review_requested(review);
        }
        Ok(fan_out)
    }

    /// Start a review session for the assigned reviewer of a pending request.
    pub fn open_session(
        &self,
        review_id: &ReviewId,
        reviewer: &Actor,
    ) -> Result<ReviewSession, ReviewError> {
        let config = self.config();
        self.store().read(|t| {
            let review = t.get_review(review_id)?;
            if !review.reviewer.matches(reviewer) {
                return Err(ReviewError::NotAssignedReviewer {
                    review: review.id,
                    actor: reviewer.id.clone(),
                });
            }
            Ok(ReviewSession::for_request(
                &review,
                t.find_document(&review.document_id),
                config,
            )?)
        })
    }

    /// Complete one review request and, if it was the last pending one,
    /// drive the document out of `internal_review`.
    pub fn submit_review(
        &self,
        review_id: &ReviewId,
        submission: ReviewSubmission,
        reviewer: &Actor,
    ) -> Result<SubmitOutcome, ReviewError> {
        let at = self.now();

        let outcome = self.store().transaction(|t| {
            let review = t.get_review(review_id)?;
            if !review.reviewer.matches(reviewer) {
                return Err(ReviewError::NotAssignedReviewer {
                    review: review.id,
                    actor: reviewer.id.clone(),
                });
            }
            if review.status != ReviewStatus::Pending {
                return Err(ReviewError::StaleSubmission {
                    review: review.id,
                    status: review.status,
                });
            }
            if submission.document_id != review.document_id {
                return Err(SessionError::DocumentMismatch {
                    expected: review.document_id,
                    found: submission.document_id,
                }
                .into());
            }
            submission.candidate.fields.validate()?;

            let review = t.update_review(
                review_id,
                ReviewPatch {
                    status: Some(ReviewStatus::Completed),
                    completed_at: Some(at),
                    comments: Some(submission.comments),
                    review_data: Some(submission.candidate),
                    changes_made: Some(submission.changes),
                    has_changes: Some(submission.has_changes),
                },
            )?;

            let siblings = t.filter_reviews(&ReviewFilter::for_document(&review.document_id));
            let pending = siblings.iter().filter(|r| r.is_pending()).count();
            if pending > 0 {
                return Ok(SubmitOutcome {
                    review,
                    fan_in: FanIn::Waiting { pending },
                });
            }

            let event = AllReviewsResolved {
                document_id: review.document_id.clone(),
                reviews: siblings
                    .into_iter()
                    .filter(|r| r.status == ReviewStatus::Completed)
                    .collect(),
            };
            // The fan-in moves the author's document, so it is recorded
            // under the author who requested the cycle, not the last reviewer.
            let mut document = t.get_document(&event.document_id)?;
            let transition = lifecycle::resolve(&mut document, &event, &review.requester, at)?;
            let document = t.replace_document(document)?;
            Ok(SubmitOutcome {
                review,
                fan_in: FanIn::Resolved {
                    transition,
                    status: document.status,
                },
            })
        })?;

        info!(
            review = %outcome.review.id,
            document = %outcome.review.document_id,
            reviewer = %reviewer.id,
            has_changes = outcome.review.has_changes,
            "review submitted"
        );
        match &outcome.fan_in {
            FanIn::Waiting { pending } => {
                info!(document = %outcome.review.document_id, pending, "awaiting remaining reviews");
            }
            FanIn::Resolved { status, .. } => {
                info!(document = %outcome.review.document_id, status = %status, "all reviews resolved");
            }
        }
        Ok(outcome)
    }

    /// "Awaiting my review": pending requests assigned to `reviewer`.
    pub fn awaiting_review(&self, reviewer: &Actor) -> Result<Vec<ReviewRequest>, ReviewError> {
        Ok(self.store().filter_reviews(&ReviewFilter::awaiting(&reviewer.id))?)
    }

    /// Every review request for a document, in request order.
    pub fn reviews_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<ReviewRequest>, ReviewError> {
        self.store().read(|t| {
            t.get_document(document_id)?;
            Ok(t.filter_reviews(&ReviewFilter::for_document(document_id)))
        })
    }

    pub fn review(&self, review_id: &ReviewId) -> Result<ReviewRequest, ReviewError> {
        Ok(self.store().get_review(review_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewers_are_deduplicated_ignoring_case() {
        let reviewers = [
            Actor::new("alice@firm.example", "Alice"),
            Actor::new("  ", "Nobody"),
            Actor::new("ALICE@firm.example", "Alice again"),
            Actor::new("bob@firm.example", "Bob"),
        ];
        let distinct = distinct_reviewers(&reviewers);
        let ids: Vec<_> = distinct.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["alice@firm.example", "bob@firm.example"]);
    }

    #[test]
    fn only_blank_reviewers_is_empty() {
        assert!(distinct_reviewers(&[Actor::new("", "")]).is_empty());
    }
}
