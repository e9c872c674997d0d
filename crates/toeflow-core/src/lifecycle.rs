//! Document lifecycle state machine.
//!
//! ```text
//! draft -> internal_review -> ready_to_send -> sent -> signed
//!                  |                ^            |
//!                  v                |            +-> expired
//!           review_completed -------+ (accept)
//!                  |
//!                  +-> draft (discard)
//! ```
//!
//! Every applied transition appends exactly one history entry. While a
//! document is in `review_completed` it carries a `pre_review_version`; no
//! other state does.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{
    Actor, Document, DocumentId, DocumentStatus, HistoryAction, HistoryEntry, PreReviewVersion,
};
use crate::review::ReviewRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    SendForReview,
    CompleteWithoutChanges,
    CompleteWithChanges,
    AcceptChanges,
    DiscardChanges,
    MarkSent,
    MarkSigned,
    MarkExpired,
}

impl Transition {
    pub fn source(&self) -> DocumentStatus {
        match self {
            Self::SendForReview => DocumentStatus::Draft,
            Self::CompleteWithoutChanges | Self::CompleteWithChanges => {
                DocumentStatus::InternalReview
            }
            Self::AcceptChanges | Self::DiscardChanges => DocumentStatus::ReviewCompleted,
            Self::MarkSent => DocumentStatus::ReadyToSend,
            Self::MarkSigned | Self::MarkExpired => DocumentStatus::Sent,
        }
    }

    pub fn target(&self) -> DocumentStatus {
        match self {
            Self::SendForReview => DocumentStatus::InternalReview,
            Self::CompleteWithoutChanges | Self::AcceptChanges => DocumentStatus::ReadyToSend,
            Self::CompleteWithChanges => DocumentStatus::ReviewCompleted,
            Self::DiscardChanges => DocumentStatus::Draft,
            Self::MarkSent => DocumentStatus::Sent,
            Self::MarkSigned => DocumentStatus::Signed,
            Self::MarkExpired => DocumentStatus::Expired,
        }
    }

    fn action(&self) -> HistoryAction {
        match self {
            Self::SendForReview => HistoryAction::SentForReview,
            Self::CompleteWithoutChanges | Self::CompleteWithChanges => {
                HistoryAction::ReviewCompleted
            }
            Self::AcceptChanges => HistoryAction::ChangesAccepted,
            Self::DiscardChanges => HistoryAction::ChangesDiscarded,
            Self::MarkSent => HistoryAction::SentToClient,
            Self::MarkSigned => HistoryAction::Signed,
            Self::MarkExpired => HistoryAction::Expired,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SendForReview => "send for review",
            Self::CompleteWithoutChanges => "complete review without changes",
            Self::CompleteWithChanges => "complete review with changes",
            Self::AcceptChanges => "accept review changes",
            Self::DiscardChanges => "discard review changes",
            Self::MarkSent => "mark as sent",
            Self::MarkSigned => "mark as signed",
            Self::MarkExpired => "mark as expired",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransitionError {
    #[error("cannot {attempted} while document is {current}")]
    InvalidTransition {
        current: DocumentStatus,
        attempted: Transition,
    },

    #[error("document fields are read-only while document is {0}")]
    Locked(DocumentStatus),
}

/// Fan-in event: every review request for a document has left `pending`.
#[derive(Debug, Clone)]
pub struct AllReviewsResolved {
    pub document_id: DocumentId,
    pub reviews: Vec<ReviewRequest>,
}

impl AllReviewsResolved {
    pub fn any_changes(&self) -> bool {
        self.reviews.iter().any(|review| review.has_changes)
    }

    /// The transition this event drives from `internal_review`.
    pub fn transition(&self) -> Transition {
        if self.any_changes() {
            Transition::CompleteWithChanges
        } else {
            Transition::CompleteWithoutChanges
        }
    }
}

/// Reject `transition` unless the document is in its source state.
pub fn ensure(document: &Document, transition: Transition) -> Result<(), TransitionError> {
    if document.status == transition.source() {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition {
            current: document.status,
            attempted: transition,
        })
    }
}

/// Reject author edits outside `draft` and `ready_to_send`.
pub fn ensure_editable(document: &Document) -> Result<(), TransitionError> {
    if document.status.is_editable() {
        Ok(())
    } else {
        Err(TransitionError::Locked(document.status))
    }
}

/// Apply `transition` to `document`, stamping `actor` and `at`.
///
/// Completing with changes captures the pre-review version; accepting clears
/// it; discarding restores the reviewable fields from it and clears it.
/// Sending and signing stamp their dates. Nothing is mutated on error.
pub fn apply(
    document: &mut Document,
    transition: Transition,
    actor: &Actor,
    at: DateTime<Utc>,
    details: impl Into<String>,
) -> Result<(), TransitionError> {
    ensure(document, transition)?;

    match transition {
        Transition::CompleteWithChanges => {
            document.pre_review_version = Some(PreReviewVersion {
                snapshot: document.snapshot(),
                captured_at: at,
                captured_by: actor.clone(),
            });
        }
        Transition::AcceptChanges => {
            document.pre_review_version = None;
        }
        Transition::DiscardChanges => {
            if let Some(version) = document.pre_review_version.take() {
                document.fields = version.snapshot.fields;
                document.totals = version.snapshot.totals;
            }
        }
        Transition::MarkSent => document.sent_date = Some(at),
        Transition::MarkSigned => document.signed_date = Some(at),
        Transition::SendForReview
        | Transition::CompleteWithoutChanges
        | Transition::MarkExpired => {}
    }

    document.status = transition.target();
    document.updated_at = at;
    document
        .history
        .push(HistoryEntry::new(at, actor, transition.action(), details));

    debug_assert!(document.snapshot_invariant_holds());
    Ok(())
}

/// Drive the fan-in transition out of `internal_review`.
pub fn resolve(
    document: &mut Document,
    event: &AllReviewsResolved,
    actor: &Actor,
    at: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    let transition = event.transition();
    let with_changes = event.reviews.iter().filter(|r| r.has_changes).count();
    let details = format!(
        "{} review(s) completed, {} with changes",
        event.reviews.len(),
        with_changes
    );
    apply(document, transition, actor, at, details)?;
    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FeeLineItem, NewDocument, ReviewableFields};

    fn actor() -> Actor {
        Actor::new("author@firm.example", "Author")
    }

    fn draft() -> Document {
        let fields = ReviewableFields {
            scope_of_work: "Survey the site.".into(),
            fee_structure: vec![FeeLineItem::new("Survey", 100.0)],
            ..ReviewableFields::default()
        };
        Document::new(
            NewDocument {
                title: "TOE".into(),
                client_name: String::new(),
                fields,
            },
            &actor(),
            Utc::now(),
            0.15,
        )
    }

    fn in_status(status: DocumentStatus) -> Document {
        let mut doc = draft();
        let path: &[Transition] = match status {
            DocumentStatus::Draft => &[],
            DocumentStatus::InternalReview => &[Transition::SendForReview],
            DocumentStatus::ReviewCompleted => {
                &[Transition::SendForReview, Transition::CompleteWithChanges]
            }
            DocumentStatus::ReadyToSend => {
                &[Transition::SendForReview, Transition::CompleteWithoutChanges]
            }
            DocumentStatus::Sent => &[
                Transition::SendForReview,
                Transition::CompleteWithoutChanges,
                Transition::MarkSent,
            ],
            DocumentStatus::Signed => &[
                Transition::SendForReview,
                Transition::CompleteWithoutChanges,
                Transition::MarkSent,
                Transition::MarkSigned,
            ],
            DocumentStatus::Expired => &[
                Transition::SendForReview,
                Transition::CompleteWithoutChanges,
                Transition::MarkSent,
                Transition::MarkExpired,
            ],
        };
        for t in path {
            apply(&mut doc, *t, &actor(), Utc::now(), "").unwrap();
        }
        doc
    }

    const ALL_TRANSITIONS: [Transition; 8] = [
        Transition::SendForReview,
        Transition::CompleteWithoutChanges,
        Transition::CompleteWithChanges,
        Transition::AcceptChanges,
        Transition::DiscardChanges,
        Transition::MarkSent,
        Transition::MarkSigned,
        Transition::MarkExpired,
    ];

    const ALL_STATUSES: [DocumentStatus; 7] = [
        DocumentStatus::Draft,
        DocumentStatus::InternalReview,
        DocumentStatus::ReviewCompleted,
        DocumentStatus::ReadyToSend,
        DocumentStatus::Sent,
        DocumentStatus::Signed,
        DocumentStatus::Expired,
    ];

    #[test]
    fn only_listed_transitions_are_legal() {
        for status in ALL_STATUSES {
            for transition in ALL_TRANSITIONS {
                let mut doc = in_status(status);
                let before = doc.clone();
                let result = apply(&mut doc, transition, &actor(), Utc::now(), "");
                if transition.source() == status {
                    assert!(result.is_ok(), "{transition} from {status} should be legal");
                    assert_eq!(doc.status, transition.target());
                    assert_eq!(doc.history.len(), before.history.len() + 1);
                } else {
                    assert_eq!(
                        result,
                        Err(TransitionError::InvalidTransition {
                            current: status,
                            attempted: transition,
                        })
                    );
                    assert_eq!(doc, before, "rejected transition must not mutate");
                }
            }
        }
    }

    #[test]
    fn completing_with_changes_snapshots_fields() {
        let mut doc = in_status(DocumentStatus::InternalReview);
        let reviewer = Actor::new("r@firm.example", "R");
        apply(&mut doc, Transition::CompleteWithChanges, &reviewer, Utc::now(), "").unwrap();
        let version = doc.pre_review_version.as_ref().unwrap();
        assert_eq!(version.snapshot, doc.snapshot());
        assert_eq!(version.captured_by, reviewer);
        assert!(doc.snapshot_invariant_holds());
    }

    #[test]
    fn accept_clears_snapshot() {
        let mut doc = in_status(DocumentStatus::ReviewCompleted);
        apply(&mut doc, Transition::AcceptChanges, &actor(), Utc::now(), "").unwrap();
        assert_eq!(doc.status, DocumentStatus::ReadyToSend);
        assert!(doc.pre_review_version.is_none());
    }

    #[test]
    fn discard_restores_pre_review_fields() {
        let mut doc = in_status(DocumentStatus::ReviewCompleted);
        let original = doc.fields.clone();
        doc.fields.scope_of_work = "tampered".into();
        apply(&mut doc, Transition::DiscardChanges, &actor(), Utc::now(), "").unwrap();
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert_eq!(doc.fields, original);
        assert!(doc.pre_review_version.is_none());
        assert_eq!(doc.history.last().unwrap().action, HistoryAction::ChangesDiscarded);
    }

    #[test]
    fn send_stamps_date() {
        let mut doc = in_status(DocumentStatus::ReadyToSend);
        let at = Utc::now();
        apply(&mut doc, Transition::MarkSent, &actor(), at, "").unwrap();
        assert_eq!(doc.sent_date, Some(at));
        assert_eq!(doc.history.last().unwrap().action, HistoryAction::SentToClient);
    }

    #[test]
    fn fields_locked_outside_draft_and_ready() {
        assert!(ensure_editable(&in_status(DocumentStatus::Draft)).is_ok());
        assert!(ensure_editable(&in_status(DocumentStatus::ReadyToSend)).is_ok());
        assert_eq!(
            ensure_editable(&in_status(DocumentStatus::InternalReview)),
            Err(TransitionError::Locked(DocumentStatus::InternalReview))
        );
        assert!(ensure_editable(&in_status(DocumentStatus::ReviewCompleted)).is_err());
        assert!(ensure_editable(&in_status(DocumentStatus::Signed)).is_err());
    }

    #[test]
    fn resolve_picks_transition_from_changes() {
        let reviewer = Actor::new("r@firm.example", "R");
        let mut doc = in_status(DocumentStatus::InternalReview);
        let mut review = ReviewRequest::new(doc.id.clone(), &actor(), &reviewer, Utc::now());
        let clean = AllReviewsResolved {
            document_id: doc.id.clone(),
            reviews: vec![review.clone()],
        };
        assert_eq!(clean.transition(), Transition::CompleteWithoutChanges);

        review.has_changes = true;
        let changed = AllReviewsResolved {
            document_id: doc.id.clone(),
            reviews: vec![review],
        };
        let t = resolve(&mut doc, &changed, &reviewer, Utc::now()).unwrap();
        assert_eq!(t, Transition::CompleteWithChanges);
        assert_eq!(doc.status, DocumentStatus::ReviewCompleted);
        assert_eq!(
            doc.history.last().unwrap().details,
            "1 review(s) completed, 1 with changes"
        );
    }
}
