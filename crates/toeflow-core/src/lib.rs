//! Core types and pure algorithms for Terms of Engagement review: the document
//! model, word-level text diffing, change detection, per-reviewer sessions and
//! the document lifecycle.

pub mod changes;
pub mod config;
pub mod document;
pub mod lifecycle;
pub mod review;
pub mod session;
pub mod text_diff;

pub use changes::{ChangeDescriptor, ReviewableField, summarize};
pub use config::{ConfigError, DEFAULT_TAX_RATE, ReviewConfig};
pub use document::{
    Actor, Document, DocumentId, DocumentStatus, FeeLineItem, FieldError, HistoryAction,
    HistoryEntry, NewDocument, PreReviewVersion, ReviewSnapshot, ReviewableFields,
    StaffAllocation, Totals,
};
pub use lifecycle::{AllReviewsResolved, Transition, TransitionError};
pub use review::{ReviewId, ReviewRequest, ReviewStatus};
pub use session::{ReviewSession, ReviewSubmission, SessionError, SessionState};
pub use text_diff::{DiffSegment, SegmentKind, diff};
