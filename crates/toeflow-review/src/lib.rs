//! Review workflow over a record store: fan-out to reviewers, fan-in of their
//! submissions, accept/discard of the result, and the author's own document
//! operations. The acting identity is an explicit argument to every call.

pub mod clock;
mod coordinator;
mod error;
pub mod feedback;
pub mod notify;
mod reconcile;
mod workflow;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{FanIn, FanOut, SubmitOutcome};
pub use error::ReviewError;
pub use feedback::{DocumentFeedback, FieldDiff, ReviewFeedback};
pub use notify::{LogNotifier, NoopNotifier, ReviewNotifier};
pub use reconcile::{Reconciliation, latest_with_changes};
pub use workflow::{DocumentEdit, Workflow};
