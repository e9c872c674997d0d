//! HTTP surface for the review workflow.
//!
//! Every write route reads the acting identity from the `x-actor-email` and
//! `x-actor-name` headers and passes it explicitly into the workflow.

mod error;
mod handlers;
mod identity;
mod router;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use identity::{ACTOR_EMAIL_HEADER, ACTOR_NAME_HEADER, Acting};
pub use router::router;
pub use state::AppState;
