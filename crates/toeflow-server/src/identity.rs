//! The acting identity, taken from request headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use toeflow_core::Actor;

use crate::error::ApiError;

pub const ACTOR_EMAIL_HEADER: &str = "x-actor-email";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// The caller. `x-actor-email` is required; `x-actor-name` falls back to the email.
#[derive(Debug, Clone)]
pub struct Acting(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for Acting
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email =
            header(parts, ACTOR_EMAIL_HEADER).ok_or(ApiError::MissingActor(ACTOR_EMAIL_HEADER))?;
        let name = header(parts, ACTOR_NAME_HEADER).unwrap_or(email);
        Ok(Self(Actor::new(email, name)))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
