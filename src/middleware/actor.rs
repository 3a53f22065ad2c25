//! Actor context extraction for finance operations.
//!
//! The upstream gateway authenticates the caller and forwards their
//! identity in headers; this service trusts those headers and only enforces
//! ownership and role rules on top of them.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::models::{Actor, UserRole};

/// Caller identity extracted from request headers.
#[derive(Debug, Clone)]
pub struct ActorContext(pub Actor);

impl ActorContext {
    pub fn actor(&self) -> &Actor {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uid = parts
            .headers
            .get("X-Actor-Uid")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing X-Actor-Uid header (required from gateway)"
                ))
            })?;

        let role = parts
            .headers
            .get("X-Actor-Role")
            .and_then(|v| v.to_str().ok())
            .and_then(UserRole::from_string)
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing or unrecognized X-Actor-Role header"
                ))
            })?;

        let span = tracing::Span::current();
        span.record("actor_uid", uid);
        span.record("actor_role", role.as_str());

        Ok(ActorContext(Actor::new(uid, role)))
    }
}
