//! Caller identity extraction.
//!
//! Authentication lives at the gateway in front of this service; the
//! gateway resolves credentials and forwards the result in trusted headers.
//! This extractor only reads those headers, it never validates credentials
//! itself. A request without a parseable user id fails `Unauthenticated`.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use shelfmark_store::UserId;

use crate::error::AppError;

/// Header carrying the authenticated user's id (UUID).
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the admin capability flag ("true"/"1").
pub const ADMIN_HEADER: &str = "x-user-admin";

/// Authenticated caller: stable user id plus admin capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .map(UserId)
            .ok_or_else(|| AppError::unauthorized("missing or invalid caller identity"))?;

        let is_admin = parts
            .headers
            .get(ADMIN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value == "true" || value == "1")
            .unwrap_or(false);

        Ok(Self { user_id, is_admin })
    }
}
