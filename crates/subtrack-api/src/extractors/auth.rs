//! Caller identity extractors.
//!
//! Authentication happens at the upstream gateway, which forwards the
//! resolved user id in `X-User-Id` and sets `X-Admin: true` for operators.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use subtrack_core::error::AppError;
use subtrack_core::types::id::UserId;
use subtrack_service::context::RequestContext;

use crate::error::ApiError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header flagging an administrative caller.
pub const ADMIN_HEADER: &str = "x-admin";

/// Identified caller available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub RequestContext);

impl AuthUser {
    /// Returns the inner `RequestContext`.
    pub fn context(&self) -> &RequestContext {
        &self.0
    }
}

impl std::ops::Deref for AuthUser {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing X-User-Id header"))?;

        let user_id: UserId = raw
            .trim()
            .parse()
            .map_err(|_| AppError::authentication("X-User-Id is not a valid UUID"))?;

        let is_admin = parts
            .headers
            .get(ADMIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        Ok(AuthUser(RequestContext::new(user_id, is_admin)))
    }
}

/// Caller that must carry the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub RequestContext);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(ctx) = AuthUser::from_request_parts(parts, state).await?;
        if !ctx.is_admin {
            return Err(AppError::authorization("Administrator access required").into());
        }
        Ok(AdminUser(ctx))
    }
}
