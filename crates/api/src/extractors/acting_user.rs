//! Acting user extractor.
//!
//! The service sits behind a gateway that authenticates callers and forwards
//! the verified identity in `X-User-Id`. Handlers take the identity from this
//! extractor; per-operation authorization happens in the engine.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};

use shared::error::AppError;

use crate::error::ApiError;

/// Header carrying the gateway-authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Directory user ids top out well below this; anything longer is a
/// malformed or hostile header.
const MAX_USER_ID_LEN: usize = 256;

/// Identity of the caller for this request.
#[derive(Debug, Clone)]
pub struct ActingUser {
    pub id: String,
}

impl ActingUser {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty() && v.len() <= MAX_USER_ID_LEN)
            .ok_or_else(|| {
                ApiError(AppError::forbidden("Missing or invalid X-User-Id header"))
            })?;
        Ok(Self { id: id.to_string() })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
