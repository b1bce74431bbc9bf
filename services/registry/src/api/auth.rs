//! Bearer-token authorization for tag creation.
//!
//! Tokens are opaque strings configured in TAGMINT_DEVICEHUBS; each one
//! authorizes minting for exactly one devicehub, whose base URL becomes the
//! pre-linked target of every tag it creates.

use axum::http::{header, HeaderMap};

use crate::api::error::ApiError;
use crate::state::AppState;

/// Resolves the request's bearer token to its devicehub base URL.
pub fn devicehub_from_bearer(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let unauthorized = || ApiError::unauthorized("invalid_token", "Provide a suitable token.");

    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthorized)?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(unauthorized)?;

    state
        .devicehub_for_token(token.trim())
        .map(str::to_string)
        .ok_or_else(unauthorized)
}
