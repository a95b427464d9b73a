//! Authenticate REST requests from the `Authorization: Bearer <token>` header.

use crate::auth::{authenticate_bearer, AuthUser};
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        Ok(authenticate_bearer(&state.config.secrets, header)?)
    }
}

/// The bearer user when the header carries a valid token, otherwise `None`.
pub fn optional_user(headers: &HeaderMap, state: &AppState) -> Option<AuthUser> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    match authenticate_bearer(&state.config.secrets, header) {
        Ok(user) => Some(user),
        Err(err) => {
            if header.is_some() {
                tracing::debug!(error = %err, "bearer token rejected");
            }
            None
        }
    }
}
