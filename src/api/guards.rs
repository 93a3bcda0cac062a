use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::state::AppState;

/// Proof that the caller is the host platform holding the shared API token.
pub(crate) struct HostToken;

#[async_trait]
impl FromRequestParts<AppState> for HostToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let expected = app_state.settings().host_api().token.as_str();
        if expected.is_empty() {
            return Err(ApiError::Unauthorized("Host API token is not configured"));
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        if !constant_time_eq(token.trim().as_bytes(), expected.as_bytes()) {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(HostToken)
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter().zip(right).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}
