//! API keys for the write side of the radar.
//!
//! Reads are open. Pushing status needs a key with `push_status` and
//! changing the filter needs `configure`, whether it comes through the JSON
//! API or the dashboard form.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::config::{Config, Permission};

use super::api::error::ErrorResponse;
use super::state::AppState;

/// What an [`Authorized`] extractor demands of the key.
pub trait Scope {
    const PERMISSION: Permission;
}

pub struct PushStatus;

impl Scope for PushStatus {
    const PERMISSION: Permission = Permission::PushStatus;
}

pub struct Configure;

impl Scope for Configure {
    const PERMISSION: Permission = Permission::Configure;
}

#[derive(Debug, PartialEq)]
pub enum AuthError {
    MissingKey,
    InvalidFormat,
    UnknownKey,
    Forbidden(Permission),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AuthError::MissingKey => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("missing_api_key"),
            ),
            AuthError::InvalidFormat => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::with_message("invalid_authorization", "expected `Bearer <key>`"),
            ),
            AuthError::UnknownKey => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("unknown_api_key"),
            ),
            AuthError::Forbidden(permission) => (
                StatusCode::FORBIDDEN,
                ErrorResponse::with_message("forbidden", permission.as_ref()),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Checks `key` against the configured keys and returns the key's name.
pub fn authorize(
    config: &Config,
    key: &str,
    permission: Permission,
) -> Result<String, AuthError> {
    if key.is_empty() {
        return Err(AuthError::MissingKey);
    }
    let api_key = config.find_api_key(key).ok_or(AuthError::UnknownKey)?;
    if !api_key.permissions.contains(&permission) {
        log::warn!("Key {} lacks {}", api_key.name, permission.as_ref());
        return Err(AuthError::Forbidden(permission));
    }
    Ok(api_key.name.clone())
}

/// Caller presenting `Authorization: Bearer <key>` for a key holding the
/// permission of `S`.
pub struct Authorized<S> {
    pub key_name: String,
    scope: PhantomData<S>,
}

impl<S> Authorized<S> {
    pub fn new(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            scope: PhantomData,
        }
    }
}

impl<S: Scope + Send + Sync> FromRequestParts<AppState> for Authorized<S> {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .ok_or(AuthError::MissingKey)?
            .to_str()
            .map_err(|_| AuthError::InvalidFormat)?;
        let key = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidFormat)?;

        authorize(&state.config, key.trim(), S::PERMISSION).map(Self::new)
    }
}
