//! Bearer-token authentication.
//!
//! The identity provider issues HS256 JWTs whose `sub` claim is the user's
//! uuid. Handlers that require a signed-in user take `AuthUser`; handlers
//! that also accept anonymous callers take `MaybeAuthUser`.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// The authenticated user's id, extracted from the Authorization header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Like `AuthUser`, but absent/invalid credentials yield `None` instead of 401.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Uuid>);

fn decode_bearer(parts: &Parts, jwt_secret: &str) -> Option<Uuid> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;
    let token = header_value.strip_prefix("Bearer ")?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Uuid::parse_str(&data.claims.sub).ok()
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        decode_bearer(parts, &state.config.jwt_secret)
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(decode_bearer(
            parts,
            &state.config.jwt_secret,
        )))
    }
}
