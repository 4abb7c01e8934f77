//! Request extractors: caller identity and validated JSON bodies.

use axum::async_trait;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::error::Error;
use crate::identity::Caller;

const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Token from the `accessToken` cookie, else from `Authorization: Bearer`.
fn token_from(parts: &Parts) -> Option<&str> {
    let from_cookie = parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .find_map(|pair| pair.trim().strip_prefix(ACCESS_TOKEN_COOKIE)?.strip_prefix('='))
        .filter(|t| !t.is_empty());
    from_cookie.or_else(|| {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(caller) = parts.extensions.get::<Caller>() {
            return Ok(*caller);
        }
        let Some(token) = token_from(parts) else {
            tracing::debug!(uri = %parts.uri, "request without access token");
            return Err(Error::unauthenticated("Unauthorized request"));
        };
        let caller = state.identity.resolve_caller(token)?;
        parts.extensions.insert(caller);
        Ok(caller)
    }
}

/// Caller holding the `seller` role.
#[derive(Clone, Copy, Debug)]
pub struct Seller(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for Seller {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        if !caller.is_seller() {
            return Err(Error::forbidden("Access denied, sellers only"));
        }
        Ok(Seller(caller))
    }
}

/// `:id` path segment parsed as a UUID. A malformed id is a validation error.
#[derive(Clone, Copy, Debug)]
pub struct IdPath(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IdPath {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state).await.map_err(|rejection: PathRejection| Error::validation(rejection.body_text()))?;
        Ok(IdPath(id))
    }
}

/// JSON body that has passed `validator` checks. Malformed JSON is a validation error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection: JsonRejection| Error::validation(rejection.body_text()))?;
        value.validate().map_err(|e| Error::validation(e.to_string()))?;
        Ok(ValidatedJson(value))
    }
}
