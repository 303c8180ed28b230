use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};

use super::{AuthError, IdentityProvider};
use crate::api::ApiError;
use crate::model::OwnerId;
use crate::sanitize::redact_token;

/// The verified caller of a request.
///
/// Extracting an `Owner` fails with 401 before the handler body runs, so no
/// store access happens for unauthenticated requests.
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

#[async_trait]
impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
    Arc<dyn IdentityProvider>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).map_err(|e| {
            tracing::debug!(reason = %e, "request without usable credential");
            ApiError::unauthenticated()
        })?;

        let identity = Arc::<dyn IdentityProvider>::from_ref(state);
        match identity.verify(&token).await {
            Ok(owner) => {
                tracing::Span::current().record("owner", owner.as_str());
                Ok(Owner(owner))
            }
            Err(AuthError::Provider(reason)) => {
                tracing::warn!(
                    provider = identity.provider_tag(),
                    %reason,
                    "identity provider unavailable"
                );
                Err(ApiError::unauthenticated())
            }
            Err(e) => {
                tracing::debug!(
                    token = %redact_token(token.expose_secret()),
                    reason = %e,
                    "credential rejected"
                );
                Err(ApiError::unauthenticated())
            }
        }
    }
}

/// Reads a `Bearer` credential from the `Authorization` header. The scheme
/// is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<SecretString, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::InvalidCredential)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MissingCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingCredential);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(SecretString::from(token.to_string()))
}
