use std::sync::Arc;

use axum::{
    Extension, RequestPartsExt, async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejectionReason,
};
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    application::usecases::auth::SessionKeys,
    infrastructure::axum_http::error_responses::AppError,
};

/// A caller holding a valid session token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Same as [`AuthUser`] for endpoints that also serve anonymous callers. A present but
/// invalid token is still rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.user_id)
    }
}

async fn session_keys(parts: &mut Parts) -> Result<Arc<SessionKeys>, AppError> {
    let Extension(keys) = parts
        .extract::<Extension<Arc<SessionKeys>>>()
        .await
        .map_err(|err| {
            error!(error = %err, "auth: session keys extension is not installed");
            AppError::Internal(anyhow::anyhow!("session keys unavailable"))
        })?;
    Ok(keys)
}

fn authenticate(keys: &SessionKeys, token: &str) -> Result<AuthUser, AppError> {
    let claims = keys.verify(token).map_err(|err| {
        debug!(error = %err, "auth: rejected bearer token");
        AppError::Unauthorized
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser {
        user_id,
        email: claims.email,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized)?;

        let keys = session_keys(parts).await?;
        authenticate(&keys, bearer.token())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let bearer = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
            Ok(TypedHeader(Authorization(bearer))) => bearer,
            Err(rejection) => match rejection.reason() {
                TypedHeaderRejectionReason::Missing => return Ok(MaybeAuthUser(None)),
                _ => return Err(AppError::Unauthorized),
            },
        };

        let keys = session_keys(parts).await?;
        authenticate(&keys, bearer.token()).map(|user| MaybeAuthUser(Some(user)))
    }
}
