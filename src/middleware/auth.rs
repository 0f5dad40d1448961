// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::User,
    services::access::Caller,
};

/// The verified principal, placed in the request extensions by `auth_guard`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub unit_ids: Vec<Uuid>,
}

impl AuthenticatedUser {
    pub fn caller(&self) -> Caller {
        Caller::new(self.user.id, self.user.role, self.unit_ids.clone())
    }
}

// Rejects the request unless it carries a valid access token for an active user.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer
        .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))?;

    let (user, unit_ids) = app_state
        .auth_service
        .authenticate(bearer.token())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user, unit_ids });
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
