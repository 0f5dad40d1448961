// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    services::access::Capability,
};

/// A role-only capability checked before the handler runs.
pub trait PermissionDef: Send + Sync + 'static {
    fn capability() -> Capability;
}

pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))?;

        let capability = T::capability();
        if !user.user.role.grants(capability) {
            tracing::debug!(user_id = %user.user.id, ?capability, "Permission denied");
            return Err(AppError::Forbidden(capability.action().to_string())
                .to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// Permission types
// ---

pub struct PermManageUnits;
impl PermissionDef for PermManageUnits {
    fn capability() -> Capability {
        Capability::ManageUnits
    }
}

pub struct PermManageUsers;
impl PermissionDef for PermManageUsers {
    fn capability() -> Capability {
        Capability::ManageUsers
    }
}

pub struct PermViewUsers;
impl PermissionDef for PermViewUsers {
    fn capability() -> Capability {
        Capability::ViewUsers
    }
}

pub struct PermWriteCatalogue;
impl PermissionDef for PermWriteCatalogue {
    fn capability() -> Capability {
        Capability::WriteCatalogue
    }
}
