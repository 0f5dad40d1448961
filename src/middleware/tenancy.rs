// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    services::access::Caller,
};

pub const CURRENT_UNIT_HEADER: &str = "x-current-unit";

/// The caller with the optional `X-Current-Unit` narrowing applied.
#[derive(Debug, Clone)]
pub struct Scope(pub Caller);

fn current_unit(parts: &Parts) -> Result<Option<Uuid>, AppError> {
    let Some(value) = parts.headers.get(CURRENT_UNIT_HEADER) else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| AppError::InvalidUnitHeader)?;
    Uuid::parse_str(raw.trim())
        .map(Some)
        .map_err(|_| AppError::InvalidUnitHeader)
}

impl<S> FromRequestParts<S> for Scope
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        let resolve = || -> Result<Caller, AppError> {
            let user = parts
                .extensions
                .get::<AuthenticatedUser>()
                .ok_or(AppError::InvalidToken)?;
            user.caller().with_current_unit(current_unit(parts)?)
        };

        resolve()
            .map(Scope)
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder();
        if let Some(value) = header {
            builder = builder.header(CURRENT_UNIT_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn header_is_optional() {
        assert_eq!(current_unit(&parts_with(None)).unwrap(), None);
    }

    #[test]
    fn valid_header_is_parsed() {
        let id = Uuid::new_v4();
        assert_eq!(current_unit(&parts_with(Some(&id.to_string()))).unwrap(), Some(id));
    }

    #[test]
    fn malformed_header_is_a_validation_error() {
        assert!(matches!(
            current_unit(&parts_with(Some("unit-a"))),
            Err(AppError::InvalidUnitHeader)
        ));
    }
}
