// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    common::i18n::{I18nStore, DEFAULT_LANG},
    middleware::i18n::Locale,
    models::requisition::RequisitionStatus,
};

#[derive(Debug, Error)]
pub enum AppError {
    // --- validation_error ---
    #[error("validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid X-Current-Unit header")]
    InvalidUnitHeader,

    // --- authentication_error ---
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("inactive account")]
    InactiveAccount,

    // --- authorization_error ---
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unit {0} is not assigned to the caller")]
    UnitNotAssigned(Uuid),

    // --- not_found ---
    #[error("{0} not found")]
    NotFound(&'static str),

    // --- conflict ---
    #[error("illegal requisition transition from {from} to {to}")]
    IllegalTransition {
        from: RequisitionStatus,
        to: RequisitionStatus,
    },

    #[error("requisition is locked in status {0}")]
    RequisitionLocked(RequisitionStatus),

    #[error("duplicate code {0}")]
    DuplicateCode(String),

    #[error("email already exists")]
    EmailAlreadyExists,

    // --- internal_error ---
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("jwt error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Wire form of an error: machine-readable `kind` plus a localized message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) | AppError::InvalidUnitHeader => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::InactiveAccount => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) | AppError::UnitNotAssigned(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::IllegalTransition { .. }
            | AppError::RequisitionLocked(_)
            | AppError::DuplicateCode(_)
            | AppError::EmailAlreadyExists => StatusCode::CONFLICT,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "validation_error",
            StatusCode::UNAUTHORIZED => "authentication_error",
            StatusCode::FORBIDDEN => "authorization_error",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::CONFLICT => "conflict",
            _ => "internal_error",
        }
    }

    fn message_key(&self) -> (&'static str, Vec<(&'static str, String)>) {
        match self {
            AppError::ValidationError(_) => ("validation.invalid_fields", vec![]),
            AppError::InvalidInput(detail) => ("validation.invalid_input", vec![("detail", detail.clone())]),
            AppError::InvalidUnitHeader => ("validation.invalid_unit_header", vec![]),
            AppError::InvalidCredentials => ("auth.invalid_credentials", vec![]),
            AppError::InvalidToken => ("auth.invalid_token", vec![]),
            AppError::InactiveAccount => ("auth.inactive_account", vec![]),
            AppError::Forbidden(action) => ("access.forbidden", vec![("action", action.clone())]),
            AppError::UnitNotAssigned(unit) => ("access.unit_not_assigned", vec![("unit", unit.to_string())]),
            AppError::NotFound(resource) => ("resource.not_found", vec![("resource", resource.to_string())]),
            AppError::IllegalTransition { from, to } => (
                "workflow.illegal_transition",
                vec![("from", from.to_string()), ("to", to.to_string())],
            ),
            AppError::RequisitionLocked(status) => {
                ("workflow.requisition_locked", vec![("status", status.to_string())])
            }
            AppError::DuplicateCode(code) => ("conflict.duplicate_code", vec![("code", code.clone())]),
            AppError::EmailAlreadyExists => ("conflict.email_exists", vec![]),
            _ => ("internal.unexpected", vec![]),
        }
    }

    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        self.localized(&locale.0, store)
    }

    fn localized(&self, lang: &str, store: &I18nStore) -> ApiError {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Detail stays in the logs, never in the response.
            tracing::error!("Internal server error: {}", self);
        }

        let (key, args) = self.message_key();
        let details = match self {
            AppError::ValidationError(errors) => Some(validation_details(errors)),
            _ => None,
        };

        ApiError {
            status,
            kind: self.kind(),
            error: store.translate(lang, key, &args),
            details,
        }
    }
}

// Field -> list of messages, the shape the frontend forms consume.
fn validation_details(errors: &validator::ValidationErrors) -> Value {
    let mut details: HashMap<String, Vec<String>> = HashMap::new();
    for (field, field_errors) in errors.field_errors() {
        let messages = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        details.insert(field.to_string(), messages);
    }
    json!(details)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "kind": self.kind,
            "error": self.error,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.localized(DEFAULT_LANG, I18nStore::embedded()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_status_and_kind() {
        let cases: Vec<(AppError, StatusCode, &str)> = vec![
            (AppError::InvalidInput("x".into()), StatusCode::BAD_REQUEST, "validation_error"),
            (AppError::InvalidToken, StatusCode::UNAUTHORIZED, "authentication_error"),
            (AppError::Forbidden("approve".into()), StatusCode::FORBIDDEN, "authorization_error"),
            (AppError::NotFound("Product"), StatusCode::NOT_FOUND, "not_found"),
            (
                AppError::IllegalTransition {
                    from: RequisitionStatus::Completed,
                    to: RequisitionStatus::Draft,
                },
                StatusCode::CONFLICT,
                "conflict",
            ),
            (AppError::DuplicateCode("P-1".into()), StatusCode::CONFLICT, "conflict"),
            (
                AppError::InternalServerError(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];

        for (err, status, kind) in cases {
            assert_eq!(err.status(), status, "{err}");
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn illegal_transition_names_both_states() {
        let err = AppError::IllegalTransition {
            from: RequisitionStatus::Draft,
            to: RequisitionStatus::Approved,
        };
        let api = err.to_api_error(&Locale("en".into()), I18nStore::embedded());
        assert_eq!(api.error, "Illegal requisition transition from draft to approved.");
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let err = AppError::InternalServerError(anyhow::anyhow!("connection string postgres://secret"));
        let api = err.to_api_error(&Locale("en".into()), I18nStore::embedded());
        assert!(!api.error.contains("secret"));
        assert_eq!(api.kind, "internal_error");
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let mut errors = validator::ValidationErrors::new();
        let mut e = validator::ValidationError::new("range");
        e.message = Some("must be positive".into());
        errors.add("quantity", e);

        let api = AppError::ValidationError(errors).to_api_error(&Locale("en".into()), I18nStore::embedded());
        let details = api.details.expect("details");
        assert_eq!(details["quantity"][0], "must be positive");
    }
}
