// src/common/db_utils.rs

use crate::common::error::AppError;

// ---
// Unique-violation mapping
// ---
// Repositories pass the raw sqlx error plus a closure that turns the
// violated constraint name into a domain conflict. Anything else is a
// plain database error.
pub(crate) fn map_unique_violation<F>(err: sqlx::Error, on_unique: F) -> AppError
where
    F: FnOnce(&str) -> AppError,
{
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            return on_unique(constraint);
        }
    }
    err.into()
}

/// A dangling reference (unknown category, supplier, unit...) reads as a missing resource.
pub(crate) fn map_foreign_key_violation(err: sqlx::Error, resource: &'static str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() {
            return AppError::NotFound(resource);
        }
    }
    err.into()
}

/// Postgres CHECK violations surface as `InvalidInput` naming the constraint.
pub(crate) fn map_check_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_check_violation() {
            let constraint = db_err.constraint().unwrap_or("check").to_string();
            return AppError::InvalidInput(constraint);
        }
    }
    err.into()
}

/// Combined mapping for inserts and updates that can hit a unique key,
/// a foreign key (`reference` names the referenced resource) or a CHECK.
pub(crate) fn map_write_error<F>(err: sqlx::Error, reference: &'static str, on_unique: F) -> AppError
where
    F: FnOnce(&str) -> AppError,
{
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() {
            return AppError::NotFound(reference);
        }
        if db_err.is_check_violation() {
            return AppError::InvalidInput(db_err.constraint().unwrap_or("check").to_string());
        }
    }
    map_unique_violation(err, on_unique)
}

/// Escapes `%`, `_` and `\` so user search text is matched literally by ILIKE.
pub(crate) fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("towel"), "%towel%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn non_database_errors_pass_through() {
        let err = map_unique_violation(sqlx::Error::RowNotFound, |_| AppError::EmailAlreadyExists);
        assert!(matches!(err, AppError::DatabaseError(sqlx::Error::RowNotFound)));
    }
}
