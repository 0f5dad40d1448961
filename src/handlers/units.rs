// src/handlers/units.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        pagination::Pagination,
    },
    config::AppState,
    middleware::{
        extract::{Json, Path, Query},
        i18n::Locale,
        rbac::{PermManageUnits, RequirePermission},
        tenancy::Scope,
    },
    models::unit::{CreateUnitPayload, Unit, UpdateUnitPayload},
};

#[utoipa::path(
    get,
    path = "/api/v1/units",
    tag = "Units",
    params(Pagination),
    responses(
        (status = 200, description = "Units visible to the caller", body = Vec<Unit>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_units(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let units = app_state
        .unit_service
        .list(&caller, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(units)))
}

#[utoipa::path(
    post,
    path = "/api/v1/units",
    tag = "Units",
    request_body = CreateUnitPayload,
    responses(
        (status = 201, description = "Unit created", body = Unit),
        (status = 403, description = "Missing the manage-units capability"),
        (status = 409, description = "Unit code already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_unit(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageUnits>,
    Scope(caller): Scope,
    Json(payload): Json<CreateUnitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let unit = app_state
        .unit_service
        .create(&caller, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(unit)))
}

#[utoipa::path(
    get,
    path = "/api/v1/units/{id}",
    tag = "Units",
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "The unit", body = Unit),
        (status = 404, description = "Unknown or out of scope")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_unit(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let unit = app_state
        .unit_service
        .get(&caller, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(unit)))
}

#[utoipa::path(
    put,
    path = "/api/v1/units/{id}",
    tag = "Units",
    request_body = UpdateUnitPayload,
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit updated", body = Unit)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_unit(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageUnits>,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUnitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let unit = app_state
        .unit_service
        .update(&caller, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(unit)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/units/{id}",
    tag = "Units",
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit deactivated", body = Unit)
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_unit(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageUnits>,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let unit = app_state
        .unit_service
        .deactivate(&caller, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(unit)))
}
