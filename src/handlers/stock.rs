// src/handlers/stock.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        pagination::Pagination,
    },
    config::AppState,
    middleware::{
        extract::{Json, Query},
        i18n::Locale,
        tenancy::Scope,
    },
    models::stock::{MovementFilter, StockAdjustmentPayload, StockAlert, StockMovement},
};

#[utoipa::path(
    post,
    path = "/api/v1/stock/adjustments",
    tag = "Stock",
    request_body = StockAdjustmentPayload,
    responses(
        (status = 201, description = "Movement recorded and stock updated", body = StockMovement),
        (status = 400, description = "The movement would leave stock negative")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_adjustment(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Json(payload): Json<StockAdjustmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let movement = app_state
        .stock_service
        .adjust(&caller, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(movement)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/movements",
    tag = "Stock",
    params(MovementFilter, Pagination),
    responses(
        (status = 200, description = "Movement history, newest first", body = Vec<StockMovement>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Query(filter): Query<MovementFilter>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state
        .stock_service
        .movements(&caller, &filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(movements)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/alerts",
    tag = "Stock",
    responses(
        (status = 200, description = "Products at or below their reorder level, with suggested quantities", body = Vec<StockAlert>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_alerts(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
) -> Result<impl IntoResponse, ApiError> {
    let alerts = app_state
        .stock_service
        .alerts(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(alerts)))
}
