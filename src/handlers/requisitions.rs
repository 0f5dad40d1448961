// src/handlers/requisitions.rs

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
        tenancy::Scope,
    },
    models::requisition::{
        CreateCommentPayload, CreateRequisitionPayload, Requisition, RequisitionComment, RequisitionDetail,
        RequisitionFilter, RequisitionItemPayload, RequisitionStats, TransitionPayload, UpdateRequisitionItemPayload,
        UpdateRequisitionPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/requisitions",
    tag = "Requisitions",
    params(RequisitionFilter, Pagination, ("x-current-unit" = Option<Uuid>, Header, description = "Narrow to one unit")),
    responses(
        (status = 200, description = "Requisitions in scope, newest first", body = Vec<Requisition>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_requisitions(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Query(filter): Query<RequisitionFilter>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let requisitions = app_state
        .requisition_service
        .list(&caller, &filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(requisitions)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requisitions",
    tag = "Requisitions",
    request_body = CreateRequisitionPayload,
    responses(
        (status = 201, description = "Draft requisition created with its items", body = RequisitionDetail),
        (status = 403, description = "Unit not assigned to the caller")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_requisition(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Json(payload): Json<CreateRequisitionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .requisition_service
        .create(&caller, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/api/v1/requisitions/stats",
    tag = "Requisitions",
    responses(
        (status = 200, description = "Counts and totals per status over the caller's scope", body = RequisitionStats)
    ),
    security(("api_jwt" = []))
)]
pub async fn requisition_stats(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
) -> Result<impl IntoResponse, ApiError> {
    let stats = app_state
        .requisition_service
        .stats(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(stats)))
}

#[utoipa::path(
    get,
    path = "/api/v1/requisitions/{id}",
    tag = "Requisitions",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "The requisition with its items", body = RequisitionDetail),
        (status = 404, description = "Unknown or out of scope")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_requisition(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .requisition_service
        .get(&caller, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

#[utoipa::path(
    put,
    path = "/api/v1/requisitions/{id}",
    tag = "Requisitions",
    request_body = UpdateRequisitionPayload,
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Header updated", body = RequisitionDetail),
        (status = 409, description = "Requisition is no longer editable")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_requisition(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRequisitionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .requisition_service
        .update(&caller, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/requisitions/{id}",
    tag = "Requisitions",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 204, description = "Draft requisition deleted"),
        (status = 409, description = "Only drafts can be deleted")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_requisition(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .requisition_service
        .delete(&caller, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Items
// ---

#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/items",
    tag = "Requisitions",
    request_body = RequisitionItemPayload,
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 201, description = "Item added; the total is recomputed", body = RequisitionDetail)
    ),
    security(("api_jwt" = []))
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
    Json(payload): Json<RequisitionItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .requisition_service
        .add_item(&caller, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    put,
    path = "/api/v1/requisitions/{id}/items/{item_id}",
    tag = "Requisitions",
    request_body = UpdateRequisitionItemPayload,
    params(
        ("id" = Uuid, Path, description = "Requisition ID"),
        ("item_id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item updated; the total is recomputed", body = RequisitionDetail)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateRequisitionItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .requisition_service
        .update_item(&caller, id, item_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/requisitions/{id}/items/{item_id}",
    tag = "Requisitions",
    params(
        ("id" = Uuid, Path, description = "Requisition ID"),
        ("item_id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item removed; the total is recomputed", body = RequisitionDetail)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .requisition_service
        .delete_item(&caller, id, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// ---
// Workflow
// ---

#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/transition",
    tag = "Requisitions",
    request_body = TransitionPayload,
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Status changed", body = RequisitionDetail),
        (status = 400, description = "Missing items or rejection reason"),
        (status = 403, description = "Caller may not perform this transition"),
        (status = 409, description = "Transition not allowed from the current status")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_requisition(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .requisition_service
        .transition(&caller, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// ---
// Comments
// ---

#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/comments",
    tag = "Requisitions",
    request_body = CreateCommentPayload,
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 201, description = "Comment added", body = RequisitionComment),
        (status = 404, description = "Unknown or out of scope")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_comment(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let comment = app_state
        .requisition_service
        .add_comment(&caller, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/requisitions/{id}/comments",
    tag = "Requisitions",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Comments, oldest first", body = Vec<RequisitionComment>),
        (status = 404, description = "Unknown or out of scope")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_comments(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = app_state
        .requisition_service
        .comments(&caller, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(comments)))
}
