// src/handlers/products.rs

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
        rbac::{PermWriteCatalogue, RequirePermission},
        tenancy::Scope,
    },
    models::product::{
        CatalogueEntry, CatalogueFilter, ConsumptionUpdatePayload, CreateCategoryPayload,
        CreateProductPayload, Product, ProductCategory, ProductFilter, StockUpdatePayload,
        UpdateCategoryPayload, UpdateProductPayload,
    },
};

// ---
// Categories
// ---

#[utoipa::path(
    get,
    path = "/api/v1/products/categories",
    tag = "Products",
    responses(
        (status = 200, description = "All product categories", body = Vec<ProductCategory>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(_caller): Scope,
) -> Result<impl IntoResponse, ApiError> {
    let categories = app_state
        .product_service
        .list_categories()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(categories)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/categories",
    tag = "Products",
    request_body = CreateCategoryPayload,
    responses(
        (status = 201, description = "Category created", body = ProductCategory),
        (status = 409, description = "Category name already exists")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWriteCatalogue>,
    Scope(caller): Scope,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .product_service
        .create_category(&caller, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/categories/{id}",
    tag = "Products",
    request_body = UpdateCategoryPayload,
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category updated", body = ProductCategory),
        (status = 404, description = "Unknown category or parent"),
        (status = 409, description = "Category name or code already exists")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_category(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWriteCatalogue>,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .product_service
        .update_category(&caller, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(category)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/categories/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deactivated", body = ProductCategory),
        (status = 400, description = "Active products still use the category"),
        (status = 404, description = "Unknown category")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_category(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWriteCatalogue>,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = app_state
        .product_service
        .deactivate_category(&caller, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(category)))
}

// ---
// Products
// ---

#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "Products",
    params(ProductFilter, Pagination, ("x-current-unit" = Option<Uuid>, Header, description = "Narrow to one unit")),
    responses(
        (status = 200, description = "Products in scope", body = Vec<Product>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .product_service
        .list(&caller, &filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(products)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/e-catalogue",
    tag = "Products",
    params(CatalogueFilter, Pagination, ("x-current-unit" = Option<Uuid>, Header, description = "Narrow to one unit")),
    responses(
        (status = 200, description = "Active products with effective price, days of stock and stock status", body = Vec<CatalogueEntry>)
    ),
    security(("api_jwt" = []))
)]
pub async fn e_catalogue(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Query(filter): Query<CatalogueFilter>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = app_state
        .product_service
        .catalogue(&caller, &filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(entries)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 409, description = "Product code already used in this unit")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .product_service
        .create(&caller, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "The product with its derived figures", body = CatalogueEntry),
        (status = 404, description = "Unknown or out of scope")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = app_state
        .product_service
        .get_entry(&caller, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(entry)))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    tag = "Products",
    request_body = UpdateProductPayload,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product updated", body = Product)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .product_service
        .update(&caller, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(product)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deactivated", body = Product)
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state
        .product_service
        .deactivate(&caller, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(product)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/products/{id}/stock",
    tag = "Products",
    request_body = StockUpdatePayload,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Stock set; a stock-count movement is recorded", body = CatalogueEntry)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockUpdatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let entry = app_state
        .product_service
        .update_stock(&caller, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(entry)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/products/{id}/consumption",
    tag = "Products",
    request_body = ConsumptionUpdatePayload,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Daily consumption rate updated", body = CatalogueEntry)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_consumption(
    State(app_state): State<AppState>,
    locale: Locale,
    Scope(caller): Scope,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConsumptionUpdatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let entry = app_state
        .product_service
        .update_consumption(&caller, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(entry)))
}
