// src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Categories (global, not unit-scoped) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductCategory {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub parent_category_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "The name is required."))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "The code is required."))]
    pub code: String,
    pub description: Option<String>,
    pub parent_category_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    pub description: Option<String>,
    pub parent_category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

// --- Products ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub unit_of_measure: String,
    pub standard_cost: Option<Decimal>,
    pub contract_price: Option<Decimal>,
    pub currency: String,
    pub current_stock_quantity: Decimal,
    pub minimum_stock_level: Decimal,
    pub maximum_stock_level: Decimal,
    pub reorder_point: Decimal,
    pub estimated_consumption_rate_per_day: Decimal,
    #[schema(value_type = Object)]
    pub specifications: Value,
    pub is_active: bool,
    pub last_restocked_at: Option<DateTime<Utc>>,
    pub last_consumption_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock position derived from the product's levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    LowStock,
    ReorderNeeded,
    Overstock,
    Normal,
}

/// A product as listed in the e-catalogue, with its derived figures.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueEntry {
    #[serde(flatten)]
    pub product: Product,
    pub effective_unit_price: Option<Decimal>,
    pub estimated_days_of_stock: Option<Decimal>,
    pub stock_status: StockStatus,
}

// ---
// Custom validators
// ---
pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0);
        err.message = Some("The value cannot be negative.".into());
        return Err(err);
    }
    Ok(())
}

fn default_unit_of_measure() -> String {
    "pieces".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_maximum_stock() -> Decimal {
    Decimal::from(1000)
}

fn default_reorder_point() -> Decimal {
    Decimal::from(10)
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    pub unit_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "The name is required."))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "The code is required."))]
    pub code: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    #[serde(default = "default_unit_of_measure")]
    #[validate(length(min = 1, max = 50))]
    pub unit_of_measure: String,
    pub standard_cost: Option<Decimal>,
    pub contract_price: Option<Decimal>,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code."))]
    pub currency: String,
    #[serde(default)]
    #[validate(custom(function = "validate_not_negative"))]
    pub current_stock_quantity: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_not_negative"))]
    pub minimum_stock_level: Decimal,
    #[serde(default = "default_maximum_stock")]
    #[validate(custom(function = "validate_not_negative"))]
    pub maximum_stock_level: Decimal,
    #[serde(default = "default_reorder_point")]
    #[validate(custom(function = "validate_not_negative"))]
    pub reorder_point: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_not_negative"))]
    pub estimated_consumption_rate_per_day: Decimal,
    #[serde(default = "empty_object")]
    #[schema(value_type = Object)]
    pub specifications: Value,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub code: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    #[validate(length(min = 1, max = 50))]
    pub unit_of_measure: Option<String>,
    pub standard_cost: Option<Decimal>,
    pub contract_price: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub minimum_stock_level: Option<Decimal>,
    pub maximum_stock_level: Option<Decimal>,
    pub reorder_point: Option<Decimal>,
    #[schema(value_type = Option<Object>)]
    pub specifications: Option<Value>,
    pub is_active: Option<bool>,
}

/// `PATCH /products/{id}/stock`: sets the absolute on-hand quantity.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdatePayload {
    #[validate(custom(function = "validate_not_negative"))]
    pub current_stock_quantity: Decimal,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
}

/// `PATCH /products/{id}/consumption`
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionUpdatePayload {
    #[validate(custom(function = "validate_not_negative"))]
    pub estimated_consumption_rate_per_day: Decimal,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    /// Case-insensitive match on name, code or description.
    pub search: Option<String>,
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CatalogueFilter {
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub search: Option<String>,
    pub stock_status: Option<StockStatus>,
    pub low_stock_only: Option<bool>,
}

impl CatalogueFilter {
    pub fn product_filter(&self) -> ProductFilter {
        ProductFilter {
            category_id: self.category_id,
            supplier_id: self.supplier_id,
            search: self.search.clone(),
            include_inactive: Some(false),
        }
    }
}
