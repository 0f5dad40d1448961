// src/models/stock.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::product::StockStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "stock_movement_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Receipt,
    Issue,
    Adjustment,
    StockCount,
}

// --- STOCK MOVEMENT (append-only ledger) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub unit_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// `POST /stock/adjustments`
///
/// `quantity` is a signed delta for receipts (positive), issues (negative)
/// and adjustments (either sign). For a stock count it is the counted
/// absolute level.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentPayload {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
}

/// A product that needs replenishment.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub product_id: Uuid,
    pub unit_id: Uuid,
    pub code: String,
    pub name: String,
    pub unit_of_measure: String,
    pub current_stock_quantity: Decimal,
    pub minimum_stock_level: Decimal,
    pub reorder_point: Decimal,
    pub maximum_stock_level: Decimal,
    pub stock_status: StockStatus,
    pub estimated_days_of_stock: Option<Decimal>,
    pub suggested_reorder_quantity: Decimal,
}
