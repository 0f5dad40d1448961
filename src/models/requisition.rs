// src/models/requisition.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::auth::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "requisition_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequisitionStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl RequisitionStatus {
    pub const ALL: [RequisitionStatus; 7] = [
        RequisitionStatus::Draft,
        RequisitionStatus::Submitted,
        RequisitionStatus::UnderReview,
        RequisitionStatus::Approved,
        RequisitionStatus::Rejected,
        RequisitionStatus::Cancelled,
        RequisitionStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequisitionStatus::Draft => "draft",
            RequisitionStatus::Submitted => "submitted",
            RequisitionStatus::UnderReview => "under_review",
            RequisitionStatus::Approved => "approved",
            RequisitionStatus::Rejected => "rejected",
            RequisitionStatus::Cancelled => "cancelled",
            RequisitionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "requisition_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Requisition {
    pub id: Uuid,
    pub requisition_number: String,
    pub unit_id: Uuid,
    pub requested_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub priority: Priority,
    pub status: RequisitionStatus,
    pub required_date: NaiveDate,
    pub total_estimated_amount: Decimal,
    pub currency: String,
    pub approval_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionItem {
    pub id: Uuid,
    pub requisition_id: Uuid,
    pub line_number: i32,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub estimated_unit_price: Decimal,
    pub estimated_total_price: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Header plus lines
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionDetail {
    #[serde(flatten)]
    pub requisition: Requisition,
    pub items: Vec<RequisitionItem>,
}

fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("The quantity must be greater than zero.".into());
        return Err(err);
    }
    Ok(())
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionItemPayload {
    pub product_id: Option<Uuid>,
    /// Required when no product is referenced; defaults to the product name otherwise.
    #[validate(length(min = 1, max = 200))]
    pub product_name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 50))]
    pub unit_of_measure: Option<String>,
    /// Defaults to the product's effective unit price.
    pub estimated_unit_price: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequisitionItemPayload {
    #[validate(length(min = 1, max = 200))]
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    #[validate(length(min = 1, max = 50))]
    pub unit_of_measure: Option<String>,
    pub estimated_unit_price: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequisitionPayload {
    pub unit_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "The title is required."))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub required_date: NaiveDate,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code."))]
    pub currency: String,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<RequisitionItemPayload>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequisitionPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    pub priority: Option<Priority>,
    pub required_date: Option<NaiveDate>,
}

/// `POST /requisitions/{id}/transition`
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    pub status: RequisitionStatus,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RequisitionFilter {
    pub status: Option<RequisitionStatus>,
    pub unit_id: Option<Uuid>,
    pub priority: Option<Priority>,
}

// --- Comments ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "comment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommentType {
    #[default]
    General,
    Approval,
    Clarification,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionComment {
    pub id: Uuid,
    pub requisition_id: Uuid,
    pub author_id: Uuid,
    pub author_role: Role,
    pub comment_text: String,
    pub comment_type: CommentType,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

fn default_internal() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentPayload {
    #[validate(length(min = 1, max = 4000, message = "The comment text is required."))]
    pub comment_text: String,
    #[serde(default)]
    pub comment_type: CommentType,
    /// Internal comments stay within the hotel staff.
    #[serde(default = "default_internal")]
    pub is_internal: bool,
}

/// Per-status row of the stats query.
#[derive(Debug, Clone, FromRow)]
pub struct StatusTotals {
    pub status: RequisitionStatus,
    pub count: i64,
    pub amount: Decimal,
}

#[derive(Debug, Default, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionStats {
    pub total_requisitions: i64,
    pub draft_count: i64,
    pub submitted_count: i64,
    pub under_review_count: i64,
    pub approved_count: i64,
    pub rejected_count: i64,
    pub cancelled_count: i64,
    pub completed_count: i64,
    /// Sum of the estimated totals of every requisition in scope.
    pub total_value: Decimal,
    pub average_approval_time_hours: Option<f64>,
}
