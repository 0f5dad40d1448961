// src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Addresses every user able to review requisitions in the unit.
pub const APPROVER_ROLE: &str = "approver";

pub const SOURCE_REQUISITION: &str = "requisition";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub recipient_user_id: Option<Uuid>,
    pub recipient_role: Option<String>,
    pub title: String,
    pub message: String,
    pub source_type: String,
    pub source_id: Uuid,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Who a new notification goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    User(Uuid),
    Role(&'static str),
}

/// A notification to be written, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub unit_id: Uuid,
    pub recipient: Recipient,
    pub title: String,
    pub message: String,
    pub source_type: &'static str,
    pub source_id: Uuid,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationFilter {
    pub unread_only: Option<bool>,
}
