// src/models/user.rs

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::Role;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(email(message = "The email address is invalid."))]
    pub email: String,
    #[validate(length(min = 8, message = "The password must have at least 8 characters."))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "The first name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "The last name is required."))]
    pub last_name: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub unit_ids: Vec<Uuid>,
    pub primary_unit_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    #[validate(length(min = 8, message = "The password must have at least 8 characters."))]
    pub password: Option<String>,
}

/// Replaces every unit assignment of a user.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignUnitsPayload {
    pub unit_ids: Vec<Uuid>,
    pub primary_unit_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub unit_id: Option<Uuid>,
    pub search: Option<String>,
}
