// src/services/user_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Pagination},
    db::{user_repo::NewUser, UnitRepository, UserRepository},
    models::{
        auth::{User, UserProfile},
        user::{AssignUnitsPayload, CreateUserPayload, UpdateUserPayload, UserFilter},
    },
    services::{
        access::{Caller, Capability},
        auth::hash_password,
    },
};

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
    users: UserRepository,
    units: UnitRepository,
}

impl UserService {
    pub fn new(pool: PgPool, users: UserRepository, units: UnitRepository) -> Self {
        Self { pool, users, units }
    }

    pub async fn list(&self, caller: &Caller, filter: &UserFilter, page: &Pagination) -> Result<Vec<User>, AppError> {
        caller.require(Capability::ViewUsers)?;
        self.users
            .list(&self.pool, caller.scope().as_filter(), filter, page)
            .await
    }

    /// Callers always see themselves; other users only when they share a unit.
    pub async fn get(&self, caller: &Caller, id: Uuid) -> Result<UserProfile, AppError> {
        let user = self
            .users
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("User"))?;
        let units = self.users.memberships(&self.pool, id).await?;

        if id != caller.user_id {
            let shares_unit = caller.is_global() || units.iter().any(|m| caller.in_scope(m.unit_id));
            if !shares_unit {
                return Err(AppError::NotFound("User"));
            }
            caller.require(Capability::ViewUsers)?;
        }

        Ok(UserProfile { user, units })
    }

    pub async fn create(&self, caller: &Caller, payload: &CreateUserPayload) -> Result<UserProfile, AppError> {
        caller.require(Capability::ManageUsers)?;
        caller.check_role_management(payload.role)?;
        self.check_units(caller, &payload.unit_ids, payload.primary_unit_id).await?;

        let password_hash = hash_password(&payload.password).await?;

        let mut tx = self.pool.begin().await?;

        let user = self
            .users
            .create(
                &mut *tx,
                NewUser {
                    email: &payload.email,
                    password_hash: &password_hash,
                    first_name: &payload.first_name,
                    last_name: &payload.last_name,
                    phone: payload.phone.as_deref(),
                    role: payload.role,
                },
            )
            .await?;

        self.users
            .replace_assignments(&mut tx, user.id, &payload.unit_ids, payload.primary_unit_id)
            .await?;

        let units = self.users.memberships(&mut *tx, user.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, role = ?user.role, "User created");
        Ok(UserProfile { user, units })
    }

    /// Users may edit their own name, phone and password. Role and activation
    /// changes need the user-management capability.
    pub async fn update(&self, caller: &Caller, id: Uuid, payload: UpdateUserPayload) -> Result<User, AppError> {
        let mut user = self.get(caller, id).await?.user;

        let is_self = id == caller.user_id;
        let touches_admin_fields = payload.role.is_some() || payload.is_active.is_some();
        if !is_self || touches_admin_fields {
            caller.require(Capability::ManageUsers)?;
        }
        caller.check_role_management(user.role)?;
        if let Some(role) = payload.role {
            caller.check_role_management(role)?;
            user.role = role;
        }

        if let Some(first_name) = payload.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = payload.last_name {
            user.last_name = last_name;
        }
        if payload.phone.is_some() {
            user.phone = payload.phone;
        }
        if let Some(active) = payload.is_active {
            if !active && is_self {
                return Err(AppError::InvalidInput("you cannot deactivate your own account".into()));
            }
            user.is_active = active;
        }
        if let Some(password) = payload.password {
            user.password_hash = hash_password(&password).await?;
        }

        self.users.save(&self.pool, &user).await
    }

    pub async fn deactivate(&self, caller: &Caller, id: Uuid) -> Result<User, AppError> {
        self.update(
            caller,
            id,
            UpdateUserPayload {
                first_name: None,
                last_name: None,
                phone: None,
                role: None,
                is_active: Some(false),
                password: None,
            },
        )
        .await
    }

    /// Replaces the user's unit assignments in one transaction.
    pub async fn assign_units(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: &AssignUnitsPayload,
    ) -> Result<UserProfile, AppError> {
        let user = self.get(caller, id).await?.user;
        caller.require(Capability::ManageUsers)?;
        caller.check_role_management(user.role)?;
        self.check_units(caller, &payload.unit_ids, payload.primary_unit_id).await?;

        let mut tx = self.pool.begin().await?;
        self.users
            .replace_assignments(&mut tx, id, &payload.unit_ids, payload.primary_unit_id)
            .await?;
        let units = self.users.memberships(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %id, units = units.len(), "Unit assignments replaced");
        Ok(UserProfile { user, units })
    }

    async fn check_units(&self, caller: &Caller, unit_ids: &[Uuid], primary: Option<Uuid>) -> Result<(), AppError> {
        if let Some(primary) = primary {
            if !unit_ids.contains(&primary) {
                return Err(AppError::InvalidInput("primaryUnitId must be one of unitIds".into()));
            }
        }
        for unit_id in unit_ids {
            if !caller.in_scope(*unit_id) {
                return Err(AppError::UnitNotAssigned(*unit_id));
            }
        }
        let existing = self.units.existing_ids(&self.pool, unit_ids).await?;
        if unit_ids.iter().any(|id| !existing.contains(id)) {
            return Err(AppError::NotFound("Unit"));
        }
        Ok(())
    }
}
