// src/services/unit_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Pagination},
    db::UnitRepository,
    models::unit::{CreateUnitPayload, Unit, UpdateUnitPayload},
    services::access::{Caller, Capability},
};

#[derive(Clone)]
pub struct UnitService {
    pool: PgPool,
    units: UnitRepository,
}

impl UnitService {
    pub fn new(pool: PgPool, units: UnitRepository) -> Self {
        Self { pool, units }
    }

    /// Units visible to the caller. Inactive units only show up for unit managers.
    pub async fn list(&self, caller: &Caller, page: &Pagination) -> Result<Vec<Unit>, AppError> {
        let include_inactive = caller.can(Capability::ManageUnits);
        self.units
            .list(&self.pool, caller.scope().as_filter(), include_inactive, page)
            .await
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> Result<Unit, AppError> {
        let unit = self
            .units
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Unit"))?;
        caller.check(unit.id, Capability::ReadScoped, "Unit")?;
        Ok(unit)
    }

    pub async fn create(&self, caller: &Caller, payload: &CreateUnitPayload) -> Result<Unit, AppError> {
        caller.require(Capability::ManageUnits)?;
        let unit = self.units.create(&self.pool, payload).await?;
        tracing::info!(unit_id = %unit.id, code = %unit.code, "Unit created");
        Ok(unit)
    }

    pub async fn update(&self, caller: &Caller, id: Uuid, payload: UpdateUnitPayload) -> Result<Unit, AppError> {
        let mut unit = self.get(caller, id).await?;
        caller.require(Capability::ManageUnits)?;

        if let Some(name) = payload.name {
            unit.name = name;
        }
        if payload.description.is_some() {
            unit.description = payload.description;
        }
        if payload.address.is_some() {
            unit.address = payload.address;
        }
        if payload.city.is_some() {
            unit.city = payload.city;
        }
        if payload.country.is_some() {
            unit.country = payload.country;
        }
        if let Some(active) = payload.is_active {
            unit.is_active = active;
        }

        self.units.save(&self.pool, &unit).await
    }

    /// Soft delete. History attached to the unit is left untouched.
    pub async fn deactivate(&self, caller: &Caller, id: Uuid) -> Result<Unit, AppError> {
        let mut unit = self.get(caller, id).await?;
        caller.require(Capability::ManageUnits)?;
        unit.is_active = false;
        let unit = self.units.save(&self.pool, &unit).await?;
        tracing::info!(unit_id = %unit.id, "Unit deactivated");
        Ok(unit)
    }
}
