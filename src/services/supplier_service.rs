// src/services/supplier_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Pagination},
    db::SupplierRepository,
    models::supplier::{CreateSupplierPayload, Supplier, SupplierFilter, UpdateSupplierPayload},
    services::access::{Caller, Capability},
};

fn check_credit_limit(limit: Option<Decimal>) -> Result<(), AppError> {
    if limit.is_some_and(|l| l < Decimal::ZERO) {
        return Err(AppError::InvalidInput("creditLimit cannot be negative".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct SupplierService {
    pool: PgPool,
    suppliers: SupplierRepository,
}

impl SupplierService {
    pub fn new(pool: PgPool, suppliers: SupplierRepository) -> Self {
        Self { pool, suppliers }
    }

    pub async fn list(
        &self,
        caller: &Caller,
        filter: &SupplierFilter,
        page: &Pagination,
    ) -> Result<Vec<Supplier>, AppError> {
        self.suppliers
            .list(&self.pool, caller.scope().as_filter(), filter, page)
            .await
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> Result<Supplier, AppError> {
        let supplier = self
            .suppliers
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Supplier"))?;
        caller.check(supplier.unit_id, Capability::ReadScoped, "Supplier")?;
        Ok(supplier)
    }

    pub async fn create(&self, caller: &Caller, payload: &CreateSupplierPayload) -> Result<Supplier, AppError> {
        caller.check_target_unit(payload.unit_id, Capability::WriteCatalogue)?;
        check_credit_limit(payload.credit_limit)?;

        let supplier = self.suppliers.create(&self.pool, payload).await?;
        tracing::info!(supplier_id = %supplier.id, code = %supplier.code, "Supplier created");
        Ok(supplier)
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: UpdateSupplierPayload,
    ) -> Result<Supplier, AppError> {
        let mut supplier = self.get(caller, id).await?;
        caller.require(Capability::WriteCatalogue)?;
        check_credit_limit(payload.credit_limit)?;

        if let Some(name) = payload.name {
            supplier.name = name;
        }
        if let Some(code) = payload.code {
            supplier.code = code;
        }
        if payload.contact_person.is_some() {
            supplier.contact_person = payload.contact_person;
        }
        if payload.email.is_some() {
            supplier.email = payload.email;
        }
        if payload.phone.is_some() {
            supplier.phone = payload.phone;
        }
        if payload.address.is_some() {
            supplier.address = payload.address;
        }
        if payload.city.is_some() {
            supplier.city = payload.city;
        }
        if payload.country.is_some() {
            supplier.country = payload.country;
        }
        if payload.tax_number.is_some() {
            supplier.tax_number = payload.tax_number;
        }
        if payload.payment_terms.is_some() {
            supplier.payment_terms = payload.payment_terms;
        }
        if payload.credit_limit.is_some() {
            supplier.credit_limit = payload.credit_limit;
        }
        if let Some(currency) = payload.currency {
            supplier.currency = currency;
        }
        if payload.rating.is_some() {
            supplier.rating = payload.rating;
        }
        if let Some(active) = payload.is_active {
            supplier.is_active = active;
        }

        self.suppliers.save(&self.pool, &supplier).await
    }

    pub async fn deactivate(&self, caller: &Caller, id: Uuid) -> Result<Supplier, AppError> {
        let mut supplier = self.get(caller, id).await?;
        caller.require(Capability::WriteCatalogue)?;
        supplier.is_active = false;
        self.suppliers.save(&self.pool, &supplier).await
    }
}
