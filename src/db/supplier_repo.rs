// src/db/supplier_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{like_pattern, map_unique_violation, map_write_error},
        error::AppError,
        pagination::Pagination,
    },
    models::supplier::{CreateSupplierPayload, Supplier, SupplierFilter},
};

#[derive(Clone, Default)]
pub struct SupplierRepository;

impl SupplierRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: Option<Vec<Uuid>>,
        filter: &SupplierFilter,
        page: &Pagination,
    ) -> Result<Vec<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT * FROM suppliers
            WHERE ($1::uuid[] IS NULL OR unit_id = ANY($1))
              AND ($2 OR is_active)
              AND ($3::text IS NULL OR name ILIKE $3 OR code ILIKE $3)
            ORDER BY name ASC
            OFFSET $4 LIMIT $5
            "#,
        )
        .bind(scope)
        .bind(filter.include_inactive.unwrap_or(false))
        .bind(filter.search.as_deref().map(like_pattern))
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(executor)
        .await?;
        Ok(suppliers)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(supplier)
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &CreateSupplierPayload) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (
                unit_id, name, code, contact_person, email, phone, address, city, country,
                tax_number, payment_terms, credit_limit, currency, rating
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(payload.unit_id)
        .bind(&payload.name)
        .bind(&payload.code)
        .bind(&payload.contact_person)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(&payload.address)
        .bind(&payload.city)
        .bind(&payload.country)
        .bind(&payload.tax_number)
        .bind(&payload.payment_terms)
        .bind(payload.credit_limit)
        .bind(&payload.currency)
        .bind(payload.rating)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, "Unit", |_| AppError::DuplicateCode(payload.code.clone())))
    }

    pub async fn save<'e, E>(&self, executor: E, supplier: &Supplier) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers SET
                name = $2, code = $3, contact_person = $4, email = $5, phone = $6,
                address = $7, city = $8, country = $9, tax_number = $10, payment_terms = $11,
                credit_limit = $12, currency = $13, rating = $14, is_active = $15,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.code)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(&supplier.city)
        .bind(&supplier.country)
        .bind(&supplier.tax_number)
        .bind(&supplier.payment_terms)
        .bind(supplier.credit_limit)
        .bind(&supplier.currency)
        .bind(supplier.rating)
        .bind(supplier.is_active)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::DuplicateCode(supplier.code.clone())))?
        .ok_or(AppError::NotFound("Supplier"))
    }
}
