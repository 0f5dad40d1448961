// src/db/unit_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError, pagination::Pagination},
    models::unit::{CreateUnitPayload, Unit},
};

#[derive(Clone, Default)]
pub struct UnitRepository;

impl UnitRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: Option<Vec<Uuid>>,
        include_inactive: bool,
        page: &Pagination,
    ) -> Result<Vec<Unit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let units = sqlx::query_as::<_, Unit>(
            r#"
            SELECT * FROM units
            WHERE ($1::uuid[] IS NULL OR id = ANY($1))
              AND ($2 OR is_active)
            ORDER BY name ASC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(scope)
        .bind(include_inactive)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(executor)
        .await?;
        Ok(units)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Unit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let unit = sqlx::query_as::<_, Unit>("SELECT * FROM units WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(unit)
    }

    /// Ids of the given units that exist.
    pub async fn existing_ids<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM units WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(found)
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &CreateUnitPayload) -> Result<Unit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Unit>(
            r#"
            INSERT INTO units (name, code, description, address, city, country)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&payload.name)
        .bind(&payload.code)
        .bind(&payload.description)
        .bind(&payload.address)
        .bind(&payload.city)
        .bind(&payload.country)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::DuplicateCode(payload.code.clone())))
    }

    /// Writes the mutable columns. The code never changes.
    pub async fn save<'e, E>(&self, executor: E, unit: &Unit) -> Result<Unit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Unit>(
            r#"
            UPDATE units SET
                name = $2, description = $3, address = $4, city = $5, country = $6,
                is_active = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(unit.id)
        .bind(&unit.name)
        .bind(&unit.description)
        .bind(&unit.address)
        .bind(&unit.city)
        .bind(&unit.country)
        .bind(unit.is_active)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Unit"))
    }
}
