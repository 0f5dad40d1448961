// src/db/stock_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_check_violation, error::AppError, pagination::Pagination},
    models::stock::{MovementType, StockMovement},
    services::catalogue::PlannedMovement,
};

// Append-only: there is no update or delete here.
#[derive(Clone, Default)]
pub struct StockRepository;

impl StockRepository {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_movement<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        unit_id: Uuid,
        movement_type: MovementType,
        planned: &PlannedMovement,
        reason: Option<&str>,
        reference: Option<&str>,
        created_by: Uuid,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (
                product_id, unit_id, movement_type, quantity, previous_stock, new_stock,
                reason, reference, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(unit_id)
        .bind(movement_type)
        .bind(planned.quantity)
        .bind(planned.previous_stock)
        .bind(planned.new_stock)
        .bind(reason)
        .bind(reference)
        .bind(created_by)
        .fetch_one(executor)
        .await
        .map_err(map_check_violation)
    }

    /// Newest first.
    pub async fn list_movements<'e, E>(
        &self,
        executor: E,
        scope: Option<Vec<Uuid>>,
        product_id: Option<Uuid>,
        page: &Pagination,
    ) -> Result<Vec<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE ($1::uuid[] IS NULL OR unit_id = ANY($1))
              AND ($2::uuid IS NULL OR product_id = $2)
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(scope)
        .bind(product_id)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(executor)
        .await?;
        Ok(movements)
    }
}
