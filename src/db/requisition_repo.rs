// src/db/requisition_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_write_error, error::AppError, pagination::Pagination},
    models::{
        auth::Role,
        requisition::{
            CreateCommentPayload, CreateRequisitionPayload, Requisition, RequisitionComment, RequisitionFilter,
            RequisitionItem, StatusTotals,
        },
    },
    services::catalogue,
};

/// A line item ready to be written; prices are already resolved.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub estimated_unit_price: Decimal,
    pub notes: Option<String>,
}

impl NewItem {
    /// Never client-settable.
    pub fn total_price(&self) -> Decimal {
        catalogue::to_money_scale(self.quantity * self.estimated_unit_price)
    }
}

#[derive(Clone, Default)]
pub struct RequisitionRepository;

impl RequisitionRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Header
    // ---

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: Option<Vec<Uuid>>,
        filter: &RequisitionFilter,
        page: &Pagination,
    ) -> Result<Vec<Requisition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requisitions = sqlx::query_as::<_, Requisition>(
            r#"
            SELECT * FROM requisitions
            WHERE ($1::uuid[] IS NULL OR unit_id = ANY($1))
              AND ($2::requisition_status IS NULL OR status = $2)
              AND ($3::requisition_priority IS NULL OR priority = $3)
            ORDER BY created_at DESC
            OFFSET $4 LIMIT $5
            "#,
        )
        .bind(scope)
        .bind(filter.status)
        .bind(filter.priority)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(executor)
        .await?;
        Ok(requisitions)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Requisition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requisition = sqlx::query_as::<_, Requisition>("SELECT * FROM requisitions WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(requisition)
    }

    /// Locks the header row until the surrounding transaction ends.
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Requisition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requisition =
            sqlx::query_as::<_, Requisition>("SELECT * FROM requisitions WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(requisition)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        payload: &CreateRequisitionPayload,
        requested_by: Uuid,
    ) -> Result<Requisition, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Requisition>(
            r#"
            INSERT INTO requisitions (
                unit_id, requested_by, title, description, department, priority,
                required_date, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(payload.unit_id)
        .bind(requested_by)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.department)
        .bind(payload.priority)
        .bind(payload.required_date)
        .bind(&payload.currency)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, "Unit", |c| AppError::DuplicateCode(c.to_string())))
    }

    pub async fn save_header<'e, E>(&self, executor: E, requisition: &Requisition) -> Result<Requisition, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Requisition>(
            r#"
            UPDATE requisitions SET
                title = $2, description = $3, department = $4, priority = $5,
                required_date = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(requisition.id)
        .bind(&requisition.title)
        .bind(&requisition.description)
        .bind(&requisition.department)
        .bind(requisition.priority)
        .bind(requisition.required_date)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Requisition"))
    }

    /// Persists the status and every timestamp/reviewer column the workflow touches.
    pub async fn save_status<'e, E>(&self, executor: E, requisition: &Requisition) -> Result<Requisition, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Requisition>(
            r#"
            UPDATE requisitions SET
                status = $2, reviewed_by = $3, approval_notes = $4,
                submitted_at = $5, reviewed_at = $6, approved_at = $7,
                rejected_at = $8, rejection_reason = $9, cancelled_at = $10,
                completed_at = $11, updated_at = $12
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(requisition.id)
        .bind(requisition.status)
        .bind(requisition.reviewed_by)
        .bind(&requisition.approval_notes)
        .bind(requisition.submitted_at)
        .bind(requisition.reviewed_at)
        .bind(requisition.approved_at)
        .bind(requisition.rejected_at)
        .bind(&requisition.rejection_reason)
        .bind(requisition.cancelled_at)
        .bind(requisition.completed_at)
        .bind(requisition.updated_at)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Requisition"))
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM requisitions WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Requisition"));
        }
        Ok(())
    }

    /// Sets the header total to the sum of its items and returns it.
    pub async fn recompute_total<'e, E>(&self, executor: E, id: Uuid) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: Decimal = sqlx::query_scalar(
            r#"
            UPDATE requisitions SET
                total_estimated_amount = (
                    SELECT COALESCE(SUM(estimated_total_price), 0)
                    FROM requisition_items WHERE requisition_id = $1
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING total_estimated_amount
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    // ---
    // Items
    // ---

    pub async fn items<'e, E>(&self, executor: E, requisition_id: Uuid) -> Result<Vec<RequisitionItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, RequisitionItem>(
            "SELECT * FROM requisition_items WHERE requisition_id = $1 ORDER BY line_number",
        )
        .bind(requisition_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn item_count<'e, E>(&self, executor: E, requisition_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM requisition_items WHERE requisition_id = $1")
            .bind(requisition_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn find_item<'e, E>(
        &self,
        executor: E,
        requisition_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<RequisitionItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, RequisitionItem>(
            "SELECT * FROM requisition_items WHERE id = $1 AND requisition_id = $2",
        )
        .bind(item_id)
        .bind(requisition_id)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    /// Appends a line after the current last one. The header row must be
    /// locked by the caller so line numbers cannot race.
    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        requisition_id: Uuid,
        item: &NewItem,
    ) -> Result<RequisitionItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RequisitionItem>(
            r#"
            INSERT INTO requisition_items (
                requisition_id, line_number, product_id, product_name, description,
                quantity, unit_of_measure, estimated_unit_price, estimated_total_price, notes
            )
            VALUES (
                $1,
                (SELECT COALESCE(MAX(line_number), 0) + 1 FROM requisition_items WHERE requisition_id = $1),
                $2, $3, $4, $5, $6, $7, $8, $9
            )
            RETURNING *
            "#,
        )
        .bind(requisition_id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(&item.unit_of_measure)
        .bind(item.estimated_unit_price)
        .bind(item.total_price())
        .bind(&item.notes)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, "Product", |c| AppError::DuplicateCode(c.to_string())))
    }

    pub async fn update_item<'e, E>(
        &self,
        executor: E,
        item_id: Uuid,
        item: &NewItem,
    ) -> Result<RequisitionItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RequisitionItem>(
            r#"
            UPDATE requisition_items SET
                product_name = $2, description = $3, quantity = $4, unit_of_measure = $5,
                estimated_unit_price = $6, estimated_total_price = $7, notes = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(&item.product_name)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(&item.unit_of_measure)
        .bind(item.estimated_unit_price)
        .bind(item.total_price())
        .bind(&item.notes)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("RequisitionItem"))
    }

    pub async fn delete_item<'e, E>(&self, executor: E, requisition_id: Uuid, item_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM requisition_items WHERE id = $1 AND requisition_id = $2")
            .bind(item_id)
            .bind(requisition_id)
            .execute(executor)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("RequisitionItem"));
        }
        Ok(())
    }

    // ---
    // Comments
    // ---

    pub async fn insert_comment<'e, E>(
        &self,
        executor: E,
        requisition_id: Uuid,
        author_id: Uuid,
        author_role: Role,
        payload: &CreateCommentPayload,
    ) -> Result<RequisitionComment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let comment = sqlx::query_as::<_, RequisitionComment>(
            r#"
            INSERT INTO requisition_comments (
                requisition_id, author_id, author_role, comment_text, comment_type, is_internal
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(requisition_id)
        .bind(author_id)
        .bind(author_role)
        .bind(&payload.comment_text)
        .bind(payload.comment_type)
        .bind(payload.is_internal)
        .fetch_one(executor)
        .await?;
        Ok(comment)
    }

    /// Oldest first.
    pub async fn comments<'e, E>(&self, executor: E, requisition_id: Uuid) -> Result<Vec<RequisitionComment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let comments = sqlx::query_as::<_, RequisitionComment>(
            "SELECT * FROM requisition_comments WHERE requisition_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(requisition_id)
        .fetch_all(executor)
        .await?;
        Ok(comments)
    }

    // ---
    // Stats
    // ---

    pub async fn status_totals<'e, E>(&self, executor: E, scope: Option<Vec<Uuid>>) -> Result<Vec<StatusTotals>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, StatusTotals>(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total_estimated_amount), 0) AS amount
            FROM requisitions
            WHERE ($1::uuid[] IS NULL OR unit_id = ANY($1))
            GROUP BY status
            "#,
        )
        .bind(scope)
        .fetch_all(executor)
        .await?;
        Ok(totals)
    }

    /// Mean hours from submission to approval.
    pub async fn average_approval_hours<'e, E>(&self, executor: E, scope: Option<Vec<Uuid>>) -> Result<Option<f64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let hours: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT (AVG(EXTRACT(EPOCH FROM (approved_at - submitted_at))) / 3600.0)::float8
            FROM requisitions
            WHERE ($1::uuid[] IS NULL OR unit_id = ANY($1))
              AND approved_at IS NOT NULL AND submitted_at IS NOT NULL
            "#,
        )
        .bind(scope)
        .fetch_one(executor)
        .await?;
        Ok(hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(quantity: Decimal, price: Decimal) -> NewItem {
        NewItem {
            product_id: None,
            product_name: "Shampoo 30ml".into(),
            description: None,
            quantity,
            unit_of_measure: "pieces".into(),
            estimated_unit_price: price,
            notes: None,
        }
    }

    #[test]
    fn total_price_is_quantity_times_unit_price() {
        assert_eq!(item(dec!(3), dec!(2.50)).total_price(), dec!(7.50));
        assert_eq!(item(dec!(1.5), dec!(0.333)).total_price(), dec!(0.50));
    }
}
