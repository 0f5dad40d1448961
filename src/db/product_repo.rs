// src/db/product_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{like_pattern, map_write_error},
        error::AppError,
        pagination::Pagination,
    },
    models::product::{CreateCategoryPayload, CreateProductPayload, Product, ProductCategory, ProductFilter},
};

#[derive(Clone, Default)]
pub struct ProductRepository;

impl ProductRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Categories
    // ---

    pub async fn list_categories<'e, E>(&self, executor: E, include_inactive: bool) -> Result<Vec<ProductCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, ProductCategory>(
            "SELECT * FROM product_categories WHERE ($1 OR is_active) ORDER BY name ASC",
        )
        .bind(include_inactive)
        .fetch_all(executor)
        .await?;
        Ok(categories)
    }

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        payload: &CreateCategoryPayload,
    ) -> Result<ProductCategory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProductCategory>(
            r#"
            INSERT INTO product_categories (name, code, description, parent_category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&payload.name)
        .bind(&payload.code)
        .bind(&payload.description)
        .bind(payload.parent_category_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_write_error(e, "ProductCategory", |constraint| {
                if constraint.contains("name") {
                    AppError::DuplicateCode(payload.name.clone())
                } else {
                    AppError::DuplicateCode(payload.code.clone())
                }
            })
        })
    }

    pub async fn find_category<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<ProductCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, ProductCategory>("SELECT * FROM product_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(category)
    }

    pub async fn save_category<'e, E>(&self, executor: E, category: &ProductCategory) -> Result<ProductCategory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProductCategory>(
            r#"
            UPDATE product_categories
            SET name = $2, code = $3, description = $4, parent_category_id = $5,
                is_active = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.code)
        .bind(&category.description)
        .bind(category.parent_category_id)
        .bind(category.is_active)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_write_error(e, "Parent category", |constraint| {
                if constraint.contains("name") {
                    AppError::DuplicateCode(category.name.clone())
                } else {
                    AppError::DuplicateCode(category.code.clone())
                }
            })
        })
    }

    /// Active products still filed under the category, across all units.
    pub async fn count_active_in_category<'e, E>(&self, executor: E, category_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1 AND is_active")
                .bind(category_id)
                .fetch_one(executor)
                .await?;
        Ok(count)
    }

    // ---
    // Products
    // ---

    /// Products in scope matching the SQL-side filters. `page` is optional so
    /// the e-catalogue can filter on derived figures before paginating.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: Option<Vec<Uuid>>,
        filter: &ProductFilter,
        page: Option<&Pagination>,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (offset, limit) = match page {
            Some(p) => (p.offset(), Some(p.limit())),
            None => (0, None),
        };

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE ($1::uuid[] IS NULL OR unit_id = ANY($1))
              AND ($2 OR is_active)
              AND ($3::uuid IS NULL OR category_id = $3)
              AND ($4::uuid IS NULL OR supplier_id = $4)
              AND ($5::text IS NULL OR name ILIKE $5 OR code ILIKE $5 OR description ILIKE $5)
            ORDER BY name ASC
            OFFSET $6 LIMIT $7
            "#,
        )
        .bind(scope)
        .bind(filter.include_inactive.unwrap_or(false))
        .bind(filter.category_id)
        .bind(filter.supplier_id)
        .bind(filter.search.as_deref().map(like_pattern))
        .bind(offset)
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(products)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    /// Locks the row until the surrounding transaction ends.
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &CreateProductPayload) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                unit_id, name, code, description, category_id, supplier_id, unit_of_measure,
                standard_cost, contract_price, currency, current_stock_quantity,
                minimum_stock_level, maximum_stock_level, reorder_point,
                estimated_consumption_rate_per_day, specifications
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(payload.unit_id)
        .bind(&payload.name)
        .bind(&payload.code)
        .bind(&payload.description)
        .bind(payload.category_id)
        .bind(payload.supplier_id)
        .bind(&payload.unit_of_measure)
        .bind(payload.standard_cost)
        .bind(payload.contract_price)
        .bind(&payload.currency)
        .bind(payload.current_stock_quantity)
        .bind(payload.minimum_stock_level)
        .bind(payload.maximum_stock_level)
        .bind(payload.reorder_point)
        .bind(payload.estimated_consumption_rate_per_day)
        .bind(&payload.specifications)
        .fetch_one(executor)
        .await
        .map_err(|e| map_write_error(e, "Category or supplier", |_| AppError::DuplicateCode(payload.code.clone())))
    }

    /// Writes the descriptive and level columns. Stock quantity and
    /// consumption rate have their own operations.
    pub async fn save<'e, E>(&self, executor: E, product: &Product) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = $2, code = $3, description = $4, category_id = $5, supplier_id = $6,
                unit_of_measure = $7, standard_cost = $8, contract_price = $9, currency = $10,
                minimum_stock_level = $11, maximum_stock_level = $12, reorder_point = $13,
                specifications = $14, is_active = $15, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.code)
        .bind(&product.description)
        .bind(product.category_id)
        .bind(product.supplier_id)
        .bind(&product.unit_of_measure)
        .bind(product.standard_cost)
        .bind(product.contract_price)
        .bind(&product.currency)
        .bind(product.minimum_stock_level)
        .bind(product.maximum_stock_level)
        .bind(product.reorder_point)
        .bind(&product.specifications)
        .bind(product.is_active)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_write_error(e, "Category or supplier", |_| AppError::DuplicateCode(product.code.clone())))?
        .ok_or(AppError::NotFound("Product"))
    }

    /// Sets the on-hand quantity; `restocked` also stamps `last_restocked_at`.
    pub async fn set_stock<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        quantity: Decimal,
        restocked: bool,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                current_stock_quantity = $2,
                last_restocked_at = CASE WHEN $3 THEN NOW() ELSE last_restocked_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(restocked)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Product"))
    }

    pub async fn set_consumption_rate<'e, E>(&self, executor: E, id: Uuid, rate: Decimal) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                estimated_consumption_rate_per_day = $2,
                last_consumption_update = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rate)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Product"))
    }
}
