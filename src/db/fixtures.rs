// src/db/fixtures.rs
//
// Seed rows for database-backed tests.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::auth::Role, services::access::Caller};

pub(crate) async fn seed_unit(pool: &PgPool, code: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO units (name, code) VALUES ($1, $2) RETURNING id")
        .bind(format!("Hotel {code}"))
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Inserts a user assigned to `units` and returns them as a caller.
pub(crate) async fn seed_caller(pool: &PgPool, email: &str, role: Role, units: &[Uuid]) -> Caller {
    let user_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, role)
        VALUES ($1, 'not-a-real-hash', 'Test', 'User', $2)
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap();

    for (i, unit_id) in units.iter().enumerate() {
        sqlx::query("INSERT INTO user_unit_assignments (user_id, unit_id, is_primary) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(unit_id)
            .bind(i == 0)
            .execute(pool)
            .await
            .unwrap();
    }
    Caller::new(user_id, role, units.to_vec())
}

pub(crate) async fn seed_category(pool: &PgPool, code: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO product_categories (name, code) VALUES ($1, $2) RETURNING id")
        .bind(format!("Category {code}"))
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub(crate) async fn seed_product(
    pool: &PgPool,
    unit_id: Uuid,
    code: &str,
    category_id: Option<Uuid>,
    stock: Decimal,
) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO products (unit_id, name, code, category_id, current_stock_quantity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(unit_id)
    .bind(format!("Product {code}"))
    .bind(code)
    .bind(category_id)
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap()
}
