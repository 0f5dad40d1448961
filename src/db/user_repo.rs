// src/db/user_repo.rs

use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{like_pattern, map_foreign_key_violation, map_unique_violation},
        error::AppError,
        pagination::Pagination,
    },
    models::{
        auth::{Role, UnitMembership, User},
        user::UserFilter,
    },
};

const USER_COLUMNS: &str = r#"
    id, email, password_hash, first_name, last_name, phone, role,
    is_active, last_login_at, created_at, updated_at
"#;

/// Fields written when a user is created.
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: Option<&'a str>,
    pub role: Role,
}

// Owns the `users` and `user_unit_assignments` tables.
#[derive(Clone, Default)]
pub struct UserRepository;

impl UserRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_email<'e, E>(&self, executor: E, email: &str) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn count<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    /// Users assigned to at least one unit of `scope` (all users when `None`).
    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: Option<Vec<Uuid>>,
        filter: &UserFilter,
        page: &Pagination,
    ) -> Result<Vec<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS} FROM users u
            WHERE ($1::uuid[] IS NULL OR EXISTS (
                    SELECT 1 FROM user_unit_assignments a
                    WHERE a.user_id = u.id AND a.unit_id = ANY($1)))
              AND ($2::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM user_unit_assignments a
                    WHERE a.user_id = u.id AND a.unit_id = $2))
              AND ($3::user_role IS NULL OR u.role = $3)
              AND ($4::text IS NULL OR u.email ILIKE $4 OR u.first_name ILIKE $4 OR u.last_name ILIKE $4)
            ORDER BY u.last_name, u.first_name
            OFFSET $5 LIMIT $6
            "#
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(scope)
            .bind(filter.unit_id)
            .bind(filter.role)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(page.offset())
            .bind(page.limit())
            .fetch_all(executor)
            .await?;
        Ok(users)
    }

    // Duplicate e-mails surface as EmailAlreadyExists.
    pub async fn create<'e, E>(&self, executor: E, new_user: NewUser<'_>) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, phone, role)
            VALUES (lower($1), $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(new_user.email)
            .bind(new_user.password_hash)
            .bind(new_user.first_name)
            .bind(new_user.last_name)
            .bind(new_user.phone)
            .bind(new_user.role)
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, |_| AppError::EmailAlreadyExists))
    }

    /// Writes every mutable column of `user`.
    pub async fn save<'e, E>(&self, executor: E, user: &User) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE users SET
                password_hash = $2, first_name = $3, last_name = $4, phone = $5,
                role = $6, is_active = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(user.role)
            .bind(user.is_active)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    pub async fn touch_last_login<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // ---
    // Unit assignments
    // ---

    pub async fn unit_ids<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT unit_id FROM user_unit_assignments WHERE user_id = $1 ORDER BY is_primary DESC, unit_id",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    pub async fn memberships<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Vec<UnitMembership>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let units = sqlx::query_as::<_, UnitMembership>(
            r#"
            SELECT a.unit_id, un.name AS unit_name, un.code AS unit_code, a.is_primary
            FROM user_unit_assignments a
            JOIN units un ON un.id = a.unit_id
            WHERE a.user_id = $1
            ORDER BY a.is_primary DESC, un.name
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(units)
    }

    /// Replaces the user's assignments. Runs several statements, so it takes
    /// the connection of the caller's transaction.
    pub async fn replace_assignments(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        unit_ids: &[Uuid],
        primary_unit_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_unit_assignments WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        // Without an explicit primary, the first unit listed is primary.
        let primary = primary_unit_id.or_else(|| unit_ids.first().copied());

        for unit_id in unit_ids {
            sqlx::query(
                r#"
                INSERT INTO user_unit_assignments (user_id, unit_id, is_primary)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, unit_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(unit_id)
            .bind(Some(*unit_id) == primary)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_foreign_key_violation(e, "Unit"))?;
        }
        Ok(())
    }
}
