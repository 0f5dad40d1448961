// src/db/notification_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Pagination},
    models::notification::{NewNotification, Notification, Recipient, APPROVER_ROLE},
};

/// Whose notifications a query may return.
#[derive(Debug, Clone)]
pub struct Audience {
    pub user_id: Uuid,
    /// Units whose `approver` notifications are visible; `None` means none are.
    pub approver_units: Option<Vec<Uuid>>,
    /// Global reviewers see approver notifications of every unit.
    pub all_units: bool,
}

#[derive(Clone, Default)]
pub struct NotificationRepository;

impl NotificationRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(&self, executor: E, notification: &NewNotification) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (user, role) = match &notification.recipient {
            Recipient::User(id) => (Some(*id), None),
            Recipient::Role(role) => (None, Some(*role)),
        };

        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (
                unit_id, recipient_user_id, recipient_role, title, message, source_type, source_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(notification.unit_id)
        .bind(user)
        .bind(role)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.source_type)
        .bind(notification.source_id)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        audience: &Audience,
        unread_only: bool,
        page: &Pagination,
    ) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE (
                    recipient_user_id = $1
                 OR (recipient_role = $2
                     AND ($3 OR unit_id = ANY(COALESCE($4::uuid[], '{}'::uuid[]))))
              )
              AND (NOT $5 OR NOT is_read)
            ORDER BY created_at DESC
            OFFSET $6 LIMIT $7
            "#,
        )
        .bind(audience.user_id)
        .bind(APPROVER_ROLE)
        .bind(audience.all_units)
        .bind(audience.approver_units.clone())
        .bind(unread_only)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(executor)
        .await?;
        Ok(notifications)
    }

    /// Marks a notification read if the audience can see it.
    pub async fn mark_read<'e, E>(&self, executor: E, id: Uuid, audience: &Audience) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET
                is_read = TRUE,
                read_at = COALESCE(read_at, NOW())
            WHERE id = $1
              AND (
                    recipient_user_id = $2
                 OR (recipient_role = $3
                     AND ($4 OR unit_id = ANY(COALESCE($5::uuid[], '{}'::uuid[]))))
              )
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(audience.user_id)
        .bind(APPROVER_ROLE)
        .bind(audience.all_units)
        .bind(audience.approver_units.clone())
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Notification"))
    }
}
