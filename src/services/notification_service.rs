// src/services/notification_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Pagination},
    db::{notification_repo::Audience, NotificationRepository},
    models::notification::Notification,
    services::access::{Caller, Capability, UnitScope},
};

#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    notifications: NotificationRepository,
}

// Reviewers also receive the `approver` notifications of the units in their scope.
fn audience(caller: &Caller) -> Audience {
    let (approver_units, all_units) = if caller.can(Capability::Review) {
        match caller.scope() {
            UnitScope::All => (None, true),
            UnitScope::Units(ids) => (Some(ids), false),
        }
    } else {
        (None, false)
    };

    Audience {
        user_id: caller.user_id,
        approver_units,
        all_units,
    }
}

impl NotificationService {
    pub fn new(pool: PgPool, notifications: NotificationRepository) -> Self {
        Self { pool, notifications }
    }

    pub async fn list(&self, caller: &Caller, unread_only: bool, page: &Pagination) -> Result<Vec<Notification>, AppError> {
        self.notifications
            .list(&self.pool, &audience(caller), unread_only, page)
            .await
    }

    pub async fn mark_read(&self, caller: &Caller, id: Uuid) -> Result<Notification, AppError> {
        self.notifications
            .mark_read(&self.pool, id, &audience(caller))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;

    #[test]
    fn staff_only_see_personal_notifications() {
        let staff = Caller::new(Uuid::new_v4(), Role::Staff, vec![Uuid::new_v4()]);
        let a = audience(&staff);
        assert_eq!(a.approver_units, None);
        assert!(!a.all_units);
    }

    #[test]
    fn reviewers_see_approver_notifications_in_scope() {
        let unit = Uuid::new_v4();
        let manager = Caller::new(Uuid::new_v4(), Role::Manager, vec![unit]);
        assert_eq!(audience(&manager).approver_units, Some(vec![unit]));

        let admin = Caller::new(Uuid::new_v4(), Role::Admin, vec![]);
        assert!(audience(&admin).all_units);
    }
}
