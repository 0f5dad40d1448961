// src/services/requisition_service.rs

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Pagination},
    db::{requisition_repo::NewItem, NotificationRepository, ProductRepository, RequisitionRepository},
    models::{
        product::Product,
        requisition::{
            CreateCommentPayload, CreateRequisitionPayload, Requisition, RequisitionComment, RequisitionDetail,
            RequisitionFilter, RequisitionItem, RequisitionItemPayload, RequisitionStats, RequisitionStatus, StatusTotals, TransitionPayload,
            UpdateRequisitionItemPayload, UpdateRequisitionPayload,
        },
    },
    services::{
        access::{Caller, Capability},
        catalogue, workflow,
    },
};

const DEFAULT_UNIT_OF_MEASURE: &str = "pieces";

// ---
// Line item resolution (pure)
// ---

/// Fills product-derived defaults, brings quantity and price to the stored
/// scale and validates the result.
pub fn resolve_item(payload: &RequisitionItemPayload, product: Option<&Product>) -> Result<NewItem, AppError> {
    let product_name = payload
        .product_name
        .clone()
        .or_else(|| product.map(|p| p.name.clone()))
        .ok_or_else(|| AppError::InvalidInput("productName is required when no productId is given".into()))?;

    let unit_of_measure = payload
        .unit_of_measure
        .clone()
        .or_else(|| product.map(|p| p.unit_of_measure.clone()))
        .unwrap_or_else(|| DEFAULT_UNIT_OF_MEASURE.to_string());

    let estimated_unit_price = payload
        .estimated_unit_price
        .or_else(|| product.and_then(catalogue::effective_unit_price))
        .map(catalogue::to_money_scale)
        .unwrap_or(Decimal::ZERO);

    let item = NewItem {
        product_id: payload.product_id,
        product_name,
        description: payload.description.clone(),
        quantity: catalogue::to_quantity_scale(payload.quantity),
        unit_of_measure,
        estimated_unit_price,
        notes: payload.notes.clone(),
    };
    check_item(&item)?;
    Ok(item)
}

/// Merges a partial update into an existing line.
pub fn merge_item(existing: &RequisitionItem, update: UpdateRequisitionItemPayload) -> Result<NewItem, AppError> {
    let item = NewItem {
        product_id: existing.product_id,
        product_name: update.product_name.unwrap_or_else(|| existing.product_name.clone()),
        description: update.description.or_else(|| existing.description.clone()),
        quantity: catalogue::to_quantity_scale(update.quantity.unwrap_or(existing.quantity)),
        unit_of_measure: update.unit_of_measure.unwrap_or_else(|| existing.unit_of_measure.clone()),
        estimated_unit_price: catalogue::to_money_scale(
            update.estimated_unit_price.unwrap_or(existing.estimated_unit_price),
        ),
        notes: update.notes.or_else(|| existing.notes.clone()),
    };
    check_item(&item)?;
    Ok(item)
}

fn check_item(item: &NewItem) -> Result<(), AppError> {
    if item.quantity <= Decimal::ZERO {
        return Err(AppError::InvalidInput("quantity must be greater than zero".into()));
    }
    if item.estimated_unit_price < Decimal::ZERO {
        return Err(AppError::InvalidInput("estimatedUnitPrice cannot be negative".into()));
    }
    Ok(())
}

/// Trims the comment text; blank comments are rejected.
pub fn normalize_comment(mut payload: CreateCommentPayload) -> Result<CreateCommentPayload, AppError> {
    let trimmed = payload.comment_text.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("commentText cannot be blank".into()));
    }
    payload.comment_text = trimmed.to_string();
    Ok(payload)
}

pub fn fold_stats(totals: &[StatusTotals], average_approval_time_hours: Option<f64>) -> RequisitionStats {
    let mut stats = RequisitionStats {
        average_approval_time_hours,
        ..Default::default()
    };
    for row in totals {
        stats.total_requisitions += row.count;
        stats.total_value += row.amount;
        let slot = match row.status {
            RequisitionStatus::Draft => &mut stats.draft_count,
            RequisitionStatus::Submitted => &mut stats.submitted_count,
            RequisitionStatus::UnderReview => &mut stats.under_review_count,
            RequisitionStatus::Approved => &mut stats.approved_count,
            RequisitionStatus::Rejected => &mut stats.rejected_count,
            RequisitionStatus::Cancelled => &mut stats.cancelled_count,
            RequisitionStatus::Completed => &mut stats.completed_count,
        };
        *slot += row.count;
    }
    stats
}

#[derive(Clone)]
pub struct RequisitionService {
    pool: PgPool,
    requisitions: RequisitionRepository,
    products: ProductRepository,
    notifications: NotificationRepository,
}

impl RequisitionService {
    pub fn new(
        pool: PgPool,
        requisitions: RequisitionRepository,
        products: ProductRepository,
        notifications: NotificationRepository,
    ) -> Self {
        Self { pool, requisitions, products, notifications }
    }

    // --- READS ---

    pub async fn list(
        &self,
        caller: &Caller,
        filter: &RequisitionFilter,
        page: &Pagination,
    ) -> Result<Vec<Requisition>, AppError> {
        let scope = caller.scope().narrow(filter.unit_id);
        self.requisitions
            .list(&self.pool, scope.as_filter(), filter, page)
            .await
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> Result<RequisitionDetail, AppError> {
        let requisition = self.visible(caller, id).await?;
        let items = self.requisitions.items(&self.pool, id).await?;
        Ok(RequisitionDetail { requisition, items })
    }

    pub async fn stats(&self, caller: &Caller) -> Result<RequisitionStats, AppError> {
        let scope = caller.scope().as_filter();
        let totals = self.requisitions.status_totals(&self.pool, scope.clone()).await?;
        let hours = self.requisitions.average_approval_hours(&self.pool, scope).await?;
        Ok(fold_stats(&totals, hours))
    }

    // --- DRAFT EDITING ---

    /// Creates a draft with its initial items in one transaction.
    pub async fn create(&self, caller: &Caller, payload: &CreateRequisitionPayload) -> Result<RequisitionDetail, AppError> {
        caller.check_target_unit(payload.unit_id, Capability::Request)?;

        let mut tx = self.pool.begin().await?;

        let requisition = self.requisitions.create(&mut *tx, payload, caller.user_id).await?;
        for item in &payload.items {
            let new_item = self.resolve_for_unit(&mut tx, item, requisition.unit_id).await?;
            self.requisitions.insert_item(&mut *tx, requisition.id, &new_item).await?;
        }
        self.requisitions.recompute_total(&mut *tx, requisition.id).await?;

        let detail = self.load_detail(&mut tx, requisition.id).await?;
        tx.commit().await?;

        tracing::info!(
            requisition_id = %detail.requisition.id,
            number = %detail.requisition.requisition_number,
            items = detail.items.len(),
            "Requisition created"
        );
        Ok(detail)
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: UpdateRequisitionPayload,
    ) -> Result<RequisitionDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut requisition = self.lock_editable(&mut tx, caller, id).await?;

        if let Some(title) = payload.title {
            requisition.title = title;
        }
        if payload.description.is_some() {
            requisition.description = payload.description;
        }
        if payload.department.is_some() {
            requisition.department = payload.department;
        }
        if let Some(priority) = payload.priority {
            requisition.priority = priority;
        }
        if let Some(date) = payload.required_date {
            requisition.required_date = date;
        }

        self.requisitions.save_header(&mut *tx, &requisition).await?;
        let detail = self.load_detail(&mut tx, id).await?;
        tx.commit().await?;
        Ok(detail)
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        self.lock_editable(&mut tx, caller, id).await?;
        self.requisitions.delete(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(requisition_id = %id, "Draft requisition deleted");
        Ok(())
    }

    pub async fn add_item(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: &RequisitionItemPayload,
    ) -> Result<RequisitionDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        let requisition = self.lock_editable(&mut tx, caller, id).await?;

        let new_item = self.resolve_for_unit(&mut tx, payload, requisition.unit_id).await?;
        self.requisitions.insert_item(&mut *tx, id, &new_item).await?;
        self.requisitions.recompute_total(&mut *tx, id).await?;

        let detail = self.load_detail(&mut tx, id).await?;
        tx.commit().await?;
        Ok(detail)
    }

    pub async fn update_item(
        &self,
        caller: &Caller,
        id: Uuid,
        item_id: Uuid,
        payload: UpdateRequisitionItemPayload,
    ) -> Result<RequisitionDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        self.lock_editable(&mut tx, caller, id).await?;

        let existing = self
            .requisitions
            .find_item(&mut *tx, id, item_id)
            .await?
            .ok_or(AppError::NotFound("RequisitionItem"))?;
        let merged = merge_item(&existing, payload)?;

        self.requisitions.update_item(&mut *tx, item_id, &merged).await?;
        self.requisitions.recompute_total(&mut *tx, id).await?;

        let detail = self.load_detail(&mut tx, id).await?;
        tx.commit().await?;
        Ok(detail)
    }

    pub async fn delete_item(&self, caller: &Caller, id: Uuid, item_id: Uuid) -> Result<RequisitionDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        self.lock_editable(&mut tx, caller, id).await?;

        self.requisitions.delete_item(&mut *tx, id, item_id).await?;
        self.requisitions.recompute_total(&mut *tx, id).await?;

        let detail = self.load_detail(&mut tx, id).await?;
        tx.commit().await?;
        Ok(detail)
    }

    // --- WORKFLOW ---

    /// Moves the requisition to `payload.status`. The status change and its
    /// notification commit together.
    pub async fn transition(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: &TransitionPayload,
    ) -> Result<RequisitionDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self
            .requisitions
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Requisition"))?;
        caller.check(current.unit_id, Capability::ReadScoped, "Requisition")?;

        let item_count = self.requisitions.item_count(&mut *tx, id).await?;
        let comment = payload.comment.as_deref();
        workflow::authorize(caller, &current, payload.status, item_count as usize, comment)?;

        let next = workflow::apply(&current, payload.status, caller, comment, Utc::now());
        let saved = self.requisitions.save_status(&mut *tx, &next).await?;

        if let Some(notification) = workflow::notification_for(&saved) {
            self.notifications.insert(&mut *tx, &notification).await?;
        }

        let items = self.requisitions.items(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            requisition_id = %id,
            from = %current.status,
            to = %saved.status,
            actor = %caller.user_id,
            "Requisition transitioned"
        );
        Ok(RequisitionDetail { requisition: saved, items })
    }

    // --- COMMENTS ---

    /// Anyone who can see the requisition may comment on it, whatever its status.
    pub async fn add_comment(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: CreateCommentPayload,
    ) -> Result<RequisitionComment, AppError> {
        let payload = normalize_comment(payload)?;
        let requisition = self.visible(caller, id).await?;

        let comment = self
            .requisitions
            .insert_comment(&self.pool, requisition.id, caller.user_id, caller.role, &payload)
            .await?;

        tracing::info!(requisition_id = %id, comment_id = %comment.id, author = %caller.user_id, "Comment added");
        Ok(comment)
    }

    pub async fn comments(&self, caller: &Caller, id: Uuid) -> Result<Vec<RequisitionComment>, AppError> {
        let requisition = self.visible(caller, id).await?;
        self.requisitions.comments(&self.pool, requisition.id).await
    }

    // --- HELPERS ---

    async fn visible(&self, caller: &Caller, id: Uuid) -> Result<Requisition, AppError> {
        let requisition = self
            .requisitions
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Requisition"))?;
        caller.check(requisition.unit_id, Capability::ReadScoped, "Requisition")?;
        Ok(requisition)
    }

    /// Locks the header and checks that the caller may still edit it.
    async fn lock_editable(&self, conn: &mut PgConnection, caller: &Caller, id: Uuid) -> Result<Requisition, AppError> {
        let requisition = self
            .requisitions
            .find_for_update(&mut *conn, id)
            .await?
            .ok_or(AppError::NotFound("Requisition"))?;
        caller.check(requisition.unit_id, Capability::Request, "Requisition")?;

        if !caller.is_owner_or_global(requisition.requested_by) {
            return Err(AppError::Forbidden("edit a requisition you did not create".into()));
        }
        workflow::ensure_editable(requisition.status)?;
        Ok(requisition)
    }

    async fn resolve_for_unit(
        &self,
        conn: &mut PgConnection,
        payload: &RequisitionItemPayload,
        unit_id: Uuid,
    ) -> Result<NewItem, AppError> {
        let product = match payload.product_id {
            Some(product_id) => {
                let product = self
                    .products
                    .find_by_id(&mut *conn, product_id)
                    .await?
                    .filter(|p| p.unit_id == unit_id)
                    .ok_or(AppError::NotFound("Product"))?;
                Some(product)
            }
            None => None,
        };
        resolve_item(payload, product.as_ref())
    }

    async fn load_detail(&self, conn: &mut PgConnection, id: Uuid) -> Result<RequisitionDetail, AppError> {
        let requisition = self
            .requisitions
            .find_by_id(&mut *conn, id)
            .await?
            .ok_or(AppError::NotFound("Requisition"))?;
        let items = self.requisitions.items(&mut *conn, id).await?;
        Ok(RequisitionDetail { requisition, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::fixtures::{seed_caller, seed_unit},
        models::{auth::Role, requisition::Priority},
        services::catalogue::tests::product,
    };
    use rust_decimal_macros::dec;

    fn line(quantity: Decimal, price: Option<Decimal>) -> RequisitionItemPayload {
        RequisitionItemPayload {
            product_id: None,
            product_name: Some("Bath towel".into()),
            description: None,
            quantity,
            unit_of_measure: None,
            estimated_unit_price: price,
            notes: None,
        }
    }

    fn stored(item: &NewItem) -> RequisitionItem {
        RequisitionItem {
            id: Uuid::new_v4(),
            requisition_id: Uuid::new_v4(),
            line_number: 1,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit_of_measure: item.unit_of_measure.clone(),
            estimated_unit_price: item.estimated_unit_price,
            estimated_total_price: item.total_price(),
            notes: item.notes.clone(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn totals_follow_item_changes() {
        let a = resolve_item(&line(dec!(10), Some(dec!(2.50))), None).unwrap();
        let b = resolve_item(&line(dec!(4), Some(dec!(12))), None).unwrap();
        let total: Decimal = [&a, &b].iter().map(|i| i.total_price()).sum();
        assert_eq!(total, dec!(73));

        let updated = merge_item(
            &stored(&b),
            UpdateRequisitionItemPayload { quantity: Some(dec!(5)), ..Default::default() },
        )
        .unwrap();
        let total: Decimal = [&a, &updated].iter().map(|i| i.total_price()).sum();
        assert_eq!(total, dec!(85));
    }

    #[test]
    fn line_total_agrees_with_the_stored_price() {
        let item = resolve_item(&line(dec!(3), Some(dec!(0.335))), None).unwrap();
        assert_eq!(item.estimated_unit_price, dec!(0.34));
        assert_eq!(item.total_price(), dec!(1.02));
        assert_eq!(item.total_price(), item.quantity * item.estimated_unit_price);

        let merged = merge_item(
            &stored(&item),
            UpdateRequisitionItemPayload { quantity: Some(dec!(2.0005)), ..Default::default() },
        )
        .unwrap();
        assert_eq!(merged.quantity, dec!(2.001));
        assert_eq!(merged.total_price(), catalogue::to_money_scale(dec!(2.001) * dec!(0.34)));

        // Below the stored scale a quantity is zero.
        assert!(resolve_item(&line(dec!(0.0004), Some(dec!(1))), None).is_err());
    }

    #[test]
    fn product_defaults_fill_missing_fields() {
        let mut p = product(dec!(10), dec!(1), dec!(2), dec!(100));
        p.standard_cost = Some(dec!(3.00));
        p.contract_price = Some(dec!(2.75));
        p.unit_of_measure = "boxes".into();

        let payload = RequisitionItemPayload {
            product_id: Some(p.id),
            product_name: None,
            unit_of_measure: None,
            estimated_unit_price: None,
            ..line(dec!(2), None)
        };
        let item = resolve_item(&payload, Some(&p)).unwrap();

        assert_eq!(item.product_name, p.name);
        assert_eq!(item.unit_of_measure, "boxes");
        assert_eq!(item.estimated_unit_price, dec!(2.75));
        assert_eq!(item.total_price(), dec!(5.50));
    }

    #[test]
    fn free_text_items_need_a_name() {
        let payload = RequisitionItemPayload { product_name: None, ..line(dec!(1), None) };
        assert!(matches!(resolve_item(&payload, None), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn invalid_quantities_and_prices_are_rejected() {
        assert!(resolve_item(&line(dec!(0), None), None).is_err());
        assert!(resolve_item(&line(dec!(1), Some(dec!(-1))), None).is_err());

        let ok = resolve_item(&line(dec!(1), None), None).unwrap();
        assert_eq!(ok.estimated_unit_price, Decimal::ZERO);
        assert!(merge_item(
            &stored(&ok),
            UpdateRequisitionItemPayload { quantity: Some(dec!(-2)), ..Default::default() }
        )
        .is_err());
    }

    #[test]
    fn comments_are_trimmed_and_never_blank() {
        let payload = |text: &str| CreateCommentPayload {
            comment_text: text.into(),
            comment_type: Default::default(),
            is_internal: true,
        };

        let ok = normalize_comment(payload("  Please confirm the towel size.\n")).unwrap();
        assert_eq!(ok.comment_text, "Please confirm the towel size.");
        assert!(matches!(normalize_comment(payload(" \t ")), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn stats_fold_status_rows() {
        let rows = vec![
            StatusTotals { status: RequisitionStatus::Draft, count: 2, amount: dec!(10) },
            StatusTotals { status: RequisitionStatus::Approved, count: 3, amount: dec!(90.50) },
        ];
        let stats = fold_stats(&rows, Some(4.5));
        assert_eq!(stats.total_requisitions, 5);
        assert_eq!(stats.draft_count, 2);
        assert_eq!(stats.approved_count, 3);
        assert_eq!(stats.total_value, dec!(100.50));
        assert_eq!(stats.average_approval_time_hours, Some(4.5));
    }

    // --- Against Postgres ---

    fn service(pool: PgPool) -> RequisitionService {
        RequisitionService::new(
            pool,
            RequisitionRepository::new(),
            ProductRepository::new(),
            NotificationRepository::new(),
        )
    }

    fn draft_payload(unit_id: Uuid, items: Vec<RequisitionItemPayload>) -> CreateRequisitionPayload {
        CreateRequisitionPayload {
            unit_id,
            title: "Linen restock".into(),
            description: None,
            department: Some("Housekeeping".into()),
            priority: Priority::Medium,
            required_date: Utc::now().date_naive(),
            currency: "USD".into(),
            items,
        }
    }

    fn assert_total_is_item_sum(detail: &RequisitionDetail) {
        let sum: Decimal = detail.items.iter().map(|i| i.estimated_total_price).sum();
        assert_eq!(detail.requisition.total_estimated_amount, sum);
        for item in &detail.items {
            assert_eq!(
                item.estimated_total_price,
                catalogue::to_money_scale(item.quantity * item.estimated_unit_price)
            );
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn stored_total_tracks_item_edits(pool: PgPool) {
        let unit = seed_unit(&pool, "HTL-A").await;
        let manager = seed_caller(&pool, "manager-a@hotel.test", Role::Manager, &[unit]).await;
        let service = service(pool);

        let created = service
            .create(
                &manager,
                &draft_payload(unit, vec![line(dec!(3), Some(dec!(0.335))), line(dec!(4), Some(dec!(12)))]),
            )
            .await
            .unwrap();
        assert_eq!(created.requisition.total_estimated_amount, dec!(49.02));
        assert_total_is_item_sum(&created);

        let id = created.requisition.id;
        let second = created.items[1].id;
        let updated = service
            .update_item(
                &manager,
                id,
                second,
                UpdateRequisitionItemPayload { quantity: Some(dec!(5)), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(updated.requisition.total_estimated_amount, dec!(61.02));
        assert_total_is_item_sum(&updated);

        let added = service
            .add_item(&manager, id, &line(dec!(2.0005), Some(dec!(1.005))))
            .await
            .unwrap();
        assert_eq!(added.items.len(), 3);
        assert_total_is_item_sum(&added);

        let trimmed = service.delete_item(&manager, id, created.items[0].id).await.unwrap();
        assert_total_is_item_sum(&trimmed);

        let reloaded = service.get(&manager, id).await.unwrap();
        assert_eq!(reloaded.requisition.total_estimated_amount, trimmed.requisition.total_estimated_amount);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn requisitions_in_other_units_are_not_found(pool: PgPool) {
        let unit_a = seed_unit(&pool, "HTL-A").await;
        let unit_b = seed_unit(&pool, "HTL-B").await;
        let manager_a = seed_caller(&pool, "manager-a@hotel.test", Role::Manager, &[unit_a]).await;
        let manager_b = seed_caller(&pool, "manager-b@hotel.test", Role::Manager, &[unit_b]).await;
        let service = service(pool);

        let in_b = service
            .create(&manager_b, &draft_payload(unit_b, vec![line(dec!(1), Some(dec!(4)))]))
            .await
            .unwrap();
        let id = in_b.requisition.id;

        assert!(matches!(service.get(&manager_a, id).await, Err(AppError::NotFound("Requisition"))));
        assert!(matches!(service.comments(&manager_a, id).await, Err(AppError::NotFound("Requisition"))));

        let listed = service
            .list(&manager_a, &RequisitionFilter::default(), &Pagination::default())
            .await
            .unwrap();
        assert!(listed.iter().all(|r| r.unit_id == unit_a));

        let comment = service
            .add_comment(
                &manager_b,
                id,
                CreateCommentPayload {
                    comment_text: " Check the towel size first. ".into(),
                    comment_type: Default::default(),
                    is_internal: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(comment.comment_text, "Check the towel size first.");
        assert_eq!(comment.author_role, Role::Manager);

        let thread = service.comments(&manager_b, id).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].author_id, manager_b.user_id);
    }
}
