// src/services/stock_service.rs

use sqlx::PgPool;

use crate::{
    common::{error::AppError, pagination::Pagination},
    db::{ProductRepository, StockRepository},
    models::{
        product::{ProductFilter, StockStatus},
        stock::{MovementFilter, MovementType, StockAdjustmentPayload, StockAlert, StockMovement},
    },
    services::{
        access::{Caller, Capability},
        catalogue,
    },
};

#[derive(Clone)]
pub struct StockService {
    pool: PgPool,
    products: ProductRepository,
    stock: StockRepository,
}

impl StockService {
    pub fn new(pool: PgPool, products: ProductRepository, stock: StockRepository) -> Self {
        Self { pool, products, stock }
    }

    /// Applies a movement and appends it to the ledger. The product row is
    /// locked so concurrent adjustments serialize.
    pub async fn adjust(&self, caller: &Caller, payload: &StockAdjustmentPayload) -> Result<StockMovement, AppError> {
        let mut tx = self.pool.begin().await?;

        let product = self
            .products
            .find_for_update(&mut *tx, payload.product_id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;
        caller.check(product.unit_id, Capability::WriteCatalogue, "Product")?;

        let planned = catalogue::plan_movement(
            product.current_stock_quantity,
            payload.movement_type,
            payload.quantity,
        )?;

        let movement = self
            .stock
            .insert_movement(
                &mut *tx,
                product.id,
                product.unit_id,
                payload.movement_type,
                &planned,
                payload.reason.as_deref(),
                payload.reference.as_deref(),
                caller.user_id,
            )
            .await?;

        let restocked = payload.movement_type == MovementType::Receipt;
        self.products
            .set_stock(&mut *tx, product.id, planned.new_stock, restocked)
            .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %product.id,
            movement = ?payload.movement_type,
            quantity = %planned.quantity,
            new_stock = %planned.new_stock,
            "Stock adjusted"
        );
        Ok(movement)
    }

    pub async fn movements(
        &self,
        caller: &Caller,
        filter: &MovementFilter,
        page: &Pagination,
    ) -> Result<Vec<StockMovement>, AppError> {
        if let Some(product_id) = filter.product_id {
            let product = self
                .products
                .find_by_id(&self.pool, product_id)
                .await?
                .ok_or(AppError::NotFound("Product"))?;
            caller.check(product.unit_id, Capability::ReadScoped, "Product")?;
        }

        self.stock
            .list_movements(&self.pool, caller.scope().as_filter(), filter.product_id, page)
            .await
    }

    /// Active products in scope that need replenishment, most urgent first.
    pub async fn alerts(&self, caller: &Caller) -> Result<Vec<StockAlert>, AppError> {
        let products = self
            .products
            .list(&self.pool, caller.scope().as_filter(), &ProductFilter::default(), None)
            .await?;

        let mut alerts: Vec<StockAlert> = products
            .iter()
            .filter_map(|p| {
                let figures = catalogue::evaluate(p);
                catalogue::needs_replenishment(figures.stock_status).then(|| StockAlert {
                    product_id: p.id,
                    unit_id: p.unit_id,
                    code: p.code.clone(),
                    name: p.name.clone(),
                    unit_of_measure: p.unit_of_measure.clone(),
                    current_stock_quantity: p.current_stock_quantity,
                    minimum_stock_level: p.minimum_stock_level,
                    reorder_point: p.reorder_point,
                    maximum_stock_level: p.maximum_stock_level,
                    stock_status: figures.stock_status,
                    estimated_days_of_stock: figures.estimated_days_of_stock,
                    suggested_reorder_quantity: catalogue::suggested_reorder_quantity(p),
                })
            })
            .collect();

        alerts.sort_by_key(|a| (a.stock_status != StockStatus::LowStock, a.current_stock_quantity));
        Ok(alerts)
    }
}
