// src/services/product_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::Pagination},
    db::{ProductRepository, StockRepository, SupplierRepository},
    models::{
        product::{
            CatalogueEntry, CatalogueFilter, ConsumptionUpdatePayload, CreateCategoryPayload,
            CreateProductPayload, Product, ProductCategory, ProductFilter, StockUpdatePayload,
            UpdateCategoryPayload, UpdateProductPayload,
        },
        stock::MovementType,
    },
    services::{
        access::{Caller, Capability},
        catalogue::{self, StockLevels},
    },
};

/// Applies a partial category update. A category cannot be its own parent.
pub fn apply_category_update(
    mut category: ProductCategory,
    payload: UpdateCategoryPayload,
) -> Result<ProductCategory, AppError> {
    if payload.parent_category_id == Some(category.id) {
        return Err(AppError::InvalidInput("a category cannot be its own parent".into()));
    }
    if let Some(name) = payload.name {
        category.name = name;
    }
    if let Some(code) = payload.code {
        category.code = code;
    }
    if payload.description.is_some() {
        category.description = payload.description;
    }
    if payload.parent_category_id.is_some() {
        category.parent_category_id = payload.parent_category_id;
    }
    if let Some(active) = payload.is_active {
        category.is_active = active;
    }
    Ok(category)
}

#[derive(Clone)]
pub struct ProductService {
    pool: PgPool,
    products: ProductRepository,
    suppliers: SupplierRepository,
    stock: StockRepository,
}

impl ProductService {
    pub fn new(
        pool: PgPool,
        products: ProductRepository,
        suppliers: SupplierRepository,
        stock: StockRepository,
    ) -> Self {
        Self { pool, products, suppliers, stock }
    }

    // --- CATEGORIES ---

    pub async fn list_categories(&self) -> Result<Vec<ProductCategory>, AppError> {
        self.products.list_categories(&self.pool, false).await
    }

    pub async fn create_category(
        &self,
        caller: &Caller,
        payload: &CreateCategoryPayload,
    ) -> Result<ProductCategory, AppError> {
        caller.require(Capability::WriteCatalogue)?;
        self.products.create_category(&self.pool, payload).await
    }

    pub async fn update_category(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: UpdateCategoryPayload,
    ) -> Result<ProductCategory, AppError> {
        caller.require(Capability::WriteCatalogue)?;
        let category = self
            .products
            .find_category(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("ProductCategory"))?;

        let category = apply_category_update(category, payload)?;
        self.products.save_category(&self.pool, &category).await
    }

    /// Soft delete, refused while active products are still filed under it.
    pub async fn deactivate_category(&self, caller: &Caller, id: Uuid) -> Result<ProductCategory, AppError> {
        caller.require(Capability::WriteCatalogue)?;
        let mut tx = self.pool.begin().await?;

        let mut category = self
            .products
            .find_category(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("ProductCategory"))?;

        let in_use = self.products.count_active_in_category(&mut *tx, id).await?;
        if in_use > 0 {
            return Err(AppError::InvalidInput(format!(
                "the category is still used by {in_use} active product(s)"
            )));
        }

        category.is_active = false;
        let saved = self.products.save_category(&mut *tx, &category).await?;
        tx.commit().await?;

        tracing::info!(category_id = %id, "Category deactivated");
        Ok(saved)
    }

    // --- PRODUCTS ---

    pub async fn list(
        &self,
        caller: &Caller,
        filter: &ProductFilter,
        page: &Pagination,
    ) -> Result<Vec<Product>, AppError> {
        self.products
            .list(&self.pool, caller.scope().as_filter(), filter, Some(page))
            .await
    }

    /// Active products with their derived figures. Stock filters apply to the
    /// evaluated entries, so pagination happens afterwards.
    pub async fn catalogue(
        &self,
        caller: &Caller,
        filter: &CatalogueFilter,
        page: &Pagination,
    ) -> Result<Vec<CatalogueEntry>, AppError> {
        let products = self
            .products
            .list(&self.pool, caller.scope().as_filter(), &filter.product_filter(), None)
            .await?;

        let entries = products
            .into_iter()
            .map(catalogue::to_entry)
            .filter(|entry| catalogue::matches_stock_filter(entry, filter))
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(entries)
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> Result<Product, AppError> {
        let product = self
            .products
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;
        caller.check(product.unit_id, Capability::ReadScoped, "Product")?;
        Ok(product)
    }

    pub async fn get_entry(&self, caller: &Caller, id: Uuid) -> Result<CatalogueEntry, AppError> {
        Ok(catalogue::to_entry(self.get(caller, id).await?))
    }

    pub async fn create(&self, caller: &Caller, payload: &CreateProductPayload) -> Result<Product, AppError> {
        caller.check_target_unit(payload.unit_id, Capability::WriteCatalogue)?;

        catalogue::check_levels(&StockLevels {
            current: payload.current_stock_quantity,
            minimum: payload.minimum_stock_level,
            maximum: payload.maximum_stock_level,
            reorder_point: payload.reorder_point,
            consumption_rate: payload.estimated_consumption_rate_per_day,
        })?;
        catalogue::check_prices(payload.standard_cost, payload.contract_price)?;
        check_specifications(&payload.specifications)?;
        self.check_supplier(payload.supplier_id, payload.unit_id).await?;

        let product = self.products.create(&self.pool, payload).await?;
        tracing::info!(product_id = %product.id, code = %product.code, "Product created");
        Ok(product)
    }

    pub async fn update(&self, caller: &Caller, id: Uuid, payload: UpdateProductPayload) -> Result<Product, AppError> {
        let mut product = self.get(caller, id).await?;
        caller.require(Capability::WriteCatalogue)?;

        if let Some(name) = payload.name {
            product.name = name;
        }
        if let Some(code) = payload.code {
            product.code = code;
        }
        if payload.description.is_some() {
            product.description = payload.description;
        }
        if payload.category_id.is_some() {
            product.category_id = payload.category_id;
        }
        if payload.supplier_id.is_some() {
            self.check_supplier(payload.supplier_id, product.unit_id).await?;
            product.supplier_id = payload.supplier_id;
        }
        if let Some(uom) = payload.unit_of_measure {
            product.unit_of_measure = uom;
        }
        if payload.standard_cost.is_some() {
            product.standard_cost = payload.standard_cost;
        }
        if payload.contract_price.is_some() {
            product.contract_price = payload.contract_price;
        }
        if let Some(currency) = payload.currency {
            product.currency = currency;
        }
        if let Some(min) = payload.minimum_stock_level {
            product.minimum_stock_level = min;
        }
        if let Some(max) = payload.maximum_stock_level {
            product.maximum_stock_level = max;
        }
        if let Some(reorder) = payload.reorder_point {
            product.reorder_point = reorder;
        }
        if let Some(specs) = payload.specifications {
            check_specifications(&specs)?;
            product.specifications = specs;
        }
        if let Some(active) = payload.is_active {
            product.is_active = active;
        }

        catalogue::check_levels(&StockLevels::from(&product))?;
        catalogue::check_prices(product.standard_cost, product.contract_price)?;

        self.products.save(&self.pool, &product).await
    }

    /// Soft delete: the product disappears from listings but keeps its history.
    pub async fn deactivate(&self, caller: &Caller, id: Uuid) -> Result<Product, AppError> {
        let mut product = self.get(caller, id).await?;
        caller.require(Capability::WriteCatalogue)?;
        product.is_active = false;
        self.products.save(&self.pool, &product).await
    }

    /// Sets the absolute stock level and records the difference as a stock count.
    pub async fn update_stock(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: &StockUpdatePayload,
    ) -> Result<CatalogueEntry, AppError> {
        let mut tx = self.pool.begin().await?;

        let product = self
            .products
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;
        caller.check(product.unit_id, Capability::WriteCatalogue, "Product")?;

        let counted = catalogue::to_quantity_scale(payload.current_stock_quantity);
        if counted == product.current_stock_quantity {
            tx.commit().await?;
            return Ok(catalogue::to_entry(product));
        }

        let planned = catalogue::plan_movement(
            product.current_stock_quantity,
            MovementType::StockCount,
            counted,
        )?;

        self.stock
            .insert_movement(
                &mut *tx,
                product.id,
                product.unit_id,
                MovementType::StockCount,
                &planned,
                payload.reason.as_deref(),
                None,
                caller.user_id,
            )
            .await?;

        let restocked = planned.quantity.is_sign_positive();
        let updated = self
            .products
            .set_stock(&mut *tx, product.id, planned.new_stock, restocked)
            .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %updated.id,
            previous = %planned.previous_stock,
            current = %planned.new_stock,
            "Stock level updated"
        );
        Ok(catalogue::to_entry(updated))
    }

    pub async fn update_consumption(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: &ConsumptionUpdatePayload,
    ) -> Result<CatalogueEntry, AppError> {
        let product = self.get(caller, id).await?;
        caller.require(Capability::WriteCatalogue)?;

        let updated = self
            .products
            .set_consumption_rate(&self.pool, product.id, payload.estimated_consumption_rate_per_day)
            .await?;
        Ok(catalogue::to_entry(updated))
    }

    // A product's supplier must belong to the same unit.
    async fn check_supplier(&self, supplier_id: Option<Uuid>, unit_id: Uuid) -> Result<(), AppError> {
        let Some(supplier_id) = supplier_id else {
            return Ok(());
        };
        match self.suppliers.find_by_id(&self.pool, supplier_id).await? {
            Some(supplier) if supplier.unit_id == unit_id => Ok(()),
            _ => Err(AppError::NotFound("Supplier")),
        }
    }
}

fn check_specifications(specs: &serde_json::Value) -> Result<(), AppError> {
    if specs.is_object() {
        Ok(())
    } else {
        Err(AppError::InvalidInput("specifications must be a JSON object".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::fixtures::{seed_caller, seed_category, seed_product, seed_unit},
        models::auth::Role,
    };
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn category() -> ProductCategory {
        let now = Utc::now();
        ProductCategory {
            id: Uuid::new_v4(),
            name: "Linen".into(),
            code: "LIN".into(),
            description: None,
            parent_category_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn category_update_keeps_untouched_fields() {
        let before = category();
        let parent = Uuid::new_v4();

        let updated = apply_category_update(
            before.clone(),
            UpdateCategoryPayload {
                name: Some("Bed linen".into()),
                parent_category_id: Some(parent),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.name, "Bed linen");
        assert_eq!(updated.code, before.code);
        assert_eq!(updated.parent_category_id, Some(parent));
        assert!(updated.is_active);
    }

    #[test]
    fn category_cannot_be_its_own_parent() {
        let before = category();
        let payload = UpdateCategoryPayload { parent_category_id: Some(before.id), ..Default::default() };
        assert!(matches!(apply_category_update(before, payload), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn specifications_must_be_an_object() {
        assert!(check_specifications(&serde_json::json!({"thread_count": 300})).is_ok());
        assert!(check_specifications(&serde_json::json!(["cotton"])).is_err());
    }

    // --- Against Postgres ---

    fn service(pool: PgPool) -> ProductService {
        ProductService::new(
            pool,
            ProductRepository::new(),
            SupplierRepository::new(),
            StockRepository::new(),
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn stock_count_finer_than_the_ledger_is_recorded(pool: PgPool) {
        let unit = seed_unit(&pool, "HTL-A").await;
        let manager = seed_caller(&pool, "manager-a@hotel.test", Role::Manager, &[unit]).await;
        let product = seed_product(&pool, unit, "TWL-01", None, dec!(10)).await;
        let service = service(pool.clone());

        let entry = service
            .update_stock(
                &manager,
                product,
                &StockUpdatePayload { current_stock_quantity: dec!(7.0005), reason: None },
            )
            .await
            .unwrap();
        assert_eq!(entry.product.current_stock_quantity, dec!(7.001));

        let (quantity, new_stock): (Decimal, Decimal) =
            sqlx::query_as("SELECT quantity, new_stock FROM stock_movements WHERE product_id = $1")
                .bind(product)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!((quantity, new_stock), (dec!(-2.999), dec!(7.001)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn category_in_use_stays_active(pool: PgPool) {
        let unit = seed_unit(&pool, "HTL-A").await;
        let admin = seed_caller(&pool, "admin@hotel.test", Role::Admin, &[]).await;
        let category = seed_category(&pool, "LIN").await;
        let product = seed_product(&pool, unit, "TWL-01", Some(category), dec!(0)).await;
        let service = service(pool);

        let err = service.deactivate_category(&admin, category).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        service.deactivate(&admin, product).await.unwrap();
        let closed = service.deactivate_category(&admin, category).await.unwrap();
        assert!(!closed.is_active);
        assert!(service.list_categories().await.unwrap().iter().all(|c| c.id != category));
    }
}
