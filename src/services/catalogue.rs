// src/services/catalogue.rs
//
// Derived e-catalogue figures. Everything here is pure: no I/O, no clock.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    common::error::AppError,
    models::{
        product::{CatalogueEntry, CatalogueFilter, Product, StockStatus},
        stock::MovementType,
    },
};

/// Scale of the money columns (`NUMERIC(_, 2)`).
pub const MONEY_SCALE: u32 = 2;
/// Scale of the quantity columns (`NUMERIC(_, 3)`).
pub const QUANTITY_SCALE: u32 = 3;

/// Rounds a price to the stored scale, half away from zero like Postgres.
/// Derived values must be computed from the rounded input, not the raw one.
pub fn to_money_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn to_quantity_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogueFigures {
    pub effective_unit_price: Option<Decimal>,
    pub estimated_days_of_stock: Option<Decimal>,
    pub stock_status: StockStatus,
}

/// Contract price wins over standard cost.
pub fn effective_unit_price(product: &Product) -> Option<Decimal> {
    product.contract_price.or(product.standard_cost)
}

/// Days until the stock runs out at the estimated consumption rate,
/// rounded to two decimals. `None` when no consumption is recorded.
pub fn estimated_days_of_stock(product: &Product) -> Option<Decimal> {
    let rate = product.estimated_consumption_rate_per_day;
    if rate <= Decimal::ZERO {
        return None;
    }
    product
        .current_stock_quantity
        .checked_div(rate)
        .map(|days| days.round_dp(2))
}

// First match wins: low stock is reported even if it is also under the reorder point.
pub fn stock_status(product: &Product) -> StockStatus {
    let current = product.current_stock_quantity;
    if current <= product.minimum_stock_level {
        StockStatus::LowStock
    } else if current <= product.reorder_point {
        StockStatus::ReorderNeeded
    } else if current >= product.maximum_stock_level {
        StockStatus::Overstock
    } else {
        StockStatus::Normal
    }
}

pub fn evaluate(product: &Product) -> CatalogueFigures {
    CatalogueFigures {
        effective_unit_price: effective_unit_price(product),
        estimated_days_of_stock: estimated_days_of_stock(product),
        stock_status: stock_status(product),
    }
}

pub fn needs_replenishment(status: StockStatus) -> bool {
    matches!(status, StockStatus::LowStock | StockStatus::ReorderNeeded)
}

/// Quantity that brings the product back to its maximum level.
pub fn suggested_reorder_quantity(product: &Product) -> Decimal {
    if !needs_replenishment(stock_status(product)) {
        return Decimal::ZERO;
    }
    (product.maximum_stock_level - product.current_stock_quantity).max(Decimal::ZERO)
}

pub fn to_entry(product: Product) -> CatalogueEntry {
    let figures = evaluate(&product);
    CatalogueEntry {
        product,
        effective_unit_price: figures.effective_unit_price,
        estimated_days_of_stock: figures.estimated_days_of_stock,
        stock_status: figures.stock_status,
    }
}

/// Status filters run on the evaluator output, never on a second SQL expression.
pub fn matches_stock_filter(entry: &CatalogueEntry, filter: &CatalogueFilter) -> bool {
    if let Some(wanted) = filter.stock_status {
        if entry.stock_status != wanted {
            return false;
        }
    }
    if filter.low_stock_only.unwrap_or(false) && !needs_replenishment(entry.stock_status) {
        return false;
    }
    true
}

// ---
// Level invariants
// ---

#[derive(Debug, Clone, Copy)]
pub struct StockLevels {
    pub current: Decimal,
    pub minimum: Decimal,
    pub maximum: Decimal,
    pub reorder_point: Decimal,
    pub consumption_rate: Decimal,
}

impl From<&Product> for StockLevels {
    fn from(p: &Product) -> Self {
        Self {
            current: p.current_stock_quantity,
            minimum: p.minimum_stock_level,
            maximum: p.maximum_stock_level,
            reorder_point: p.reorder_point,
            consumption_rate: p.estimated_consumption_rate_per_day,
        }
    }
}

pub fn check_levels(levels: &StockLevels) -> Result<(), AppError> {
    if levels.maximum <= levels.minimum {
        return Err(AppError::InvalidInput(
            "maximumStockLevel must be greater than minimumStockLevel".into(),
        ));
    }
    let non_negative = [
        ("currentStockQuantity", levels.current),
        ("minimumStockLevel", levels.minimum),
        ("reorderPoint", levels.reorder_point),
        ("estimatedConsumptionRatePerDay", levels.consumption_rate),
    ];
    for (field, value) in non_negative {
        if value < Decimal::ZERO {
            return Err(AppError::InvalidInput(format!("{field} cannot be negative")));
        }
    }
    Ok(())
}

pub fn check_prices(standard_cost: Option<Decimal>, contract_price: Option<Decimal>) -> Result<(), AppError> {
    for (field, value) in [("standardCost", standard_cost), ("contractPrice", contract_price)] {
        if value.is_some_and(|v| v < Decimal::ZERO) {
            return Err(AppError::InvalidInput(format!("{field} cannot be negative")));
        }
    }
    Ok(())
}

// ---
// Stock arithmetic
// ---

/// Result of applying a movement to the current stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedMovement {
    pub quantity: Decimal,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
}

/// Works out the signed delta and the resulting level for a movement.
/// For `StockCount` the given quantity is the counted absolute level.
/// Both inputs are brought to the stored scale first, so the ledger row
/// satisfies `previous_stock + quantity = new_stock` once persisted.
pub fn plan_movement(
    current: Decimal,
    movement_type: MovementType,
    quantity: Decimal,
) -> Result<PlannedMovement, AppError> {
    let current = to_quantity_scale(current);
    let quantity = to_quantity_scale(quantity);
    let delta = match movement_type {
        MovementType::Receipt if quantity <= Decimal::ZERO => {
            return Err(AppError::InvalidInput("a receipt must have a positive quantity".into()));
        }
        MovementType::Issue if quantity >= Decimal::ZERO => {
            return Err(AppError::InvalidInput("an issue must have a negative quantity".into()));
        }
        MovementType::StockCount if quantity < Decimal::ZERO => {
            return Err(AppError::InvalidInput("a stock count cannot be negative".into()));
        }
        MovementType::StockCount => quantity - current,
        _ => quantity,
    };

    if delta.is_zero() {
        return Err(AppError::InvalidInput("the movement does not change the stock".into()));
    }

    let new_stock = current + delta;
    if new_stock < Decimal::ZERO {
        return Err(AppError::InvalidInput("insufficient stock".into()));
    }

    Ok(PlannedMovement {
        quantity: delta,
        previous_stock: current,
        new_stock,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    pub(crate) fn product(current: Decimal, min: Decimal, reorder: Decimal, max: Decimal) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            name: "Bath towel".into(),
            code: "TWL-001".into(),
            description: None,
            category_id: None,
            supplier_id: None,
            unit_of_measure: "pieces".into(),
            standard_cost: None,
            contract_price: None,
            currency: "USD".into(),
            current_stock_quantity: current,
            minimum_stock_level: min,
            maximum_stock_level: max,
            reorder_point: reorder,
            estimated_consumption_rate_per_day: Decimal::ZERO,
            specifications: serde_json::json!({}),
            is_active: true,
            last_restocked_at: None,
            last_consumption_update: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn below_minimum_is_low_stock() {
        let p = product(dec!(15), dec!(20), dec!(25), dec!(100));
        assert_eq!(stock_status(&p), StockStatus::LowStock);
        assert!(needs_replenishment(stock_status(&p)));
        assert_eq!(suggested_reorder_quantity(&p), dec!(85));
    }

    #[test]
    fn normal_stock_with_consumption() {
        let mut p = product(dec!(30), dec!(20), dec!(25), dec!(100));
        p.estimated_consumption_rate_per_day = dec!(5);

        let figures = evaluate(&p);
        assert_eq!(figures.stock_status, StockStatus::Normal);
        assert_eq!(figures.estimated_days_of_stock, Some(dec!(6.0)));
        assert_eq!(suggested_reorder_quantity(&p), Decimal::ZERO);
    }

    #[test]
    fn between_minimum_and_reorder_point_needs_reorder() {
        let p = product(dec!(22), dec!(20), dec!(25), dec!(100));
        assert_eq!(stock_status(&p), StockStatus::ReorderNeeded);
    }

    #[test]
    fn at_or_above_maximum_is_overstock() {
        let p = product(dec!(100), dec!(20), dec!(25), dec!(100));
        assert_eq!(stock_status(&p), StockStatus::Overstock);
    }

    #[test]
    fn days_of_stock_rounds_to_two_places() {
        let mut p = product(dec!(10), dec!(1), dec!(2), dec!(100));
        p.estimated_consumption_rate_per_day = dec!(3);
        assert_eq!(estimated_days_of_stock(&p), Some(dec!(3.33)));
    }

    #[test]
    fn zero_consumption_has_no_days_of_stock() {
        let p = product(dec!(10), dec!(1), dec!(2), dec!(100));
        assert_eq!(estimated_days_of_stock(&p), None);
    }

    #[test]
    fn price_prefers_contract_then_standard_cost() {
        let mut p = product(dec!(10), dec!(1), dec!(2), dec!(100));
        assert_eq!(effective_unit_price(&p), None);

        p.standard_cost = Some(dec!(4.50));
        assert_eq!(effective_unit_price(&p), Some(dec!(4.50)));

        p.contract_price = Some(dec!(3.90));
        assert_eq!(effective_unit_price(&p), Some(dec!(3.90)));
    }

    #[test]
    fn status_filter_and_low_stock_only() {
        let low = to_entry(product(dec!(5), dec!(20), dec!(25), dec!(100)));
        let normal = to_entry(product(dec!(50), dec!(20), dec!(25), dec!(100)));

        let only_low = CatalogueFilter { low_stock_only: Some(true), ..Default::default() };
        assert!(matches_stock_filter(&low, &only_low));
        assert!(!matches_stock_filter(&normal, &only_low));

        let overstock = CatalogueFilter { stock_status: Some(StockStatus::Overstock), ..Default::default() };
        assert!(!matches_stock_filter(&normal, &overstock));
        assert!(matches_stock_filter(&normal, &CatalogueFilter::default()));
    }

    #[test]
    fn levels_reject_inverted_range() {
        let p = product(dec!(5), dec!(100), dec!(25), dec!(100));
        assert!(matches!(check_levels(&StockLevels::from(&p)), Err(AppError::InvalidInput(_))));
        assert!(check_prices(Some(dec!(-1)), None).is_err());
        assert!(check_prices(Some(dec!(1)), Some(dec!(0))).is_ok());
    }

    #[test]
    fn movements_follow_their_sign_rules() {
        let receipt = plan_movement(dec!(10), MovementType::Receipt, dec!(5)).unwrap();
        assert_eq!((receipt.quantity, receipt.new_stock), (dec!(5), dec!(15)));

        assert!(plan_movement(dec!(10), MovementType::Receipt, dec!(-5)).is_err());
        assert!(plan_movement(dec!(10), MovementType::Issue, dec!(5)).is_err());
        assert!(plan_movement(dec!(10), MovementType::Issue, dec!(-11)).is_err());

        let count = plan_movement(dec!(10), MovementType::StockCount, dec!(7)).unwrap();
        assert_eq!((count.quantity, count.previous_stock, count.new_stock), (dec!(-3), dec!(10), dec!(7)));

        assert!(plan_movement(dec!(10), MovementType::StockCount, dec!(10)).is_err());
    }

    #[test]
    fn over_scale_count_is_planned_at_stored_scale() {
        let count = plan_movement(dec!(10.000), MovementType::StockCount, dec!(7.0005)).unwrap();
        assert_eq!((count.quantity, count.new_stock), (dec!(-2.999), dec!(7.001)));
        assert_eq!(count.previous_stock + count.quantity, count.new_stock);

        // Rounds to nothing, so there is nothing to record.
        assert!(plan_movement(dec!(10), MovementType::Receipt, dec!(0.0004)).is_err());
    }

    #[test]
    fn scale_rounding_matches_numeric_columns() {
        assert_eq!(to_money_scale(dec!(0.335)), dec!(0.34));
        assert_eq!(to_money_scale(dec!(-0.335)), dec!(-0.34));
        assert_eq!(to_quantity_scale(dec!(1.2345)), dec!(1.235));
        assert_eq!(to_quantity_scale(dec!(2)), dec!(2));
    }

    fn decimal_in(range: std::ops::Range<i64>) -> impl Strategy<Value = Decimal> {
        (range, 0u32..3).prop_map(|(n, scale)| Decimal::new(n, scale))
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn planned_movements_fit_the_ledger_columns(
            current in (0i64..10_000_000).prop_map(|n| Decimal::new(n, 3)),
            counted in (0i64..100_000_000).prop_map(|n| Decimal::new(n, 4)),
        ) {
            if let Ok(planned) = plan_movement(current, MovementType::StockCount, counted) {
                prop_assert!(planned.quantity.scale() <= QUANTITY_SCALE);
                prop_assert!(planned.new_stock.scale() <= QUANTITY_SCALE);
                prop_assert_eq!(planned.previous_stock + planned.quantity, planned.new_stock);
                prop_assert_eq!(planned.new_stock, to_quantity_scale(counted));
            }
        }

        #[test]
        fn low_stock_wins_over_reorder(
            current in decimal_in(0..10_000),
            min in decimal_in(0..10_000),
            reorder in decimal_in(0..10_000),
            max in decimal_in(0..20_000),
        ) {
            let p = product(current, min, reorder, max);
            let status = stock_status(&p);
            if current <= min {
                prop_assert_eq!(status, StockStatus::LowStock);
            }
            prop_assert!(matches!(
                status,
                StockStatus::LowStock | StockStatus::ReorderNeeded | StockStatus::Overstock | StockStatus::Normal
            ));
        }

        #[test]
        fn effective_price_is_stable_and_prefers_contract(
            standard in proptest::option::of(decimal_in(0..100_000)),
            contract in proptest::option::of(decimal_in(0..100_000)),
        ) {
            let mut p = product(Decimal::ONE, Decimal::ZERO, Decimal::ZERO, Decimal::TEN);
            p.standard_cost = standard;
            p.contract_price = contract;

            let first = effective_unit_price(&p);
            prop_assert_eq!(first, effective_unit_price(&p));
            if contract.is_some() {
                prop_assert_eq!(first, contract);
            } else {
                prop_assert_eq!(first, standard);
            }
        }

        #[test]
        fn days_of_stock_never_panics(
            current in decimal_in(0..1_000_000),
            rate in decimal_in(-1_000..1_000),
        ) {
            let mut p = product(current, Decimal::ZERO, Decimal::ZERO, Decimal::TEN);
            p.estimated_consumption_rate_per_day = rate;
            let days = estimated_days_of_stock(&p);
            if rate <= Decimal::ZERO {
                prop_assert!(days.is_none());
            } else {
                prop_assert!(days.is_some());
            }
        }
    }
}
