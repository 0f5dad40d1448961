// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::me,

        // --- Units ---
        handlers::units::list_units,
        handlers::units::create_unit,
        handlers::units::get_unit,
        handlers::units::update_unit,
        handlers::units::deactivate_unit,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::deactivate_user,
        handlers::users::assign_units,

        // --- Products ---
        handlers::products::list_categories,
        handlers::products::create_category,
        handlers::products::update_category,
        handlers::products::deactivate_category,
        handlers::products::list_products,
        handlers::products::e_catalogue,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::deactivate_product,
        handlers::products::update_stock,
        handlers::products::update_consumption,

        // --- Suppliers ---
        handlers::suppliers::list_suppliers,
        handlers::suppliers::create_supplier,
        handlers::suppliers::get_supplier,
        handlers::suppliers::update_supplier,
        handlers::suppliers::deactivate_supplier,

        // --- Stock ---
        handlers::stock::create_adjustment,
        handlers::stock::list_movements,
        handlers::stock::list_alerts,

        // --- Requisitions ---
        handlers::requisitions::list_requisitions,
        handlers::requisitions::create_requisition,
        handlers::requisitions::requisition_stats,
        handlers::requisitions::get_requisition,
        handlers::requisitions::update_requisition,
        handlers::requisitions::delete_requisition,
        handlers::requisitions::add_item,
        handlers::requisitions::update_item,
        handlers::requisitions::delete_item,
        handlers::requisitions::transition_requisition,
        handlers::requisitions::add_comment,
        handlers::requisitions::list_comments,

        // --- Notifications ---
        handlers::notifications::list_notifications,
        handlers::notifications::mark_read,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::UnitMembership,
            models::auth::UserProfile,
            models::auth::LoginPayload,
            models::auth::RefreshPayload,
            models::auth::TokenResponse,

            // --- Users ---
            models::user::CreateUserPayload,
            models::user::UpdateUserPayload,
            models::user::AssignUnitsPayload,

            // --- Units ---
            models::unit::Unit,
            models::unit::CreateUnitPayload,
            models::unit::UpdateUnitPayload,

            // --- Suppliers ---
            models::supplier::Supplier,
            models::supplier::CreateSupplierPayload,
            models::supplier::UpdateSupplierPayload,

            // --- Products ---
            models::product::ProductCategory,
            models::product::CreateCategoryPayload,
            models::product::UpdateCategoryPayload,
            models::product::Product,
            models::product::StockStatus,
            models::product::CatalogueEntry,
            models::product::CreateProductPayload,
            models::product::UpdateProductPayload,
            models::product::StockUpdatePayload,
            models::product::ConsumptionUpdatePayload,

            // --- Stock ---
            models::stock::MovementType,
            models::stock::StockMovement,
            models::stock::StockAdjustmentPayload,
            models::stock::StockAlert,

            // --- Requisitions ---
            models::requisition::RequisitionStatus,
            models::requisition::Priority,
            models::requisition::Requisition,
            models::requisition::RequisitionItem,
            models::requisition::RequisitionDetail,
            models::requisition::RequisitionItemPayload,
            models::requisition::UpdateRequisitionItemPayload,
            models::requisition::CreateRequisitionPayload,
            models::requisition::UpdateRequisitionPayload,
            models::requisition::TransitionPayload,
            models::requisition::RequisitionStats,
            models::requisition::CommentType,
            models::requisition::RequisitionComment,
            models::requisition::CreateCommentPayload,

            // --- Notifications ---
            models::notification::Notification,
        )
    ),
    tags(
        (name = "Auth", description = "Login, token refresh and the current user"),
        (name = "Units", description = "Hotel units (tenants)"),
        (name = "Users", description = "Users and their unit assignments"),
        (name = "Products", description = "Product catalogue, e-catalogue and categories"),
        (name = "Suppliers", description = "Suppliers per unit"),
        (name = "Stock", description = "Stock movements, adjustments and replenishment alerts"),
        (name = "Requisitions", description = "Purchase requisitions and their approval workflow"),
        (name = "Notifications", description = "Workflow notifications")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
