pub mod access;
pub mod auth;
pub mod catalogue;
pub mod notification_service;
pub mod product_service;
pub mod requisition_service;
pub mod stock_service;
pub mod supplier_service;
pub mod unit_service;
pub mod user_service;
pub mod workflow;
