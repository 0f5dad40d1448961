#[cfg(test)]
pub(crate) mod fixtures;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod requisition_repo;
pub use requisition_repo::RequisitionRepository;
pub mod stock_repo;
pub use stock_repo::StockRepository;
pub mod supplier_repo;
pub use supplier_repo::SupplierRepository;
pub mod unit_repo;
pub use unit_repo::UnitRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
