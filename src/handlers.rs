pub mod auth;
pub mod notifications;
pub mod products;
pub mod requisitions;
pub mod stock;
pub mod suppliers;
pub mod units;
pub mod users;
