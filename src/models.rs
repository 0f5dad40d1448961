pub mod auth;
pub mod notification;
pub mod product;
pub mod requisition;
pub mod stock;
pub mod supplier;
pub mod unit;
pub mod user;
