//! HTTP handlers

pub mod auth;
pub mod catalog;
pub mod daily_calculation;
pub mod health;
pub mod logs;
pub mod recipe;
pub mod reporting;
pub mod stock;
pub mod user;

pub use auth::*;
pub use catalog::*;
pub use daily_calculation::*;
pub use health::*;
pub use logs::*;
pub use recipe::*;
pub use reporting::*;
pub use stock::*;
pub use user::*;
