//! Business logic services for the Stockroom backend

pub mod activity;
pub mod auth;
pub mod catalog;
pub mod daily_calculation;
pub mod recipe;
pub mod reporting;
pub mod stock;
pub mod user;

pub use activity::ActivityService;
pub use auth::AuthService;
pub use catalog::CatalogService;
pub use daily_calculation::DailyCalculationService;
pub use recipe::RecipeService;
pub use reporting::ReportingService;
pub use stock::StockService;
pub use user::UserService;
