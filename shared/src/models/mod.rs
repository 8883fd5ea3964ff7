//! Domain models for the Stockroom inventory backend

mod activity;
mod daily_calculation;
mod department;
mod product;
mod recipe;
mod stock;
mod user;

pub use activity::*;
pub use daily_calculation::*;
pub use department::*;
pub use product::*;
pub use recipe::*;
pub use stock::*;
pub use user::*;
