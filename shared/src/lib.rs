//! Shared types and domain engines for the Stockroom inventory backend
//!
//! This crate holds everything that does not touch I/O: catalog and ledger
//! models, recipe costing, ingredient requirement aggregation, usage
//! reconciliation and the date-range helpers the reports are built on.
//! The backend persists and serves these; the WASM crate reuses them for
//! client-side previews.

pub mod aggregation;
pub mod costing;
pub mod ledger;
pub mod models;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use aggregation::*;
pub use costing::*;
pub use ledger::*;
pub use models::*;
pub use reconciliation::*;
pub use types::*;
pub use validation::*;
