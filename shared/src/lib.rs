//! Shared types and computations for the warehouse analytics engine
//!
//! This crate contains the models, period aggregation, trend fitting and
//! reorder arithmetic shared between the backend and the browser (via WASM).

pub mod aggregation;
pub mod models;
pub mod query;
pub mod replenishment;
pub mod trend;
pub mod types;
pub mod validation;

pub use models::*;
pub use query::*;
pub use types::*;
pub use validation::*;
