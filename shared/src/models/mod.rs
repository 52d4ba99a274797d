//! Domain models for the warehouse analytics engine

mod consumption;
pub mod keys;
mod projection;
mod reference;
mod regression;

pub use consumption::*;
pub use projection::*;
pub use reference::*;
pub use regression::*;
