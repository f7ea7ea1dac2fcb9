//! Filtering and cross-scanner reconciliation.

pub mod filters;
pub mod reconcile;
pub mod sets;

pub use filters::*;
pub use reconcile::*;
pub use sets::*;
