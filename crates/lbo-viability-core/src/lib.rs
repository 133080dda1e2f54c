pub mod covenants;
pub mod debt;
pub mod decision;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod normalization;
pub mod projection;
pub mod stress;
pub mod types;

pub use error::ViabilityError;
pub use types::*;

/// Standard result type for all viability operations
pub type ViabilityResult<T> = Result<T, ViabilityError>;
