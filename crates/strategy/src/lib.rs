//! Strategy configuration types for Morpho vault reallocation.
//!
//! A strategy is the operator-curated target for a single market. This crate
//! provides the validated [`Strategy`] sum type consumed by the reallocation
//! engine, and the [`StrategyRecord`] wire shape served by the strategy API.

mod error;
mod types;

pub use error::StrategyError;
pub use types::*;
