//! Command implementations.

pub mod borrow;
pub mod candidates;
pub mod market;
pub mod seek;
pub mod series;

pub use borrow::run_borrow;
pub use candidates::run_candidates;
pub use market::run_market;
pub use seek::run_seek;
pub use series::run_series;
