//! Analysis modules.
//!
//! Aggregation of annotation results per control.

pub mod aggregator;

pub use aggregator::*;
