pub mod aggregate;
pub mod models;

pub use aggregate::aggregate;
pub use models::{AggregateStats, RatingHistogram, Suggestion};

/// Averages strictly above this earn the top suggestion tier
pub const TOP_TIER_ABOVE: f64 = 4.0;
/// Averages strictly above this (and not above the top bound) earn the
/// middle tier
pub const MIDDLE_TIER_ABOVE: f64 = 3.0;
