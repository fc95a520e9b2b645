pub mod period;
pub mod prediction;

pub use period::{PeriodRecord, DEFAULT_USER};
pub use prediction::CachedPrediction;
