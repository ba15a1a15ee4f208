//! Stats module - aggregation and summary tables

mod aggregator;
pub mod demographics;
mod pivot;

pub use aggregator::{Aggregator, ByCategory, RankBy, RankedEntry, AMOUNT_PLACES, JOBS_PLACES};
pub use pivot::StackedTable;
