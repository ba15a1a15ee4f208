//! Data module - table loading, record types and segmentation

mod loader;
mod record;
mod segmentation;

pub use loader::{DataLoader, LoaderError};
pub use record::{Cents, DemographicRow, LoanRecord, Metric, SecondaryKey};
pub use segmentation::{distinct_categories, split_by_category, CategorySubset};
