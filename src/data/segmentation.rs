//! Category Segmentation Module
//! Partitions loan records into one borrowed subset per category label.

use super::{LoanRecord, Metric};
use std::collections::HashSet;

/// Records sharing one category label.
#[derive(Debug, Clone)]
pub struct CategorySubset<'a> {
    pub category: String,
    pub records: Vec<&'a LoanRecord>,
}

impl<'a> CategorySubset<'a> {
    /// The same category narrowed to records that carry `metric`.
    pub fn having(&self, metric: Metric) -> CategorySubset<'a> {
        CategorySubset {
            category: self.category.clone(),
            records: self
                .records
                .iter()
                .copied()
                .filter(|r| metric.of(r).is_some())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Distinct category labels in order of first appearance.
pub fn distinct_categories(records: &[LoanRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.category.as_str()))
        .map(|r| r.category.clone())
        .collect()
}

/// Split records into one subset per label, in label order.
///
/// A label with no matching records yields an empty subset.
pub fn split_by_category<'a>(labels: &[String], records: &'a [LoanRecord]) -> Vec<CategorySubset<'a>> {
    labels
        .iter()
        .map(|label| CategorySubset {
            category: label.clone(),
            records: records.iter().filter(|r| &r.category == label).collect(),
        })
        .collect()
}
