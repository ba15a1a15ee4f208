//! Aggregation Module
//! Per-category means, sums and top-N geography breakdowns.

use crate::data::{CategorySubset, Cents, LoanRecord, Metric, SecondaryKey};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Decimal places of averaged loan amounts.
pub const AMOUNT_PLACES: u32 = 2;
/// Decimal places of averaged jobs retained.
pub const JOBS_PLACES: u32 = 3;

/// Insertion-ordered mapping from category label to a value.
#[derive(Debug, Clone, PartialEq)]
pub struct ByCategory<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for ByCategory<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> ByCategory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the original position on replace.
    pub fn insert(&mut self, category: impl Into<String>, value: T) {
        let category = category.into();
        match self.entries.iter_mut().find(|(c, _)| *c == category) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((category, value)),
        }
    }

    pub fn get(&self, category: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, v)| v)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }
}

impl<T> FromIterator<(String, T)> for ByCategory<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut map = ByCategory::new();
        for (category, value) in iter {
            map.insert(category, value);
        }
        map
    }
}

impl<T: Serialize> Serialize for ByCategory<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (category, value) in &self.entries {
            map.serialize_entry(category, value)?;
        }
        map.end()
    }
}

/// One group of a top-N breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub key: String,
    pub value: f64,
}

impl RankedEntry {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// What a top-N breakdown measures per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    /// Number of records in the group.
    Count,
    /// Sum of the metric over the group.
    Sum,
}

#[derive(Debug, Default)]
struct GroupTally {
    count: u64,
    amount: Cents,
    metric_sum: f64,
}

impl GroupTally {
    fn add(&mut self, record: &LoanRecord, metric: Metric) {
        self.count += 1;
        self.amount = self.amount + record.amount;
        if let Some(v) = metric.of(record) {
            self.metric_sum += v;
        }
    }

    fn value(&self, metric: Metric, by: RankBy) -> f64 {
        match (by, metric) {
            (RankBy::Count, _) => self.count as f64,
            (RankBy::Sum, Metric::LoanAmount) => self.amount.to_dollars(),
            (RankBy::Sum, Metric::JobsRetained) => self.metric_sum,
        }
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Calculates summary statistics over category subsets.
pub struct Aggregator;

impl Aggregator {
    /// Mean loan amount per category in dollars, rounded to cents.
    ///
    /// An empty subset maps to `None`.
    pub fn average_by_category(subsets: &[CategorySubset]) -> ByCategory<Option<f64>> {
        subsets
            .iter()
            .map(|subset| {
                let mean = if subset.is_empty() {
                    None
                } else {
                    let total: Cents = subset.records.iter().map(|r| r.amount).sum();
                    let mean_cents = total.0 as f64 / subset.len() as f64;
                    Some(mean_cents.round() / 100.0)
                };
                (subset.category.clone(), mean)
            })
            .collect()
    }

    /// Total loan amount per category.
    pub fn sum_by_category(subsets: &[CategorySubset]) -> ByCategory<Cents> {
        subsets
            .iter()
            .map(|subset| {
                let total: Cents = subset.records.iter().map(|r| r.amount).sum();
                (subset.category.clone(), total)
            })
            .collect()
    }

    /// Rounded mean of any metric per category, ignoring records without it.
    pub fn mean_by_category(
        subsets: &[CategorySubset],
        metric: Metric,
        places: u32,
    ) -> ByCategory<Option<f64>> {
        subsets
            .iter()
            .map(|subset| {
                let values: Vec<f64> = subset.records.iter().filter_map(|r| metric.of(r)).collect();
                let mean = if values.is_empty() {
                    None
                } else {
                    Some(round_to(values.iter().mean(), places))
                };
                (subset.category.clone(), mean)
            })
            .collect()
    }

    /// Top `n` groups of each subset by `key`, measured by `by` over `metric`.
    pub fn top_n_by_secondary_key(
        subsets: &[CategorySubset],
        key: SecondaryKey,
        metric: Metric,
        n: usize,
        by: RankBy,
    ) -> ByCategory<Vec<RankedEntry>> {
        subsets
            .iter()
            .map(|subset| {
                let ranked = Self::rank_groups(&subset.records, key, metric, n, by);
                (subset.category.clone(), ranked)
            })
            .collect()
    }

    /// Group records by `key`, measure each group and keep the `n` largest.
    ///
    /// Groups are first ordered by first appearance; the stable sort keeps
    /// that order among ties.
    pub fn rank_groups(
        records: &[&LoanRecord],
        key: SecondaryKey,
        metric: Metric,
        n: usize,
        by: RankBy,
    ) -> Vec<RankedEntry> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut tallies: Vec<(&str, GroupTally)> = Vec::new();

        for record in records {
            let group = key.of(record);
            let slot = *index.entry(group).or_insert_with(|| {
                tallies.push((group, GroupTally::default()));
                tallies.len() - 1
            });
            tallies[slot].1.add(record, metric);
        }

        let mut ranked: Vec<RankedEntry> = tallies
            .into_iter()
            .map(|(group, tally)| RankedEntry::new(group, tally.value(metric, by)))
            .collect();
        ranked.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
        ranked.truncate(n);
        ranked
    }

    /// (x, y) pairs for records carrying both metrics.
    pub fn paired_values(subset: &CategorySubset, x: Metric, y: Metric) -> Vec<(f64, f64)> {
        subset
            .records
            .iter()
            .filter_map(|r| Some((x.of(r)?, y.of(r)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{distinct_categories, split_by_category};
    use pretty_assertions::assert_eq;

    fn record(category: &str, dollars: f64, zip: &str, county: &str) -> LoanRecord {
        LoanRecord {
            category: category.to_string(),
            amount: Cents::from_dollars(dollars),
            zip: zip.to_string(),
            county: county.to_string(),
            jobs_retained: None,
        }
    }

    fn scenario() -> Vec<LoanRecord> {
        vec![
            record("A", 100.0, "1", "X"),
            record("A", 300.0, "1", "X"),
            record("B", 50.0, "2", "Y"),
        ]
    }

    #[test]
    fn test_average_and_sum_scenario() {
        let records = scenario();
        let labels = distinct_categories(&records);
        let subsets = split_by_category(&labels, &records);

        let averages = Aggregator::average_by_category(&subsets);
        assert_eq!(averages.get("A"), Some(&Some(200.0)));
        assert_eq!(averages.get("B"), Some(&Some(50.0)));

        let sums = Aggregator::sum_by_category(&subsets);
        assert_eq!(sums.get("A").map(|c| c.to_dollars()), Some(400.0));
        assert_eq!(sums.get("B").map(|c| c.to_dollars()), Some(50.0));
    }

    #[test]
    fn test_top_one_by_count_scenario() {
        let records = scenario();
        let labels = distinct_categories(&records);
        let subsets = split_by_category(&labels, &records);

        let top = Aggregator::top_n_by_secondary_key(
            &subsets,
            SecondaryKey::Zip,
            Metric::LoanAmount,
            1,
            RankBy::Count,
        );
        assert_eq!(top.get("A"), Some(&vec![RankedEntry::new("1", 2.0)]));
        assert_eq!(top.get("B"), Some(&vec![RankedEntry::new("2", 1.0)]));
    }

    #[test]
    fn test_empty_subset_average_is_no_data() {
        let records = scenario();
        let labels = vec!["A".to_string(), "Missing".to_string()];
        let subsets = split_by_category(&labels, &records);

        let averages = Aggregator::average_by_category(&subsets);
        assert_eq!(averages.get("Missing"), Some(&None));

        let top = Aggregator::top_n_by_secondary_key(
            &subsets,
            SecondaryKey::County,
            Metric::LoanAmount,
            5,
            RankBy::Count,
        );
        assert_eq!(top.get("Missing"), Some(&Vec::new()));
    }

    #[test]
    fn test_average_rounds_half_away_from_zero() {
        let records = vec![
            record("A", 0.01, "1", "X"),
            record("A", 0.02, "1", "X"),
        ];
        let labels = distinct_categories(&records);
        let subsets = split_by_category(&labels, &records);
        // 0.015 rounds up to 0.02
        assert_eq!(
            Aggregator::average_by_category(&subsets).get("A"),
            Some(&Some(0.02))
        );
    }

    #[test]
    fn test_top_n_truncates_and_sorts_descending() {
        let mut records = Vec::new();
        for (zip, count) in [("a", 1), ("b", 4), ("c", 2), ("d", 7), ("e", 3), ("f", 5), ("g", 6)] {
            for _ in 0..count {
                records.push(record("A", 10.0, zip, "X"));
            }
        }
        let subsets = split_by_category(&["A".to_string()], &records);
        let top = Aggregator::top_n_by_secondary_key(
            &subsets,
            SecondaryKey::Zip,
            Metric::LoanAmount,
            5,
            RankBy::Count,
        );
        let entries = top.get("A").unwrap();

        assert_eq!(entries.len(), 5);
        assert!(entries.windows(2).all(|w| w[0].value >= w[1].value));
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["d", "g", "f", "b", "e"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![
            record("A", 10.0, "z", "X"),
            record("A", 10.0, "m", "X"),
            record("A", 10.0, "a", "X"),
        ];
        let refs: Vec<&LoanRecord> = records.iter().collect();
        let ranked = Aggregator::rank_groups(&refs, SecondaryKey::Zip, Metric::LoanAmount, 5, RankBy::Count);
        let keys: Vec<&str> = ranked.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["z", "m", "a"]);
    }

    #[test]
    fn test_top_by_sum_of_amount() {
        let records = vec![
            record("A", 100.0, "1", "Denver County"),
            record("A", 100.0, "1", "Denver County"),
            record("A", 500.0, "2", "Weld County"),
        ];
        let subsets = split_by_category(&["A".to_string()], &records);
        let top = Aggregator::top_n_by_secondary_key(
            &subsets,
            SecondaryKey::County,
            Metric::LoanAmount,
            5,
            RankBy::Sum,
        );
        assert_eq!(
            top.get("A"),
            Some(&vec![
                RankedEntry::new("Weld County", 500.0),
                RankedEntry::new("Denver County", 200.0),
            ])
        );
    }

    #[test]
    fn test_mean_of_jobs_ignores_missing() {
        let mut records = scenario();
        records[0].jobs_retained = Some(1.0);
        records[1].jobs_retained = Some(2.0);
        let labels = distinct_categories(&records);
        let subsets = split_by_category(&labels, &records);

        let means = Aggregator::mean_by_category(&subsets, Metric::JobsRetained, JOBS_PLACES);
        assert_eq!(means.get("A"), Some(&Some(1.5)));
        assert_eq!(means.get("B"), Some(&None));

        let pairs = Aggregator::paired_values(&subsets[0], Metric::LoanAmount, Metric::JobsRetained);
        assert_eq!(pairs, vec![(100.0, 1.0), (300.0, 2.0)]);
    }

    #[test]
    fn test_rounding_is_idempotent() {
        for i in 0..2000 {
            let value = i as f64 * 1.234_567 - 700.0;
            let once = round_to(value, 2);
            assert_eq!(round_to(once, 2), once);
            let once3 = round_to(value, 3);
            assert_eq!(round_to(once3, 3), once3);
        }
    }

    #[test]
    fn test_by_category_serializes_as_ordered_map() {
        let map: ByCategory<f64> = vec![("B".to_string(), 1.0), ("A".to_string(), 2.0)]
            .into_iter()
            .collect();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"B":1.0,"A":2.0}"#);
    }
}
