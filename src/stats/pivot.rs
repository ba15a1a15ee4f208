//! Row x series tables feeding the stacked bar charts.

use super::{ByCategory, RankedEntry};
use serde::Serialize;
use std::cmp::Ordering;

/// Values laid out as rows (bars) by series (stacked segments).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedTable {
    pub rows: Vec<String>,
    pub series: Vec<String>,
    /// `values[row][series]`
    pub values: Vec<Vec<f64>>,
}

impl StackedTable {
    pub fn new(series: Vec<String>) -> Self {
        Self {
            rows: Vec::new(),
            series,
            values: Vec::new(),
        }
    }

    /// Append a row; `values` must follow series order.
    pub fn push_row(&mut self, row: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.series.len());
        self.rows.push(row.into());
        self.values.push(values);
    }

    /// Pivot per-category rankings into one row per distinct key.
    ///
    /// Rows appear in first-seen order across categories; a key a category
    /// did not rank contributes zero for that category.
    pub fn from_ranked(ranked: &ByCategory<Vec<RankedEntry>>) -> Self {
        let series: Vec<String> = ranked.categories().map(str::to_string).collect();
        let mut table = StackedTable::new(series);

        for (col, (_, entries)) in ranked.iter().enumerate() {
            for entry in entries {
                let row = match table.rows.iter().position(|r| *r == entry.key) {
                    Some(row) => row,
                    None => {
                        table.push_row(entry.key.clone(), vec![0.0; table.series.len()]);
                        table.rows.len() - 1
                    }
                };
                table.values[row][col] += entry.value;
            }
        }
        table
    }

    pub fn row_total(&self, row: usize) -> f64 {
        self.values[row].iter().sum()
    }

    pub fn max_total(&self) -> f64 {
        (0..self.rows.len())
            .map(|r| self.row_total(r))
            .fold(0.0, f64::max)
    }

    /// Reorder rows by `key` ascending; equal keys keep their order.
    pub fn sort_rows_by<F>(mut self, key: F) -> Self
    where
        F: Fn(usize) -> f64,
    {
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        order.sort_by(|&a, &b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));

        let rows = order.iter().map(|&i| self.rows[i].clone()).collect();
        let values = order.iter().map(|&i| self.values[i].clone()).collect();
        self.rows = rows;
        self.values = values;
        self
    }

    /// Reorder rows by their total across series, ascending.
    pub fn sorted_by_total(self) -> Self {
        let totals: Vec<f64> = (0..self.rows.len()).map(|r| self.row_total(r)).collect();
        self.sort_rows_by(|r| totals[r])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ranked() -> ByCategory<Vec<RankedEntry>> {
        vec![
            (
                "White".to_string(),
                vec![RankedEntry::new("Denver", 5.0), RankedEntry::new("Weld", 1.0)],
            ),
            (
                "Asian".to_string(),
                vec![RankedEntry::new("Boulder", 3.0), RankedEntry::new("Denver", 2.0)],
            ),
            ("Puerto Rican".to_string(), Vec::new()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_pivot_fills_missing_with_zero() {
        let table = StackedTable::from_ranked(&ranked());

        assert_eq!(table.series, vec!["White", "Asian", "Puerto Rican"]);
        assert_eq!(table.rows, vec!["Denver", "Weld", "Boulder"]);
        assert_eq!(
            table.values,
            vec![
                vec![5.0, 2.0, 0.0],
                vec![1.0, 0.0, 0.0],
                vec![0.0, 3.0, 0.0],
            ]
        );
    }

    #[test]
    fn test_sorted_by_total_ascending() {
        let table = StackedTable::from_ranked(&ranked()).sorted_by_total();
        assert_eq!(table.rows, vec!["Weld", "Boulder", "Denver"]);
        assert_eq!(table.max_total(), 7.0);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut table = StackedTable::new(vec!["A".to_string()]);
        table.push_row("x", vec![2.0]);
        table.push_row("y", vec![1.0]);
        table.push_row("z", vec![2.0]);
        let table = table.sorted_by_total();
        assert_eq!(table.rows, vec!["y", "x", "z"]);
    }
}
