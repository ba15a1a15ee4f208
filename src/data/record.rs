//! Loan and demographic record types.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Currency amount stored as whole cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    /// Convert a dollar amount, rounding to the nearest cent.
    pub fn from_dollars(dollars: f64) -> Self {
        Cents((dollars * 100.0).round() as i64)
    }

    pub fn to_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Self {
        iter.fold(Cents::default(), Add::add)
    }
}

impl<'a> Sum<&'a Cents> for Cents {
    fn sum<I: Iterator<Item = &'a Cents>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// One disbursement entry joined with its county.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRecord {
    pub category: String,
    pub amount: Cents,
    pub zip: String,
    pub county: String,
    pub jobs_retained: Option<f64>,
}

/// Geography field used as a secondary grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryKey {
    Zip,
    County,
}

impl SecondaryKey {
    pub fn of<'a>(&self, record: &'a LoanRecord) -> &'a str {
        match self {
            SecondaryKey::Zip => &record.zip,
            SecondaryKey::County => &record.county,
        }
    }
}

/// Numeric field of a loan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    LoanAmount,
    JobsRetained,
}

impl Metric {
    /// Metric value in display units (dollars for amounts), `None` when absent.
    pub fn of(&self, record: &LoanRecord) -> Option<f64> {
        match self {
            Metric::LoanAmount => Some(record.amount.to_dollars()),
            Metric::JobsRetained => record.jobs_retained.filter(|v| v.is_finite()),
        }
    }
}

/// One county of the demographic table.
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicRow {
    pub county: String,
    pub total_population: f64,
    /// Population per demographic source column.
    pub columns: HashMap<String, f64>,
}

impl DemographicRow {
    /// Population in `column`, zero when the column was not loaded.
    pub fn population(&self, column: &str) -> f64 {
        self.columns.get(column).copied().unwrap_or(0.0)
    }
}
