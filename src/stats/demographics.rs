//! Demographic Summaries
//! Population totals per demographic bucket, overall and for selected counties.

use super::{ByCategory, StackedTable};
use crate::config::DemographicBucket;
use crate::data::DemographicRow;
use tracing::warn;

fn bucket_population(row: &DemographicRow, bucket: &DemographicBucket) -> f64 {
    bucket.columns.iter().map(|c| row.population(c)).sum()
}

/// Population of each bucket summed over every county.
pub fn bucket_totals(rows: &[DemographicRow], buckets: &[DemographicBucket]) -> ByCategory<f64> {
    buckets
        .iter()
        .map(|bucket| {
            let total = rows.iter().map(|row| bucket_population(row, bucket)).sum();
            (bucket.label.clone(), total)
        })
        .collect()
}

/// Bucket populations of the given counties, ascending by total population.
///
/// Counties missing from the table are skipped.
pub fn county_breakdown(
    rows: &[DemographicRow],
    counties: &[String],
    buckets: &[DemographicBucket],
) -> StackedTable {
    let mut table = StackedTable::new(buckets.iter().map(|b| b.label.clone()).collect());
    let mut populations = Vec::new();

    for county in counties {
        let Some(row) = rows.iter().find(|r| &r.county == county) else {
            warn!(county = %county, "county missing from demographic table");
            continue;
        };
        let values = buckets.iter().map(|b| bucket_population(row, b)).collect();
        table.push_row(county.clone(), values);
        populations.push(row.total_population);
    }

    table.sort_rows_by(|r| populations[r])
}
