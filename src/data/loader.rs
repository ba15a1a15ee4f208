//! CSV Table Loader Module
//! Reads the loan and demographic tables with Polars and converts them into typed records.

use super::{Cents, DemographicRow, LoanRecord};
use crate::config::{DemographicColumns, LoanColumns};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Column '{column}' not found in {table} table")]
    MissingColumn { column: String, table: &'static str },
    #[error("Negative loan amount {value} at row {row}")]
    NegativeAmount { row: usize, value: f64 },
    #[error("No usable rows in {0} table")]
    NoRecords(&'static str),
}

pub const LOAN_TABLE: &str = "loan";
pub const DEMOGRAPHIC_TABLE: &str = "demographic";

/// Handles CSV loading and the column contract with the table provider.
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file using Polars.
    pub fn read_csv(file_path: &Path) -> Result<DataFrame, LoaderError> {
        let df = LazyCsvReader::new(file_path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()?
            .collect()?;
        debug!(path = %file_path.display(), rows = df.height(), "read csv");
        Ok(df)
    }

    /// Fail with the first column of `columns` missing from `df`.
    pub fn require_columns<'a>(
        df: &DataFrame,
        columns: impl IntoIterator<Item = &'a str>,
        table: &'static str,
    ) -> Result<(), LoaderError> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        for column in columns {
            if !present.iter().any(|p| p == column) {
                return Err(LoaderError::MissingColumn {
                    column: column.to_string(),
                    table,
                });
            }
        }
        Ok(())
    }

    /// Load and convert the loan table.
    pub fn load_loans(path: &Path, columns: &LoanColumns) -> Result<Vec<LoanRecord>, LoaderError> {
        let df = Self::read_csv(path)?;
        let records = Self::loan_records(&df, columns)?;
        info!(path = %path.display(), records = records.len(), "loaded loan table");
        Ok(records)
    }

    /// Load and convert the demographic table.
    pub fn load_demographics(
        path: &Path,
        columns: &DemographicColumns,
        bucket_columns: &[String],
    ) -> Result<Vec<DemographicRow>, LoaderError> {
        let df = Self::read_csv(path)?;
        let rows = Self::demographic_rows(&df, columns, bucket_columns)?;
        info!(path = %path.display(), counties = rows.len(), "loaded demographic table");
        Ok(rows)
    }

    /// Convert a loan frame into records.
    ///
    /// Rows with a null category, amount, zip or county are dropped.
    pub fn loan_records(df: &DataFrame, columns: &LoanColumns) -> Result<Vec<LoanRecord>, LoaderError> {
        Self::require_columns(
            df,
            [
                columns.category.as_str(),
                columns.amount.as_str(),
                columns.zip.as_str(),
                columns.county.as_str(),
                columns.jobs_retained.as_str(),
            ],
            LOAN_TABLE,
        )?;

        let categories = Self::string_values(df, &columns.category)?;
        let amounts = Self::float_values(df, &columns.amount)?;
        let zips = Self::string_values(df, &columns.zip)?;
        let counties = Self::string_values(df, &columns.county)?;
        let jobs = Self::float_values(df, &columns.jobs_retained)?;

        let mut records = Vec::with_capacity(df.height());
        let mut dropped = 0usize;

        for row in 0..df.height() {
            let (Some(category), Some(amount), Some(zip), Some(county)) = (
                categories[row].clone(),
                amounts[row].filter(|v| !v.is_nan()),
                zips[row].clone(),
                counties[row].clone(),
            ) else {
                dropped += 1;
                continue;
            };
            if category.is_empty() {
                dropped += 1;
                continue;
            }
            if amount < 0.0 {
                return Err(LoaderError::NegativeAmount { row, value: amount });
            }

            records.push(LoanRecord {
                category,
                amount: Cents::from_dollars(amount),
                zip,
                county,
                jobs_retained: jobs[row],
            });
        }

        if dropped > 0 {
            warn!(dropped, "dropped loan rows with missing required fields");
        }
        if records.is_empty() {
            return Err(LoaderError::NoRecords(LOAN_TABLE));
        }
        Ok(records)
    }

    /// Convert a demographic frame into rows. Null populations count as zero.
    pub fn demographic_rows(
        df: &DataFrame,
        columns: &DemographicColumns,
        bucket_columns: &[String],
    ) -> Result<Vec<DemographicRow>, LoaderError> {
        Self::require_columns(
            df,
            [columns.county.as_str(), columns.total_population.as_str()]
                .into_iter()
                .chain(bucket_columns.iter().map(|c| c.as_str())),
            DEMOGRAPHIC_TABLE,
        )?;

        let counties = Self::string_values(df, &columns.county)?;
        let totals = Self::float_values(df, &columns.total_population)?;
        let mut bucket_values: Vec<(&String, Vec<Option<f64>>)> = Vec::new();
        for column in bucket_columns {
            bucket_values.push((column, Self::float_values(df, column)?));
        }

        let rows: Vec<DemographicRow> = (0..df.height())
            .filter_map(|row| {
                let county = counties[row].clone()?;
                let columns: HashMap<String, f64> = bucket_values
                    .iter()
                    .map(|(name, values)| ((*name).clone(), values[row].unwrap_or(0.0)))
                    .collect();
                Some(DemographicRow {
                    county,
                    total_population: totals[row].unwrap_or(0.0),
                    columns,
                })
            })
            .collect();

        if rows.is_empty() {
            return Err(LoaderError::NoRecords(DEMOGRAPHIC_TABLE));
        }
        Ok(rows)
    }

    fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, LoaderError> {
        let column = df.column(name)?.cast(&DataType::String)?;
        Ok(column
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()))
            .collect())
    }

    fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, LoaderError> {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn loan_frame() -> DataFrame {
        df![
            "RaceEthnicity" => [Some("White"), Some("Asian"), None, Some("White")],
            "LoanAmount" => [Some(1000.5), Some(250.0), Some(10.0), None],
            "Zip" => [80202i64, 80301, 80401, 80501],
            "county" => ["Denver County", "Boulder County", "Jefferson County", "Larimer County"],
            "JobsRetained" => [Some(3.0), None, Some(1.0), Some(2.0)],
        ]
        .unwrap()
    }

    #[test]
    fn test_loan_records_drop_null_rows() {
        let records = DataLoader::loan_records(&loan_frame(), &LoanColumns::default()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            LoanRecord {
                category: "White".to_string(),
                amount: Cents(100050),
                zip: "80202".to_string(),
                county: "Denver County".to_string(),
                jobs_retained: Some(3.0),
            }
        );
        assert_eq!(records[1].jobs_retained, None);
    }

    #[test]
    fn test_missing_column_is_reported_by_name() {
        let df = loan_frame().drop("Zip").unwrap();
        let err = DataLoader::loan_records(&df, &LoanColumns::default()).unwrap_err();
        match err {
            LoaderError::MissingColumn { column, table } => {
                assert_eq!(column, "Zip");
                assert_eq!(table, LOAN_TABLE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_amount_rejected() {
        let df = df![
            "RaceEthnicity" => ["White"],
            "LoanAmount" => [-5.0],
            "Zip" => ["80202"],
            "county" => ["Denver County"],
            "JobsRetained" => [1.0],
        ]
        .unwrap();
        assert!(matches!(
            DataLoader::loan_records(&df, &LoanColumns::default()),
            Err(LoaderError::NegativeAmount { row: 0, .. })
        ));
    }

    #[test]
    fn test_demographic_rows_zero_fill_nulls() {
        let df = df![
            "CTYNAME" => ["Denver County", "Weld County"],
            "TOT_POP" => [700000.0, 300000.0],
            "NH Whites" => [Some(400000.0), None],
        ]
        .unwrap();
        let rows = DataLoader::demographic_rows(
            &df,
            &DemographicColumns::default(),
            &["NH Whites".to_string()],
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].population("NH Whites"), 400000.0);
        assert_eq!(rows[1].population("NH Whites"), 0.0);
        assert_eq!(rows[1].total_population, 300000.0);
    }

    #[test]
    fn test_load_loans_from_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "RaceEthnicity,LoanAmount,Zip,county,JobsRetained").unwrap();
        writeln!(file, "Hispanic,1200.25,80202,Denver County,4").unwrap();
        writeln!(file, "Asian,300,80301,Boulder County,").unwrap();
        file.flush().unwrap();

        let records = DataLoader::load_loans(file.path(), &LoanColumns::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount, Cents(120025));
        assert_eq!(records[0].jobs_retained, Some(4.0));
        assert_eq!(records[1].zip, "80301");
        assert_eq!(records[1].jobs_retained, None);
    }
}
