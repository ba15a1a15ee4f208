//! Report configuration.
//!
//! Every knob has a default that reproduces the stock report, so running
//! without a config file is the normal case. A JSON file may override any
//! subset of fields.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Column names of the loan table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoanColumns {
    pub category: String,
    pub amount: String,
    pub zip: String,
    pub county: String,
    pub jobs_retained: String,
}

impl Default for LoanColumns {
    fn default() -> Self {
        Self {
            category: "RaceEthnicity".to_string(),
            amount: "LoanAmount".to_string(),
            zip: "Zip".to_string(),
            county: "county".to_string(),
            jobs_retained: "JobsRetained".to_string(),
        }
    }
}

/// Column names of the demographic table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemographicColumns {
    pub county: String,
    pub total_population: String,
}

impl Default for DemographicColumns {
    fn default() -> Self {
        Self {
            county: "CTYNAME".to_string(),
            total_population: "TOT_POP".to_string(),
        }
    }
}

/// A labelled group of demographic columns summed together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemographicBucket {
    pub label: String,
    pub columns: Vec<String>,
}

impl DemographicBucket {
    fn new(label: &str, columns: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Output file names, relative to the output directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputFiles {
    pub total_loan: String,
    pub average_loan: String,
    pub top_zip_count: String,
    pub top_county_count: String,
    pub top_county_sum: String,
    pub demographics: String,
    pub top_county_demographics: String,
    pub loan_vs_jobs: String,
    pub summary: String,
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            total_loan: "total_loan_ethnicity.png".to_string(),
            average_loan: "avg_loan_ethnicity.png".to_string(),
            top_zip_count: "top_zip_loancount.png".to_string(),
            top_county_count: "top_county_loancount.png".to_string(),
            top_county_sum: "top_county_loansum.png".to_string(),
            demographics: "demographics.png".to_string(),
            top_county_demographics: "top_county_loancount_demographic.png".to_string(),
            loan_vs_jobs: "loan_vs_jobs_retained.png".to_string(),
            summary: "summary.json".to_string(),
        }
    }
}

/// Root configuration for a report run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub loans_path: PathBuf,
    pub demographics_path: PathBuf,
    pub output_dir: PathBuf,
    /// Region named in chart titles.
    pub region: String,
    pub loan_columns: LoanColumns,
    pub demographic_columns: DemographicColumns,
    pub buckets: Vec<DemographicBucket>,
    /// Series colors as `#rrggbb`, one per category.
    pub palette: Vec<String>,
    /// Entries kept per category in top-N breakdowns.
    pub top_n: usize,
    /// Counties shown in the demographic comparison chart.
    pub demographic_county_count: usize,
    /// Upper bound of the jobs-retained axis on the scatter chart.
    pub jobs_axis_max: f64,
    /// Canvas size in pixels before cropping.
    pub chart_width: u32,
    pub chart_height: u32,
    pub outputs: OutputFiles,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            loans_path: PathBuf::from("data/loans.csv"),
            demographics_path: PathBuf::from("data/demographics.csv"),
            output_dir: PathBuf::from("images"),
            region: "Colorado".to_string(),
            loan_columns: LoanColumns::default(),
            demographic_columns: DemographicColumns::default(),
            buckets: vec![
                DemographicBucket::new("White", &["NH Whites"]),
                DemographicBucket::new("Hispanic", &["Hispanic"]),
                DemographicBucket::new("American Indian or Alaska Native", &["NH Am Indian/Native"]),
                DemographicBucket::new("Asian", &["NH Asian"]),
                DemographicBucket::new("Black or African American", &["NH Afr Am"]),
                DemographicBucket::new("Other", &["NH Two or more", "NH Native Hawaiian/other"]),
            ],
            palette: ["#003f5c", "#58508d", "#bc5090", "#dd5182", "#ff6361", "#ffa600"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            top_n: 5,
            demographic_county_count: 8,
            jobs_axis_max: 125.0,
            chart_width: 1600,
            chart_height: 900,
            outputs: OutputFiles::default(),
        }
    }
}

impl ReportConfig {
    /// Load a config file, filling unspecified fields with defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ReportConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".into()));
        }
        if self.chart_width == 0 || self.chart_height == 0 {
            return Err(ConfigError::Invalid("chart size must be non-zero".into()));
        }
        if !(self.jobs_axis_max > 0.0) {
            return Err(ConfigError::Invalid("jobs_axis_max must be positive".into()));
        }
        if let Some(bucket) = self.buckets.iter().find(|b| b.columns.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "demographic bucket '{}' has no columns",
                bucket.label
            )));
        }
        Ok(())
    }

    /// Every demographic column referenced by a bucket, without duplicates.
    pub fn bucket_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for column in self.buckets.iter().flat_map(|b| b.columns.iter()) {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        columns
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.palette.len(), 6);
        assert_eq!(config.buckets.len(), 6);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"top_n": 3, "loan_columns": {{"zip": "ZipCode"}}}}"#).unwrap();

        let config = ReportConfig::load(file.path()).unwrap();
        assert_eq!(config.top_n, 3);
        assert_eq!(config.loan_columns.zip, "ZipCode");
        assert_eq!(config.loan_columns.amount, "LoanAmount");
        assert_eq!(config.outputs, OutputFiles::default());
    }

    #[test]
    fn test_zero_top_n_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"top_n": 0}}"#).unwrap();
        assert!(matches!(
            ReportConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_bucket_columns_deduplicated() {
        let mut config = ReportConfig::default();
        config
            .buckets
            .push(DemographicBucket::new("Whites again", &["NH Whites"]));
        let columns = config.bucket_columns();
        assert_eq!(columns.len(), 7);
        assert_eq!(columns[0], "NH Whites");
    }
}
