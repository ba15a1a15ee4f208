//! Report pipeline.
//!
//! Loads both tables, computes every aggregate once into a [`ReportSummary`],
//! renders the charts from it and writes the summary next to the images.

use crate::charts::{ChartError, ChartLabels, Palette, ScatterSeries, StaticChartRenderer};
use crate::config::{ConfigError, ReportConfig};
use crate::data::{
    distinct_categories, split_by_category, CategorySubset, Cents, DataLoader, DemographicRow, LoaderError, LoanRecord,
    Metric, SecondaryKey,
};
use crate::stats::demographics::{bucket_totals, county_breakdown};
use crate::stats::{Aggregator, ByCategory, RankBy, RankedEntry, StackedTable, AMOUNT_PLACES, JOBS_PLACES};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
    #[error("None of the top loan counties {0:?} appear in the demographic table")]
    UnmatchedCounties(Vec<String>),
}

/// Every aggregate drawn by the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub record_count: usize,
    pub categories: Vec<String>,
    pub average_loan: ByCategory<Option<f64>>,
    pub total_loan: ByCategory<Cents>,
    pub top_zip_by_count: ByCategory<Vec<RankedEntry>>,
    pub top_county_by_count: ByCategory<Vec<RankedEntry>>,
    pub top_county_by_sum: ByCategory<Vec<RankedEntry>>,
    pub demographic_totals: ByCategory<f64>,
    /// Counties with the most loans overall, largest first.
    pub top_loan_counties: Vec<RankedEntry>,
    pub county_demographics: StackedTable,
    /// Scatter means, both taken over records that report jobs retained.
    pub mean_amount: ByCategory<Option<f64>>,
    pub mean_jobs_retained: ByCategory<Option<f64>>,
}

/// Compute all aggregates. Pure; the same input always yields the same summary.
///
/// Fails when no top loan county can be matched to a demographic row.
pub fn summarize(
    records: &[LoanRecord],
    demographics: &[DemographicRow],
    config: &ReportConfig,
) -> Result<ReportSummary, ReportError> {
    let categories = distinct_categories(records);
    let subsets = split_by_category(&categories, records);
    let job_subsets: Vec<CategorySubset> = subsets.iter().map(|s| s.having(Metric::JobsRetained)).collect();
    let n = config.top_n;

    let all: Vec<&LoanRecord> = records.iter().collect();
    let top_loan_counties = Aggregator::rank_groups(
        &all,
        SecondaryKey::County,
        Metric::LoanAmount,
        config.demographic_county_count,
        RankBy::Count,
    );
    let county_names: Vec<String> = top_loan_counties.iter().map(|e| e.key.clone()).collect();
    let county_demographics = county_breakdown(demographics, &county_names, &config.buckets);
    if county_demographics.rows.is_empty() {
        return Err(ReportError::UnmatchedCounties(county_names));
    }

    Ok(ReportSummary {
        record_count: records.len(),
        average_loan: Aggregator::average_by_category(&subsets),
        total_loan: Aggregator::sum_by_category(&subsets),
        top_zip_by_count: Aggregator::top_n_by_secondary_key(
            &subsets,
            SecondaryKey::Zip,
            Metric::LoanAmount,
            n,
            RankBy::Count,
        ),
        top_county_by_count: Aggregator::top_n_by_secondary_key(
            &subsets,
            SecondaryKey::County,
            Metric::LoanAmount,
            n,
            RankBy::Count,
        ),
        top_county_by_sum: Aggregator::top_n_by_secondary_key(
            &subsets,
            SecondaryKey::County,
            Metric::LoanAmount,
            n,
            RankBy::Sum,
        ),
        demographic_totals: bucket_totals(demographics, &config.buckets),
        county_demographics,
        top_loan_counties,
        mean_amount: Aggregator::mean_by_category(&job_subsets, Metric::LoanAmount, AMOUNT_PLACES),
        mean_jobs_retained: Aggregator::mean_by_category(&job_subsets, Metric::JobsRetained, JOBS_PLACES),
        categories,
    })
}

/// Render every chart of the report, returning the written paths in order.
pub fn render_charts(
    summary: &ReportSummary,
    records: &[LoanRecord],
    config: &ReportConfig,
) -> Result<Vec<PathBuf>, ReportError> {
    let palette = Palette::from_hex(&config.palette)?;
    let renderer = StaticChartRenderer::new(palette, config.chart_width, config.chart_height);
    let files = &config.outputs;
    let region = &config.region;
    let n = config.top_n;
    let mut written = Vec::new();

    let total_path = config.output_path(&files.total_loan);
    let totals: ByCategory<f64> = summary
        .total_loan
        .iter()
        .map(|(c, cents)| (c.to_string(), cents.to_dollars()))
        .collect();
    renderer.render_category_bars(
        &total_path,
        &summary.categories,
        &totals,
        ChartLabels {
            title: &format!("Total Loan Amount by Ethnicity in {region}"),
            x_desc: "Ethnicity",
            y_desc: "Total Loan Amount in $",
        },
        false,
    )?;
    written.push(total_path);

    let average_path = config.output_path(&files.average_loan);
    let averages = StaticChartRenderer::require_data(&summary.average_loan)?;
    renderer.render_category_bars(
        &average_path,
        &summary.categories,
        &averages,
        ChartLabels {
            title: &format!("Average Loan Amount by Ethnicity in {region}"),
            x_desc: "Ethnicity",
            y_desc: "Average Loan Amount in $",
        },
        false,
    )?;
    written.push(average_path);

    let stacked: [(&String, &ByCategory<Vec<RankedEntry>>, String, &str); 3] = [
        (
            &files.top_zip_count,
            &summary.top_zip_by_count,
            format!("Top {n} Zip Codes for Count of Loans"),
            "Number of Loans",
        ),
        (
            &files.top_county_count,
            &summary.top_county_by_count,
            format!("Top {n} Counties for Loans"),
            "Number of Loans",
        ),
        (
            &files.top_county_sum,
            &summary.top_county_by_sum,
            format!("Top {n} Counties for Loan Amount"),
            "Total Loan Amount in $",
        ),
    ];
    for (file, ranked, title, x_desc) in stacked {
        let path = config.output_path(file);
        let table = StackedTable::from_ranked(ranked).sorted_by_total();
        renderer.render_stacked_bars(
            &path,
            &table,
            ChartLabels {
                title: &title,
                x_desc,
                y_desc: "",
            },
        )?;
        written.push(path);
    }

    let demographics_path = config.output_path(&files.demographics);
    let bucket_labels: Vec<String> = config.buckets.iter().map(|b| b.label.clone()).collect();
    renderer.render_category_bars(
        &demographics_path,
        &bucket_labels,
        &summary.demographic_totals,
        ChartLabels {
            title: &format!("Distribution of Ethnicity in {region}"),
            x_desc: "Ethnicity",
            y_desc: "Number of People (log scale)",
        },
        true,
    )?;
    written.push(demographics_path);

    let county_demographics_path = config.output_path(&files.top_county_demographics);
    renderer.render_stacked_bars(
        &county_demographics_path,
        &summary.county_demographics,
        ChartLabels {
            title: &format!(
                "Demographics of Top {} Counties for Loans",
                summary.county_demographics.rows.len()
            ),
            x_desc: "Number of People",
            y_desc: "",
        },
    )?;
    written.push(county_demographics_path);

    let scatter_path = config.output_path(&files.loan_vs_jobs);
    let subsets = split_by_category(&summary.categories, records);
    let series: Vec<ScatterSeries> = subsets
        .iter()
        .map(|subset| {
            let mean = match (
                summary.mean_amount.get(&subset.category),
                summary.mean_jobs_retained.get(&subset.category),
            ) {
                (Some(Some(x)), Some(Some(y))) => Some((*x, *y)),
                _ => None,
            };
            ScatterSeries {
                category: subset.category.clone(),
                points: Aggregator::paired_values(subset, Metric::LoanAmount, Metric::JobsRetained),
                mean,
            }
        })
        .collect();
    renderer.render_scatter(
        &scatter_path,
        &series,
        config.jobs_axis_max,
        ChartLabels {
            title: "Loan Amount vs Jobs Retained by Ethnicity",
            x_desc: "Amount of Loan in USD",
            y_desc: "Jobs Retained",
        },
    )?;
    written.push(scatter_path);

    for path in &written {
        info!(path = %path.display(), "chart written");
    }
    Ok(written)
}

/// Write the summary as pretty JSON.
pub fn write_summary(summary: &ReportSummary, path: &Path) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)?;
    Ok(())
}

/// Run the whole report: load, aggregate, render, write the summary.
pub fn run(config: &ReportConfig) -> Result<ReportSummary, ReportError> {
    config.validate()?;

    let records = DataLoader::load_loans(&config.loans_path, &config.loan_columns)?;
    let demographics = DataLoader::load_demographics(
        &config.demographics_path,
        &config.demographic_columns,
        &config.bucket_columns(),
    )?;

    let summary = summarize(&records, &demographics, config)?;
    info!(
        records = summary.record_count,
        categories = summary.categories.len(),
        "aggregates computed"
    );

    render_charts(&summary, &records, config)?;

    let summary_path = config.output_path(&config.outputs.summary);
    write_summary(&summary, &summary_path)?;
    info!(path = %summary_path.display(), "summary written");

    Ok(summary)
}
