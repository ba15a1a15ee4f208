//! Charts module - static chart rendering

mod palette;
mod renderer;

pub use palette::Palette;
pub use renderer::{ChartLabels, ScatterSeries, StaticChartRenderer};

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Palette has {available} colors but {needed} series need one each")]
    PaletteTooShort { needed: usize, available: usize },
    #[error("Invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
    #[error("Category '{0}' missing from aggregate result")]
    MissingCategory(String),
    #[error("Category '{0}' has no data to chart")]
    NoData(String),
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Failed to encode chart image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to write chart: {0}")]
    Io(#[from] std::io::Error),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChartError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ChartError::Drawing(err.to_string())
    }
}
