//! Static Chart Renderer
//! Draws report charts with plotters and writes them as tightly cropped PNG files.
//!
//! Charts:
//! 1. Category bars: one vertical bar per category, optional log axis
//! 2. Stacked bars: one horizontal bar per row, one segment per series
//! 3. Scatter: loan amount vs jobs retained, with a cross at each category mean

use super::{ChartError, Palette};
use crate::stats::{ByCategory, StackedTable};
use image::{imageops, Rgb, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

const FONT: &str = "sans-serif";
const TITLE_SIZE: u32 = 36;
const DESC_SIZE: u32 = 26;
const TICK_SIZE: u32 = 20;
/// Pixels kept around the drawn content after cropping.
const CROP_PADDING: u32 = 8;
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Title and axis descriptions of a chart.
#[derive(Debug, Clone, Copy)]
pub struct ChartLabels<'a> {
    pub title: &'a str,
    pub x_desc: &'a str,
    pub y_desc: &'a str,
}

/// Points of one category on the scatter chart.
#[derive(Debug, Clone)]
pub struct ScatterSeries {
    pub category: String,
    pub points: Vec<(f64, f64)>,
    pub mean: Option<(f64, f64)>,
}

pub struct StaticChartRenderer {
    palette: Palette,
    size: (u32, u32),
}

impl StaticChartRenderer {
    pub fn new(palette: Palette, width: u32, height: u32) -> Self {
        Self {
            palette,
            size: (width, height),
        }
    }

    /// Unwrap per-category values, failing on the first category without data.
    pub fn require_data(values: &ByCategory<Option<f64>>) -> Result<ByCategory<f64>, ChartError> {
        values
            .iter()
            .map(|(category, value)| {
                value
                    .map(|v| (category.to_string(), v))
                    .ok_or_else(|| ChartError::NoData(category.to_string()))
            })
            .collect()
    }

    /// Values of `categories` in order, failing on a category with no entry.
    fn lookup<'v, T>(categories: &[String], values: &'v ByCategory<T>) -> Result<Vec<&'v T>, ChartError> {
        categories
            .iter()
            .map(|c| {
                values
                    .get(c)
                    .ok_or_else(|| ChartError::MissingCategory(c.clone()))
            })
            .collect()
    }

    /// Vertical bar chart with one bar per category.
    ///
    /// With `log_scale` bar heights are drawn on a log10 axis; values below 1 sit on the baseline.
    pub fn render_category_bars(
        &self,
        path: &Path,
        categories: &[String],
        values: &ByCategory<f64>,
        labels: ChartLabels,
        log_scale: bool,
    ) -> Result<(), ChartError> {
        let heights: Vec<f64> = Self::lookup(categories, values)?
            .into_iter()
            .map(|&v| if log_scale { v.max(1.0).log10() } else { v })
            .collect();
        let colors = self.palette.colors_for(categories.len())?;

        let top = heights.iter().copied().fold(0.0, f64::max);
        let y_max = if top > 0.0 { top * 1.1 } else { 1.0 };
        let n = categories.len() as i32;

        self.render_png(path, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(labels.title, (FONT, TITLE_SIZE))
                .margin(20)
                .x_label_area_size(220)
                .y_label_area_size(130)
                .build_cartesian_2d((0..n).into_segmented(), 0.0..y_max)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_desc(labels.x_desc)
                .y_desc(labels.y_desc)
                .axis_desc_style((FONT, DESC_SIZE))
                .x_labels(categories.len())
                .x_label_style((FONT, TICK_SIZE).into_font().transform(FontTransform::Rotate90))
                .x_label_formatter(&|v| match v {
                    SegmentValue::CenterOf(i) => categories.get(*i as usize).cloned().unwrap_or_default(),
                    _ => String::new(),
                })
                .y_label_style((FONT, TICK_SIZE))
                .y_label_formatter(&|y| {
                    if log_scale {
                        compact_number(10f64.powf(*y))
                    } else {
                        compact_number(*y)
                    }
                })
                .draw()?;

            chart.draw_series(heights.iter().zip(colors).enumerate().map(|(i, (&h, color))| {
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(i as i32), 0.0),
                        (SegmentValue::Exact(i as i32 + 1), h),
                    ],
                    color.filled(),
                );
                bar.set_margin(0, 0, 10, 10);
                bar
            }))?;
            Ok(())
        })
    }

    /// Horizontal stacked bar chart, rows bottom to top in table order.
    pub fn render_stacked_bars(
        &self,
        path: &Path,
        table: &StackedTable,
        labels: ChartLabels,
    ) -> Result<(), ChartError> {
        let colors = self.palette.colors_for(table.series.len())?;
        let max = table.max_total();
        let x_max = if max > 0.0 { max * 1.05 } else { 1.0 };
        let rows = table.rows.len() as i32;

        self.render_png(path, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(labels.title, (FONT, TITLE_SIZE))
                .margin(20)
                .x_label_area_size(70)
                .y_label_area_size(260)
                .build_cartesian_2d(0.0..x_max, (0..rows).into_segmented())?;

            chart
                .configure_mesh()
                .disable_y_mesh()
                .x_desc(labels.x_desc)
                .y_desc(labels.y_desc)
                .axis_desc_style((FONT, DESC_SIZE))
                .x_label_style((FONT, TICK_SIZE))
                .x_label_formatter(&|x| compact_number(*x))
                .y_labels(table.rows.len())
                .y_label_style((FONT, TICK_SIZE))
                .y_label_formatter(&|v| match v {
                    SegmentValue::CenterOf(i) => table.rows.get(*i as usize).cloned().unwrap_or_default(),
                    _ => String::new(),
                })
                .draw()?;

            // Left edge of the next segment in each row.
            let mut offsets = vec![0.0; table.rows.len()];
            for (s, (series, &color)) in table.series.iter().zip(colors).enumerate() {
                let segments: Vec<Rectangle<(f64, SegmentValue<i32>)>> = table
                    .values
                    .iter()
                    .enumerate()
                    .map(|(r, values)| {
                        let start = offsets[r];
                        offsets[r] += values[s];
                        let mut segment = Rectangle::new(
                            [
                                (start, SegmentValue::Exact(r as i32)),
                                (offsets[r], SegmentValue::Exact(r as i32 + 1)),
                            ],
                            color.filled(),
                        );
                        segment.set_margin(6, 6, 0, 0);
                        segment
                    })
                    .collect();

                chart
                    .draw_series(segments)?
                    .label(series.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 7), (x + 16, y + 7)], color.filled()));
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::LowerRight)
                .label_font((FONT, TICK_SIZE))
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK.mix(0.4))
                .draw()?;
            Ok(())
        })
    }

    /// Scatter of (x, y) points per category with a cross at each mean.
    ///
    /// Points above `y_max` are left out, matching a clipped y axis.
    pub fn render_scatter(
        &self,
        path: &Path,
        series: &[ScatterSeries],
        y_max: f64,
        labels: ChartLabels,
    ) -> Result<(), ChartError> {
        let colors = self.palette.colors_for(series.len())?;
        let x_top = series
            .iter()
            .flat_map(|s| s.points.iter().map(|&(x, _)| x))
            .fold(0.0, f64::max);
        let x_max = if x_top > 0.0 { x_top * 1.05 } else { 1.0 };

        self.render_png(path, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(labels.title, (FONT, TITLE_SIZE))
                .margin(20)
                .x_label_area_size(70)
                .y_label_area_size(90)
                .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;

            chart
                .configure_mesh()
                .x_desc(labels.x_desc)
                .y_desc(labels.y_desc)
                .axis_desc_style((FONT, DESC_SIZE))
                .label_style((FONT, TICK_SIZE))
                .x_label_formatter(&|x| compact_number(*x))
                .draw()?;

            for (s, &color) in series.iter().zip(colors) {
                chart
                    .draw_series(
                        s.points
                            .iter()
                            .filter(|&&(_, y)| (0.0..=y_max).contains(&y))
                            .map(|&(x, y)| Circle::new((x, y), 4, color.mix(0.6).filled())),
                    )?
                    .label(s.category.as_str())
                    .legend(move |(x, y)| Circle::new((x + 8, y), 6, color.filled()));
            }
            for (s, &color) in series.iter().zip(colors) {
                if let Some(mean) = s.mean {
                    chart.draw_series(std::iter::once(Cross::new(mean, 14, color.stroke_width(5))))?;
                }
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .label_font((FONT, TICK_SIZE))
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK.mix(0.4))
                .draw()?;
            Ok(())
        })
    }

    /// Draw into an in-memory bitmap, crop to content and save as PNG.
    fn render_png<F>(&self, path: &Path, draw: F) -> Result<(), ChartError>
    where
        F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<(), ChartError>,
    {
        let (width, height) = self.size;
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE)?;
            draw(&root)?;
            root.present()?;
        }

        let image = RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| ChartError::Drawing("bitmap buffer size mismatch".into()))?;
        let cropped = crop_to_content(&image, CROP_PADDING);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        cropped.save(path)?;
        debug!(path = %path.display(), width = cropped.width(), height = cropped.height(), "chart saved");
        Ok(())
    }
}

/// Inclusive bounds `(min_x, min_y, max_x, max_y)` of non-background pixels.
pub fn content_bounds(image: &RgbImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if *pixel == BACKGROUND {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds
}

/// Crop to the content bounding box plus `padding`. Blank images are returned whole.
pub fn crop_to_content(image: &RgbImage, padding: u32) -> RgbImage {
    let Some((x0, y0, x1, y1)) = content_bounds(image) else {
        return image.clone();
    };
    let left = x0.saturating_sub(padding);
    let top = y0.saturating_sub(padding);
    let right = (x1 + padding).min(image.width() - 1);
    let bottom = (y1 + padding).min(image.height() - 1);
    imageops::crop_imm(image, left, top, right - left + 1, bottom - top + 1).to_image()
}

/// Short axis label: 950, 12.5k, 3.2M, 1.1B.
pub fn compact_number(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "k")
    } else {
        (value, "")
    };
    let text = format!("{:.1}", scaled);
    let text = text.strip_suffix(".0").unwrap_or(&text);
    format!("{}{}", text, suffix)
}
