//! Series color palette.

use super::ChartError;
use plotters::style::RGBColor;

/// Ordered series colors, one per category.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<RGBColor>,
}

impl Palette {
    /// Parse `#rrggbb` codes.
    pub fn from_hex<S: AsRef<str>>(codes: &[S]) -> Result<Self, ChartError> {
        let colors = codes
            .iter()
            .map(|c| parse_hex(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { colors })
    }

    /// The first `count` colors. Colors are never reused.
    pub fn colors_for(&self, count: usize) -> Result<&[RGBColor], ChartError> {
        if count > self.colors.len() {
            return Err(ChartError::PaletteTooShort {
                needed: count,
                available: self.colors.len(),
            });
        }
        Ok(&self.colors[..count])
    }
}

fn parse_hex(code: &str) -> Result<RGBColor, ChartError> {
    let invalid = || ChartError::InvalidColor(code.to_string());
    let hex = code.strip_prefix('#').unwrap_or(code);
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}
