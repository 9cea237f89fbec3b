use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};
use crate::render::Color;

/// Visual configuration shared by every report chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    #[serde(default = "default_palette")]
    pub palette: Vec<Color>,
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default = "default_axis_color")]
    pub axis_color: Color,
    #[serde(default = "default_grid_color")]
    pub grid_color: Color,
    #[serde(default = "default_text_color")]
    pub text_color: Color,
    #[serde(default = "default_negative_color")]
    pub negative_color: Color,
    #[serde(default = "default_title_font_size_px")]
    pub title_font_size_px: f64,
    #[serde(default = "default_label_font_size_px")]
    pub label_font_size_px: f64,
    #[serde(default = "default_series_line_width")]
    pub series_line_width: f64,
    #[serde(default = "default_doughnut_hole_ratio")]
    pub doughnut_hole_ratio: f64,
    #[serde(default = "default_padding_px")]
    pub padding_px: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            background: default_background(),
            axis_color: default_axis_color(),
            grid_color: default_grid_color(),
            text_color: default_text_color(),
            negative_color: default_negative_color(),
            title_font_size_px: default_title_font_size_px(),
            label_font_size_px: default_label_font_size_px(),
            series_line_width: default_series_line_width(),
            doughnut_hole_ratio: default_doughnut_hole_ratio(),
            padding_px: default_padding_px(),
        }
    }
}

impl ChartStyle {
    /// Palette entry for series/slice `index`, cycling when exhausted.
    #[must_use]
    pub fn color_at(&self, index: usize) -> Color {
        if self.palette.is_empty() {
            return self.axis_color;
        }
        self.palette[index % self.palette.len()]
    }

    pub fn validate(&self) -> ChartResult<()> {
        for color in self.palette.iter().chain([
            &self.background,
            &self.axis_color,
            &self.grid_color,
            &self.text_color,
            &self.negative_color,
        ]) {
            color.validate()?;
        }
        for (name, value) in [
            ("title_font_size_px", self.title_font_size_px),
            ("label_font_size_px", self.label_font_size_px),
            ("series_line_width", self.series_line_width),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ChartError::Config(format!("{name} must be finite and > 0")));
            }
        }
        if !self.padding_px.is_finite() || self.padding_px < 0.0 {
            return Err(ChartError::Config(
                "padding_px must be finite and >= 0".to_owned(),
            ));
        }
        if !self.doughnut_hole_ratio.is_finite() || !(0.0..1.0).contains(&self.doughnut_hole_ratio)
        {
            return Err(ChartError::Config(
                "doughnut_hole_ratio must be in [0, 1)".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_palette() -> Vec<Color> {
    vec![
        Color::from_hex(0x3b82f6),
        Color::from_hex(0x10b981),
        Color::from_hex(0xf59e0b),
        Color::from_hex(0xef4444),
        Color::from_hex(0x8b5cf6),
        Color::from_hex(0x06b6d4),
        Color::from_hex(0xec4899),
        Color::from_hex(0x84cc16),
    ]
}

fn default_background() -> Color {
    Color::rgb(1.0, 1.0, 1.0)
}

fn default_axis_color() -> Color {
    Color::from_hex(0x6b7280)
}

fn default_grid_color() -> Color {
    Color::from_hex(0xe5e7eb)
}

fn default_text_color() -> Color {
    Color::from_hex(0x111827)
}

fn default_negative_color() -> Color {
    Color::from_hex(0xdc2626)
}

fn default_title_font_size_px() -> f64 {
    16.0
}

fn default_label_font_size_px() -> f64 {
    11.0
}

fn default_series_line_width() -> f64 {
    2.0
}

fn default_doughnut_hole_ratio() -> f64 {
    0.55
}

fn default_padding_px() -> f64 {
    16.0
}
