// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable default configuration.
//!
//! A [`Theme`] is built once (usually via [`Default`]), wrapped in an `Rc` and handed to every
//! entity constructor. Entities read their theme defaults from it; instance settings override
//! them. Nothing mutates a theme after construction.

use alloc::string::String;
use alloc::vec::Vec;
use alloc::vec;

/// Defaults for waterfall totals.
#[derive(Clone, Debug, PartialEq)]
pub struct TotalTheme {
    /// Bar width as a number of pixels or a percent string of the category width.
    pub width: String,
    /// Normal fill.
    pub fill: String,
    /// Normal stroke.
    pub stroke: String,
    /// Hovered fill.
    pub hovered_fill: String,
    /// Hovered stroke.
    pub hovered_stroke: String,
    /// Legend text.
    pub legend_text: String,
    /// Z-index of the totals layer.
    pub z_index: i32,
}

/// Defaults for series.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesTheme {
    /// Fill colors assigned to series in creation order.
    pub palette: Vec<String>,
    /// Stroke width.
    pub stroke_width: f64,
    /// Marker size in pixels.
    pub marker_size: f64,
    /// Bubble radius range in pixels.
    pub bubble_size: (f64, f64),
    /// Error bar whisker width in pixels.
    pub error_width: f64,
    /// Error bar stroke color.
    pub error_stroke: String,
    /// Hovered series fill.
    pub hovered_fill: String,
    /// Selected series fill.
    pub selected_fill: String,
}

/// Defaults for circle-packing charts.
#[derive(Clone, Debug, PartialEq)]
pub struct CirclePackingTheme {
    /// Node fill.
    pub fill: String,
    /// Node stroke.
    pub stroke: String,
    /// Hovered node fill.
    pub hovered_fill: String,
    /// Selected node fill.
    pub selected_fill: String,
    /// Depth of fully drawn levels.
    pub max_depth: f64,
    /// Extra levels drawn as hints.
    pub hint_depth: f64,
    /// Opacity of hint levels.
    pub hint_opacity: f64,
    /// Header display mode.
    pub headers_display_mode: String,
    /// Label display mode.
    pub labels_display_mode: String,
}

/// Defaults for text elements.
#[derive(Clone, Debug, PartialEq)]
pub struct TextTheme {
    /// Font size in pixels.
    pub font_size: f64,
    /// Font family.
    pub font_family: String,
    /// Font color.
    pub font_color: String,
    /// Font opacity.
    pub font_opacity: f64,
    /// Horizontal alignment.
    pub h_align: String,
    /// Vertical alignment.
    pub v_align: String,
}

/// Defaults for labels.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelTheme {
    /// Whether labels draw by default.
    pub enabled: bool,
    /// Format template with `{%token}` placeholders.
    pub format: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Font color.
    pub font_color: String,
}

/// The library default configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    /// Waterfall totals.
    pub totals: TotalTheme,
    /// Series.
    pub series: SeriesTheme,
    /// Circle packing.
    pub circle_packing: CirclePackingTheme,
    /// Text elements.
    pub text: TextTheme,
    /// Labels.
    pub labels: LabelTheme,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            totals: TotalTheme {
                width: "90%".into(),
                fill: "#64b5f6".into(),
                stroke: "#1976d2".into(),
                hovered_fill: "#90caf9".into(),
                hovered_stroke: "#1565c0".into(),
                legend_text: "Total".into(),
                z_index: 40,
            },
            series: SeriesTheme {
                palette: vec![
                    "#64b5f6".into(),
                    "#1976d2".into(),
                    "#ef6c00".into(),
                    "#ffd54f".into(),
                    "#455a64".into(),
                    "#96a6a6".into(),
                ],
                stroke_width: 1.0,
                marker_size: 6.0,
                bubble_size: (5.0, 20.0),
                error_width: 10.0,
                error_stroke: "#212121".into(),
                hovered_fill: "#90caf9".into(),
                selected_fill: "#333333".into(),
            },
            circle_packing: CirclePackingTheme {
                fill: "#64b5f6".into(),
                stroke: "#ffffff".into(),
                hovered_fill: "#90caf9".into(),
                selected_fill: "#333333".into(),
                max_depth: 3.0,
                hint_depth: 0.0,
                hint_opacity: 0.4,
                headers_display_mode: "alwaysShow".into(),
                labels_display_mode: "clip".into(),
            },
            text: TextTheme {
                font_size: 13.0,
                font_family: "Verdana, Helvetica, Arial, sans-serif".into(),
                font_color: "#7c868e".into(),
                font_opacity: 1.0,
                h_align: "start".into(),
                v_align: "top".into(),
            },
            labels: LabelTheme {
                enabled: true,
                format: "{%value}".into(),
                font_size: 11.0,
                font_color: "#212121".into(),
            },
        }
    }
}

impl SeriesTheme {
    /// Returns the palette color for the series at `index`, cycling.
    #[must_use]
    pub fn palette_color(&self, index: usize) -> &str {
        if self.palette.is_empty() {
            return "#000000";
        }
        &self.palette[index % self.palette.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cycles() {
        let theme = Theme::default();
        let n = theme.series.palette.len();
        assert_eq!(
            theme.series.palette_color(0),
            theme.series.palette_color(n)
        );
    }
}
