// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint resolution.
//!
//! Fill and stroke options are CSS-like strings (`"#64b5f6"`, `"red"`, `"#1976d2 2"` for a
//! colored 2px stroke). This module turns them into `peniko` paint.

use alloc::vec::Vec;

use chartwell_core::{OptionValue, Stroke};
use kurbo::{Line, Point, Rect};
use peniko::color::Srgb;
use peniko::{Brush, Color};

/// Parses a CSS color. `"none"` and empty strings yield `None`.
#[must_use]
pub fn parse_color(css: &str) -> Option<Color> {
    let css = css.trim();
    if css.is_empty() || css.eq_ignore_ascii_case("none") {
        return None;
    }
    match peniko::color::parse_color(css) {
        Ok(color) => Some(color.to_alpha_color::<Srgb>()),
        Err(_) => {
            tracing::debug!(color = css, "unparsable color");
            None
        }
    }
}

/// Resolves a fill option, applying `opacity` on top of the color's own alpha.
#[must_use]
pub fn fill(value: Option<&OptionValue>, opacity: f64) -> Option<Brush> {
    let color = parse_color(value?.as_str()?)?;
    Some(Brush::Solid(with_opacity(color, opacity)))
}

/// Resolves a stroke option of the form `"<color> [<width>]"`.
#[must_use]
pub fn stroke(value: Option<&OptionValue>, default_width: f64) -> Option<Stroke> {
    let spec = value?.as_str()?.trim();
    let (color, width) = match spec.rsplit_once(' ') {
        Some((color, width)) => match width.parse::<f64>() {
            Ok(w) => (color, w),
            Err(_) => (spec, default_width),
        },
        None => (spec, default_width),
    };
    if width <= 0.0 {
        return None;
    }
    Some(Stroke::new(parse_color(color)?, width))
}

/// Multiplies the alpha of `color` by `opacity`, clamped to `[0, 1]`.
#[must_use]
pub fn with_opacity(color: Color, opacity: f64) -> Color {
    if opacity >= 1.0 {
        return color;
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "opacity is clamped to [0, 1], well within f32 precision for paint"
    )]
    let opacity = opacity.clamp(0.0, 1.0) as f32;
    color.multiply_alpha(opacity)
}

/// Line patterns drawn over a filled shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HatchFill {
    /// `\` lines.
    BackwardDiagonal,
    /// `/` lines.
    ForwardDiagonal,
    /// `-` lines.
    Horizontal,
    /// `|` lines.
    Vertical,
    /// Horizontal and vertical lines.
    Cross,
    /// Both diagonals.
    DiagonalCross,
}

impl HatchFill {
    /// Parses a hatch type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "backwardDiagonal" => Some(Self::BackwardDiagonal),
            "forwardDiagonal" => Some(Self::ForwardDiagonal),
            "horizontal" => Some(Self::Horizontal),
            "vertical" => Some(Self::Vertical),
            "cross" => Some(Self::Cross),
            "diagonalCross" => Some(Self::DiagonalCross),
            _ => None,
        }
    }

    /// Resolves a `hatchFill` option. `true` picks the default pattern, `false` and `"none"`
    /// disable hatching.
    #[must_use]
    pub fn from_option(value: Option<&OptionValue>) -> Option<Self> {
        match value? {
            OptionValue::Bool(true) => Some(Self::BackwardDiagonal),
            OptionValue::Str(name) => Self::from_name(name),
            _ => None,
        }
    }

    /// Returns line segments covering `rect` every `spacing` pixels.
    ///
    /// Diagonal segments overshoot the rectangle; callers clip the hatch node to `rect`.
    #[must_use]
    pub fn segments(self, rect: Rect, spacing: f64) -> Vec<Line> {
        let mut out = Vec::new();
        if spacing <= 0.0 || rect.is_zero_area() {
            return out;
        }
        match self {
            Self::BackwardDiagonal => diagonals(rect, spacing, false, &mut out),
            Self::ForwardDiagonal => diagonals(rect, spacing, true, &mut out),
            Self::Horizontal => horizontals(rect, spacing, &mut out),
            Self::Vertical => verticals(rect, spacing, &mut out),
            Self::Cross => {
                horizontals(rect, spacing, &mut out);
                verticals(rect, spacing, &mut out);
            }
            Self::DiagonalCross => {
                diagonals(rect, spacing, false, &mut out);
                diagonals(rect, spacing, true, &mut out);
            }
        }
        out
    }
}

fn diagonals(rect: Rect, spacing: f64, forward: bool, out: &mut Vec<Line>) {
    let h = rect.height();
    let span = rect.width() + h;
    let mut offset = spacing;
    while offset < span {
        let x = rect.x0 + offset;
        out.push(if forward {
            Line::new(Point::new(x - h, rect.y1), Point::new(x, rect.y0))
        } else {
            Line::new(Point::new(x - h, rect.y0), Point::new(x, rect.y1))
        });
        offset += spacing;
    }
}

fn horizontals(rect: Rect, spacing: f64, out: &mut Vec<Line>) {
    let mut y = rect.y0 + spacing;
    while y < rect.y1 {
        out.push(Line::new(Point::new(rect.x0, y), Point::new(rect.x1, y)));
        y += spacing;
    }
}

fn verticals(rect: Rect, spacing: f64, out: &mut Vec<Line>) {
    let mut x = rect.x0 + spacing;
    while x < rect.x1 {
        out.push(Line::new(Point::new(x, rect.y0), Point::new(x, rect.y1)));
        x += spacing;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use peniko::color::palette::css;

    use super::*;

    #[test]
    fn colors_parse_and_none_disables() {
        assert_eq!(parse_color("red"), Some(css::RED));
        assert_eq!(parse_color("none"), None);
        assert_eq!(parse_color("not a color"), None);
        assert_eq!(
            fill(Some(&OptionValue::from("red")), 1.0),
            Some(Brush::Solid(css::RED))
        );
        assert_eq!(fill(Some(&OptionValue::Bool(false)), 1.0), None);
    }

    #[test]
    fn stroke_reads_optional_width() {
        let s = stroke(Some(&"red 2".into()), 1.0).unwrap();
        assert_eq!(s.width, 2.0);
        assert_eq!(s.brush, Brush::Solid(css::RED));
        let s = stroke(Some(&"red".into()), 1.5).unwrap();
        assert_eq!(s.width, 1.5);
        assert!(stroke(Some(&"red 0".into()), 1.0).is_none());
    }

    #[test]
    fn hatch_segments_cover_the_rect() {
        let rect = Rect::new(0.0, 0.0, 20.0, 10.0);
        assert_eq!(HatchFill::Horizontal.segments(rect, 4.0).len(), 2);
        assert_eq!(HatchFill::Vertical.segments(rect, 4.0).len(), 4);
        assert_eq!(HatchFill::BackwardDiagonal.segments(rect, 10.0).len(), 2);
        assert!(HatchFill::Cross.segments(rect, 0.0).is_empty());
        assert_eq!(
            HatchFill::from_option(Some(&OptionValue::Bool(true))),
            Some(HatchFill::BackwardDiagonal)
        );
        assert_eq!(HatchFill::from_option(Some(&"none".into())), None);
    }
}
