// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text styling and measurement for Chartwell.
//!
//! Chart text (titles, labels, tooltips) is laid out downstream by a real text engine. Elements
//! only need enough information to compute their bounds, so they depend on the small
//! [`TextMeasurer`] trait and the style enums in this crate.
//!
//! Setting names mirror the CSS-like option keys chart configurations use (`hAlign`,
//! `textOverflow`, ...); every enum converts from and to those names.

#![no_std]

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// Measures single lines of text.
///
/// Implementations can be heuristic ([`HeuristicTextMeasurer`]) or backed by a shaping engine.
pub trait TextMeasurer {
    /// Measures `text` as one line.
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;
}

/// Style inputs that affect measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels.
    pub font_size: f64,
    /// Font family.
    pub font_family: FontFamily,
    /// Font weight.
    pub font_weight: FontWeight,
    /// Font style.
    pub font_style: FontStyle,
    /// Extra spacing added after every character, in pixels.
    pub letter_spacing: f64,
    /// Line height as a multiple of the font size. `None` uses the measured metrics.
    pub line_height: Option<f64>,
}

impl TextStyle {
    /// Creates a style with the given size and defaults for everything else.
    #[must_use]
    pub fn new(font_size: f64) -> Self {
        Self {
            font_size,
            font_family: FontFamily::SansSerif,
            font_weight: FontWeight::NORMAL,
            font_style: FontStyle::Normal,
            letter_spacing: 0.0,
            line_height: None,
        }
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new(13.0)
    }
}

/// Font family selection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FontFamily {
    /// CSS `serif`.
    Serif,
    /// CSS `sans-serif`.
    SansSerif,
    /// CSS `monospace`.
    Monospace,
    /// A named family list such as `"Verdana, Helvetica"`.
    Named(Arc<str>),
}

impl FontFamily {
    /// Parses a CSS family string.
    #[must_use]
    pub fn from_css(family: &str) -> Self {
        match family.trim() {
            "serif" => Self::Serif,
            "sans-serif" => Self::SansSerif,
            "monospace" => Self::Monospace,
            other => Self::Named(other.into()),
        }
    }

    /// Returns the CSS family string.
    #[must_use]
    pub fn as_css_family(&self) -> &str {
        match self {
            Self::Serif => "serif",
            Self::SansSerif => "sans-serif",
            Self::Monospace => "monospace",
            Self::Named(name) => name,
        }
    }
}

/// CSS-style font weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontWeight(pub u16);

impl FontWeight {
    /// `400`.
    pub const NORMAL: Self = Self(400);
    /// `700`.
    pub const BOLD: Self = Self(700);

    /// Parses `normal`, `bold`, `bolder`, `lighter` or a numeric weight.
    #[must_use]
    pub fn from_css(weight: &str) -> Option<Self> {
        match weight.trim() {
            "normal" => Some(Self::NORMAL),
            "bold" => Some(Self::BOLD),
            "bolder" => Some(Self(900)),
            "lighter" => Some(Self(100)),
            n => n.parse().ok().map(Self),
        }
    }
}

macro_rules! css_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $css:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Parses the option name. Returns `None` for unknown names.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name.trim() {
                    $($css => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Returns the option name.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $css,)+
                }
            }
        }
    };
}

css_enum!(
    /// CSS-style font style.
    FontStyle {
        #[default]
        /// Upright.
        Normal => "normal",
        /// Italic.
        Italic => "italic",
        /// Oblique.
        Oblique => "oblique",
    }
);

css_enum!(
    /// Text decoration.
    FontDecoration {
        #[default]
        /// None.
        None => "none",
        /// Line below the text.
        Underline => "underline",
        /// Line above the text.
        Overline => "overline",
        /// Line through the text.
        LineThrough => "line-through",
        /// Blinking text.
        Blink => "blink",
    }
);

css_enum!(
    /// Font variant.
    FontVariant {
        #[default]
        /// Normal glyphs.
        Normal => "normal",
        /// Small capitals.
        SmallCaps => "small-caps",
    }
);

css_enum!(
    /// Horizontal alignment inside the text bounds.
    HAlign {
        #[default]
        /// Start edge for the text direction.
        Start => "start",
        /// Left edge.
        Left => "left",
        /// Centered.
        Center => "center",
        /// Right edge.
        Right => "right",
        /// End edge for the text direction.
        End => "end",
    }
);

css_enum!(
    /// Vertical alignment inside the text bounds.
    VAlign {
        #[default]
        /// Top edge.
        Top => "top",
        /// Centered.
        Middle => "middle",
        /// Bottom edge.
        Bottom => "bottom",
    }
);

css_enum!(
    /// Wrapping policy when a width is set.
    TextWrap {
        #[default]
        /// Break between words.
        ByWord => "byWord",
        /// Break between characters.
        ByLetter => "byLetter",
        /// Never wrap.
        NoWrap => "noWrap",
    }
);

css_enum!(
    /// What to show when text does not fit.
    TextOverflow {
        #[default]
        /// Cut the text.
        Clip => "",
        /// Cut and append an ellipsis.
        Ellipsis => "...",
    }
);

css_enum!(
    /// Writing direction.
    TextDirection {
        #[default]
        /// Left to right.
        Ltr => "ltr",
        /// Right to left.
        Rtl => "rtl",
    }
);

impl HAlign {
    /// Returns the horizontal offset ratio (0 = left, 0.5 = center, 1 = right) for `direction`.
    #[must_use]
    pub fn ratio(self, direction: TextDirection) -> f64 {
        match (self, direction) {
            (Self::Left, _)
            | (Self::Start, TextDirection::Ltr)
            | (Self::End, TextDirection::Rtl) => 0.0,
            (Self::Center, _) => 0.5,
            _ => 1.0,
        }
    }
}

impl VAlign {
    /// Returns the vertical offset ratio (0 = top, 0.5 = middle, 1 = bottom).
    #[must_use]
    pub fn ratio(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Middle => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

/// Metrics of one measured line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextMetrics {
    /// Advance width.
    pub advance_width: f64,
    /// Baseline to top of typical glyphs.
    pub ascent: f64,
    /// Baseline to bottom of typical glyphs.
    pub descent: f64,
    /// Extra spacing between lines.
    pub leading: f64,
}

impl TextMetrics {
    /// `ascent + descent + leading`.
    #[must_use]
    pub fn line_height(&self) -> f64 {
        self.ascent + self.descent + self.leading
    }
}

/// A laid-out block of lines.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextBlock {
    /// Lines after explicit breaks and wrapping.
    pub lines: Vec<String>,
    /// Width of the widest line.
    pub width: f64,
    /// Total height.
    pub height: f64,
}

/// Splits `text` into lines and measures the block.
///
/// Lines break at `\n`. With a `max_width`, lines are wrapped according to `wrap`; a single word
/// wider than `max_width` stays on its own line under [`TextWrap::ByWord`].
pub fn layout_block(
    measurer: &dyn TextMeasurer,
    text: &str,
    style: &TextStyle,
    max_width: Option<f64>,
    wrap: TextWrap,
) -> TextBlock {
    let width_of = |s: &str| measure_line(measurer, s, style).advance_width;
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        match (max_width, wrap) {
            (Some(max), TextWrap::ByWord) => wrap_words(paragraph, max, &width_of, &mut lines),
            (Some(max), TextWrap::ByLetter) => wrap_letters(paragraph, max, &width_of, &mut lines),
            _ => lines.push(String::from(paragraph)),
        }
    }

    let line_height = style
        .line_height
        .map(|m| m * style.font_size)
        .unwrap_or_else(|| measurer.measure("", style).line_height());
    let width = lines
        .iter()
        .map(|l| width_of(l.as_str()))
        .fold(0.0, f64::max);
    TextBlock {
        height: line_height * lines.len() as f64,
        width,
        lines,
    }
}

fn measure_line(measurer: &dyn TextMeasurer, text: &str, style: &TextStyle) -> TextMetrics {
    let mut m = measurer.measure(text, style);
    m.advance_width += style.letter_spacing * text.chars().count() as f64;
    m
}

fn wrap_words(paragraph: &str, max: f64, width_of: &dyn Fn(&str) -> f64, out: &mut Vec<String>) {
    let mut line = String::new();
    for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate_width = width_of(&line) + width_of(" ") + width_of(word);
        if candidate_width > max {
            out.push(core::mem::take(&mut line));
            line.push_str(word);
        } else {
            line.push(' ');
            line.push_str(word);
        }
    }
    out.push(line);
}

fn wrap_letters(paragraph: &str, max: f64, width_of: &dyn Fn(&str) -> f64, out: &mut Vec<String>) {
    let mut line = String::new();
    for ch in paragraph.chars() {
        let mut candidate = line.clone();
        candidate.push(ch);
        if !line.is_empty() && width_of(&candidate) > max {
            out.push(core::mem::take(&mut line));
            line.push(ch);
        } else {
            line = candidate;
        }
    }
    out.push(line);
}

/// A heuristic measurer: glyphs are ~0.6em wide, the baseline sits at ~0.8em.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let weight_factor = if style.font_weight >= FontWeight::BOLD {
            1.1
        } else {
            1.0
        };
        TextMetrics {
            advance_width: 0.6 * weight_factor * style.font_size * text.chars().count() as f64,
            ascent: 0.8 * style.font_size,
            descent: 0.2 * style.font_size,
            leading: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn names_round_trip() {
        assert_eq!(HAlign::from_name("center"), Some(HAlign::Center));
        assert_eq!(TextWrap::from_name("byLetter").map(TextWrap::as_str), Some("byLetter"));
        assert_eq!(TextOverflow::from_name("..."), Some(TextOverflow::Ellipsis));
        assert_eq!(VAlign::from_name("sideways"), None);
        assert_eq!(FontWeight::from_css("bold"), Some(FontWeight::BOLD));
        assert_eq!(FontWeight::from_css("600"), Some(FontWeight(600)));
    }

    #[test]
    fn alignment_ratios_follow_direction() {
        assert_eq!(HAlign::Start.ratio(TextDirection::Ltr), 0.0);
        assert_eq!(HAlign::Start.ratio(TextDirection::Rtl), 1.0);
        assert_eq!(HAlign::Center.ratio(TextDirection::Rtl), 0.5);
        assert_eq!(VAlign::Bottom.ratio(), 1.0);
    }

    #[test]
    fn block_splits_explicit_breaks() {
        let style = TextStyle::new(10.0);
        let block = layout_block(&HeuristicTextMeasurer, "ab\nabcd", &style, None, TextWrap::ByWord);
        assert_eq!(block.lines, ["ab", "abcd"]);
        assert_eq!(block.width, 24.0);
        assert_eq!(block.height, 20.0);
    }

    #[test]
    fn words_wrap_at_max_width() {
        let style = TextStyle::new(10.0);
        // Each glyph is 6px wide.
        let block = layout_block(
            &HeuristicTextMeasurer,
            "aa bb cc",
            &style,
            Some(31.0),
            TextWrap::ByWord,
        );
        assert_eq!(block.lines, ["aa bb", "cc"]);
    }

    #[test]
    fn letters_wrap_at_max_width() {
        let style = TextStyle::new(10.0);
        let block = layout_block(
            &HeuristicTextMeasurer,
            "abcde",
            &style,
            Some(13.0),
            TextWrap::ByLetter,
        );
        assert_eq!(block.lines, ["ab", "cd", "e"]);
    }

    #[test]
    fn letter_spacing_widens_lines() {
        let mut style = TextStyle::new(10.0);
        style.letter_spacing = 1.0;
        let block = layout_block(&HeuristicTextMeasurer, "abc", &style, None, TextWrap::NoWrap);
        assert_eq!(block.width, 21.0);
    }
}
