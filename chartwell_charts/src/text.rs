// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Standalone text element (chart titles and free-floating captions).
//!
//! Settings that change the text extent dirty `BOUNDS | APPEARANCE` and signal
//! `BOUNDS_CHANGED`; paint-only settings (`fontColor`, `fontOpacity`, `selectable`,
//! `hoverable`) dirty `APPEARANCE` alone.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use chartwell_core::{
    ConfigError, ConsistencyState, DescriptorsMeta, DrawCheck, DrawError, DrawScheduler,
    ElementCore, OptionValue, PropertyMeta, Settings, Signal, Surface, TOTAL_PHASES, TextRun,
    Theme, VisualElement,
};
use chartwell_text::{
    FontDecoration, FontFamily, FontStyle, FontVariant, FontWeight, HAlign, HeuristicTextMeasurer,
    TextBlock, TextDirection, TextMeasurer, TextOverflow, TextStyle, TextWrap, VAlign,
    layout_block,
};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

use crate::config::{self, apply_option};
use crate::layer::{NodePool, RootLayer};
use crate::paint;
use crate::z_order;

const EXTENT: PropertyMeta = PropertyMeta::new(
    ConsistencyState::APPEARANCE.union(ConsistencyState::BOUNDS),
    Signal::NEEDS_REDRAW.union(Signal::BOUNDS_CHANGED),
);
const PAINT: PropertyMeta = PropertyMeta::new(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW);

const TEXT_META: DescriptorsMeta = DescriptorsMeta::new(&[
    ("text", EXTENT),
    ("fontSize", EXTENT),
    ("fontFamily", EXTENT),
    ("fontColor", PAINT),
    ("fontOpacity", PAINT),
    ("fontDecoration", EXTENT),
    ("fontStyle", EXTENT),
    ("fontVariant", EXTENT),
    ("fontWeight", EXTENT),
    ("letterSpacing", EXTENT),
    ("textDirection", EXTENT),
    ("lineHeight", EXTENT),
    ("textIndent", EXTENT),
    ("vAlign", EXTENT),
    ("hAlign", EXTENT),
    ("textWrap", EXTENT),
    ("textOverflow", EXTENT),
    ("selectable", PAINT),
    ("hoverable", PAINT),
    ("useHtml", EXTENT),
]);

macro_rules! text_config {
    ($($field:ident => $name:literal,)+) => {
        /// Serialized [`Text`]. Keys are the option names.
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct TextConfig {
            $(
                #[doc = concat!("`", $name, "`.")]
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<OptionValue>,
            )+
        }

        impl TextConfig {
            fn capture(settings: &Settings) -> Self {
                Self {
                    $($field: settings.get_own_option($name),)+
                }
            }

            fn apply(&self, settings: &Settings) {
                $(apply_option(|n, v| settings.set_option(n, v), $name, self.$field.as_ref());)+
            }
        }
    };
}

text_config!(
    text => "text",
    font_size => "fontSize",
    font_family => "fontFamily",
    font_color => "fontColor",
    font_opacity => "fontOpacity",
    font_decoration => "fontDecoration",
    font_style => "fontStyle",
    font_variant => "fontVariant",
    font_weight => "fontWeight",
    letter_spacing => "letterSpacing",
    text_direction => "textDirection",
    line_height => "lineHeight",
    text_indent => "textIndent",
    v_align => "vAlign",
    h_align => "hAlign",
    text_wrap => "textWrap",
    text_overflow => "textOverflow",
    selectable => "selectable",
    hoverable => "hoverable",
    use_html => "useHtml",
);

/// A text element.
pub struct Text {
    core: Rc<ElementCore>,
    settings: Settings,
    measurer: RefCell<Rc<dyn TextMeasurer>>,
    layer: RootLayer,
    lines: NodePool,
    block: RefCell<TextBlock>,
    measured: Cell<Option<Rect>>,
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Text")
            .field("core", &self.core)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Text {
    /// Creates an empty text element with the theme's text defaults.
    #[must_use]
    pub fn new(theme: &Theme) -> Rc<Self> {
        let core = ElementCore::new(ConsistencyState::VISUAL_BASE, Signal::VISUAL_BASE);
        core.set_z_index(z_order::TITLES);
        let t = &theme.text;
        let settings = Settings::new(&core, TEXT_META)
            .with_theme_option("text", "")
            .with_theme_option("fontSize", t.font_size)
            .with_theme_option("fontFamily", t.font_family.as_str())
            .with_theme_option("fontColor", t.font_color.as_str())
            .with_theme_option("fontOpacity", t.font_opacity)
            .with_theme_option("fontDecoration", FontDecoration::None.as_str())
            .with_theme_option("fontStyle", FontStyle::Normal.as_str())
            .with_theme_option("fontVariant", FontVariant::Normal.as_str())
            .with_theme_option("fontWeight", f64::from(FontWeight::NORMAL.0))
            .with_theme_option("letterSpacing", 0.0)
            .with_theme_option("textDirection", TextDirection::Ltr.as_str())
            .with_theme_option("lineHeight", "normal")
            .with_theme_option("textIndent", 0.0)
            .with_theme_option("vAlign", t.v_align.as_str())
            .with_theme_option("hAlign", t.h_align.as_str())
            .with_theme_option("textWrap", TextWrap::ByLetter.as_str())
            .with_theme_option("textOverflow", TextOverflow::Clip.as_str())
            .with_theme_option("selectable", false)
            .with_theme_option("hoverable", false)
            .with_theme_option("useHtml", false);
        Rc::new(Self {
            core,
            settings,
            measurer: RefCell::new(Rc::new(HeuristicTextMeasurer)),
            layer: RootLayer::default(),
            lines: NodePool::default(),
            block: RefCell::new(TextBlock::default()),
            measured: Cell::new(None),
        })
    }

    /// Replaces the measurer.
    pub fn set_measurer(&self, measurer: Rc<dyn TextMeasurer>) {
        *self.measurer.borrow_mut() = measurer;
        self.core.invalidate(EXTENT.state, EXTENT.signal);
    }

    /// See [`Settings::set_option`].
    pub fn set_option(&self, name: &str, value: impl Into<OptionValue>) -> bool {
        self.settings.set_option(name, value)
    }

    /// See [`Settings::get_option`].
    #[must_use]
    pub fn get_option(&self, name: &str) -> Option<OptionValue> {
        self.settings.get_option(name)
    }

    /// Returns the content.
    #[must_use]
    pub fn text(&self) -> String {
        self.str_option("text")
    }

    /// Sets the content.
    pub fn set_text(&self, text: &str) {
        self.set_option("text", text);
    }

    /// Sets the font size in pixels.
    pub fn set_font_size(&self, size: f64) {
        self.set_option("fontSize", size);
    }

    /// Sets the CSS font family.
    pub fn set_font_family(&self, family: &str) {
        self.set_option("fontFamily", family);
    }

    /// Sets the font color.
    pub fn set_font_color(&self, color: &str) {
        self.set_option("fontColor", color);
    }

    /// Sets the font opacity.
    pub fn set_font_opacity(&self, opacity: f64) {
        self.set_option("fontOpacity", opacity);
    }

    /// Sets the decoration.
    pub fn set_font_decoration(&self, decoration: FontDecoration) {
        self.set_option("fontDecoration", decoration.as_str());
    }

    /// Sets the font style.
    pub fn set_font_style(&self, style: FontStyle) {
        self.set_option("fontStyle", style.as_str());
    }

    /// Sets the font variant.
    pub fn set_font_variant(&self, variant: FontVariant) {
        self.set_option("fontVariant", variant.as_str());
    }

    /// Sets the font weight.
    pub fn set_font_weight(&self, weight: FontWeight) {
        self.set_option("fontWeight", f64::from(weight.0));
    }

    /// Sets extra spacing after every character.
    pub fn set_letter_spacing(&self, spacing: f64) {
        self.set_option("letterSpacing", spacing);
    }

    /// Sets the writing direction.
    pub fn set_text_direction(&self, direction: TextDirection) {
        self.set_option("textDirection", direction.as_str());
    }

    /// Sets the line height as a multiple of the font size; `None` restores `normal`.
    pub fn set_line_height(&self, line_height: Option<f64>) {
        match line_height {
            Some(m) => self.set_option("lineHeight", m),
            None => self.set_option("lineHeight", "normal"),
        };
    }

    /// Sets the first-line indent in pixels.
    pub fn set_text_indent(&self, indent: f64) {
        self.set_option("textIndent", indent);
    }

    /// Sets the vertical alignment.
    pub fn set_v_align(&self, align: VAlign) {
        self.set_option("vAlign", align.as_str());
    }

    /// Sets the horizontal alignment.
    pub fn set_h_align(&self, align: HAlign) {
        self.set_option("hAlign", align.as_str());
    }

    /// Sets the wrapping policy.
    pub fn set_text_wrap(&self, wrap: TextWrap) {
        self.set_option("textWrap", wrap.as_str());
    }

    /// Sets the overflow policy.
    pub fn set_text_overflow(&self, overflow: TextOverflow) {
        self.set_option("textOverflow", overflow.as_str());
    }

    /// Sets whether the text can be selected.
    pub fn set_selectable(&self, selectable: bool) {
        self.set_option("selectable", selectable);
    }

    /// Sets whether the text reacts to the pointer.
    pub fn set_hoverable(&self, hoverable: bool) {
        self.set_option("hoverable", hoverable);
    }

    /// Sets whether the content is HTML.
    pub fn set_use_html(&self, use_html: bool) {
        self.set_option("useHtml", use_html);
    }

    /// Returns the measurement style of the current settings.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "weights are range-checked above"
    )]
    pub fn style(&self) -> TextStyle {
        let font_size = self.num_option("fontSize", 13.0);
        TextStyle {
            font_size,
            font_family: FontFamily::from_css(&self.str_option("fontFamily")),
            font_weight: self
                .get_option("fontWeight")
                .and_then(|v| match v {
                    OptionValue::Number(n) if (1.0..=1000.0).contains(&n) => Some(FontWeight(n as u16)),
                    OptionValue::Str(s) => FontWeight::from_css(&s),
                    _ => None,
                })
                .unwrap_or(FontWeight::NORMAL),
            font_style: FontStyle::from_name(&self.str_option("fontStyle")).unwrap_or_default(),
            letter_spacing: self.num_option("letterSpacing", 0.0),
            line_height: self.get_option("lineHeight").and_then(|v| v.as_f64()),
        }
    }

    /// Returns the horizontal alignment.
    #[must_use]
    pub fn h_align(&self) -> HAlign {
        HAlign::from_name(&self.str_option("hAlign")).unwrap_or_default()
    }

    /// Returns the vertical alignment.
    #[must_use]
    pub fn v_align(&self) -> VAlign {
        VAlign::from_name(&self.str_option("vAlign")).unwrap_or_default()
    }

    /// Returns the area computed by the last bounds repair.
    #[must_use]
    pub fn measured_bounds(&self) -> Option<Rect> {
        self.measured.get()
    }

    /// Returns the laid-out lines of the last bounds repair.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.block.borrow().lines.clone()
    }

    /// Captures the explicitly set options.
    #[must_use]
    pub fn serialize(&self) -> TextConfig {
        TextConfig::capture(&self.settings)
    }

    /// Applies the present keys, dispatching at most one signal.
    pub fn setup_by_json(&self, config: &TextConfig) {
        self.core.suspend_signals_dispatching();
        config.apply(&self.settings);
        self.core.resume_signals_dispatching(true);
    }

    /// Applies a JSON object.
    pub fn setup_by_json_value(&self, value: &serde_json::Value) -> Result<(), ConfigError> {
        self.setup_by_json(&config::from_json(value)?);
        Ok(())
    }

    /// Returns the serialized options as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, ConfigError> {
        config::to_json(&self.serialize())
    }

    fn str_option(&self, name: &str) -> String {
        self.get_option(name)
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default()
    }

    fn num_option(&self, name: &str, default: f64) -> f64 {
        self.get_option(name)
            .and_then(|v| v.as_f64())
            .unwrap_or(default)
    }

    fn repair_bounds(&self) {
        let style = self.style();
        let explicit = self.core.bounds();
        let wrap = TextWrap::from_name(&self.str_option("textWrap")).unwrap_or_default();
        let block = layout_block(
            &**self.measurer.borrow(),
            &self.text(),
            &style,
            explicit.map(|b| b.width()),
            wrap,
        );
        let area = match explicit {
            Some(b) => b,
            None => {
                let origin = self.core.parent_bounds().map_or(Point::ZERO, |b| b.origin());
                Rect::from_origin_size(origin, Size::new(block.width, block.height))
            }
        };
        *self.block.borrow_mut() = block;
        self.measured.set(Some(area));
        // Line placement depends on the new area.
        self.core.invalidate(ConsistencyState::APPEARANCE, Signal::NONE);
    }

    fn repair_appearance(&self, surface: &mut dyn Surface) {
        self.lines.clear(surface);
        let (Some(layer), Some(area)) = (self.layer.get(), self.measured.get()) else {
            return;
        };
        let style = self.style();
        let measurer = self.measurer.borrow();
        let block = self.block.borrow();
        let direction = TextDirection::from_name(&self.str_option("textDirection")).unwrap_or_default();
        let h_ratio = self.h_align().ratio(direction);
        let line_height = if block.lines.is_empty() {
            0.0
        } else {
            block.height / block.lines.len() as f64
        };
        let top = area.y0 + self.v_align().ratio() * (area.height() - block.height);
        let indent = self.num_option("textIndent", 0.0);
        let overflow = TextOverflow::from_name(&self.str_option("textOverflow")).unwrap_or_default();
        let fill = paint::fill(
            self.get_option("fontColor").as_ref(),
            self.num_option("fontOpacity", 1.0),
        );
        let clipped = self.core.bounds().is_some();
        let family = String::from(style.font_family.as_css_family());

        for (i, line) in block.lines.iter().enumerate() {
            let y = top + line_height * i as f64;
            if clipped && y + line_height > area.y1 + 1e-9 {
                break;
            }
            let first_indent = if i == 0 { indent } else { 0.0 };
            let available = area.width() - first_indent;
            let content = if clipped {
                fit_line(&**measurer, line, &style, available, overflow)
            } else {
                line.clone()
            };
            let width = measurer.measure(&content, &style).advance_width
                + style.letter_spacing * content.chars().count() as f64;
            let x = area.x0 + first_indent + h_ratio * (available - width);
            let node = self.lines.text(surface, layer);
            surface.set_text(
                node,
                TextRun {
                    content,
                    origin: Point::new(x, y),
                    size: Size::new(width, line_height),
                    font_size: style.font_size,
                    font_family: family.clone(),
                },
            );
            surface.set_fill(node, fill.clone());
        }
        surface.set_clip(layer, clipped.then_some(area));
    }
}

/// Cuts `line` to `max` pixels, appending the overflow marker when something was cut.
fn fit_line(
    measurer: &dyn TextMeasurer,
    line: &str,
    style: &TextStyle,
    max: f64,
    overflow: TextOverflow,
) -> String {
    let width_of = |s: &str| {
        measurer.measure(s, style).advance_width + style.letter_spacing * s.chars().count() as f64
    };
    if width_of(line) <= max {
        return line.into();
    }
    let marker = overflow.as_str();
    let mut out = String::new();
    for ch in line.chars() {
        let mut candidate = out.clone();
        candidate.push(ch);
        candidate.push_str(marker);
        if width_of(&candidate) > max {
            break;
        }
        out.push(ch);
    }
    out.push_str(marker);
    out
}

impl VisualElement for Text {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn draw(&self, surface: &mut dyn Surface) -> Result<(), DrawError> {
        match self.core.check_drawing_needed()? {
            DrawCheck::Clean | DrawCheck::Skip => return Ok(()),
            DrawCheck::Remove => {
                self.remove(surface);
                return Ok(());
            }
            DrawCheck::Draw => {}
        }
        DrawScheduler::new(TOTAL_PHASES).run(&self.core, |phase| {
            if phase.state.contains(ConsistencyState::CONTAINER) {
                self.layer.mount(surface, &self.core);
            } else if phase.state == ConsistencyState::BOUNDS {
                self.repair_bounds();
            } else {
                self.repair_appearance(surface);
            }
            Ok::<(), DrawError>(())
        })?;
        Ok(())
    }

    fn remove(&self, surface: &mut dyn Surface) {
        self.layer.detach(surface);
    }

    fn dispose(&self, surface: &mut dyn Surface) {
        self.lines.clear(surface);
        self.layer.release(surface);
        self.core.dispose();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use core::cell::RefCell;

    use chartwell_core::{NodeKind, Recorder};
    use serde_json::json;

    use super::*;

    fn mounted() -> (Rc<Text>, Recorder, chartwell_core::NodeId) {
        let mut r = Recorder::new();
        let root = r.layer();
        let text = Text::new(&Theme::default());
        text.core().set_container(Some(root));
        (text, r, root)
    }

    fn runs(r: &Recorder, text: &Text) -> Vec<TextRun> {
        let Some(layer) = text.layer.get() else {
            return Vec::new();
        };
        r.children(layer)
            .into_iter()
            .filter_map(|n| match r.node(n).map(|n| &n.kind) {
                Some(NodeKind::Text(run)) => Some(run.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn paint_settings_do_not_touch_bounds() {
        let (text, mut r, _) = mounted();
        text.draw(&mut r).unwrap();
        let signals = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&signals);
        text.core().listen_signals(move |e| s.borrow_mut().push(e.signal));

        text.set_font_color("red");
        assert_eq!(text.core().dirty_states(), ConsistencyState::APPEARANCE);
        text.set_font_size(20.0);
        assert!(text.core().has_invalidation_state(ConsistencyState::BOUNDS));
        assert_eq!(
            *signals.borrow(),
            [Signal::NEEDS_REDRAW, Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED]
        );
    }

    #[test]
    fn suspended_setters_coalesce() {
        let (text, _, _) = mounted();
        let signals = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&signals);
        text.core().listen_signals(move |e| s.borrow_mut().push(e.signal));
        text.core().suspend_signals_dispatching();
        text.set_font_color("red");
        text.set_letter_spacing(1.0);
        text.core().resume_signals_dispatching(true);
        assert_eq!(
            *signals.borrow(),
            [Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED]
        );
    }

    #[test]
    fn draws_one_run_per_line_and_measures() {
        let (text, mut r, _) = mounted();
        text.set_text("Revenue\nby month");
        text.set_font_size(10.0);
        text.draw(&mut r).unwrap();
        let runs = runs(&r, &text);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].content, "Revenue");
        assert!(runs[1].origin.y > runs[0].origin.y);
        let bounds = text.measured_bounds().unwrap();
        assert!((bounds.width() - 48.0).abs() < 1e-9, "widest line, 8 chars at 6px");
        assert!((bounds.height() - 20.0).abs() < 1e-9);

        let before = r.op_count();
        text.draw(&mut r).unwrap();
        assert_eq!(r.op_count(), before, "clean draw touches nothing");
    }

    #[test]
    fn explicit_bounds_wrap_center_and_ellipsize() {
        let (text, mut r, _) = mounted();
        text.set_text("abcdefghij");
        text.set_font_size(10.0);
        text.set_text_wrap(TextWrap::NoWrap);
        text.set_text_overflow(TextOverflow::Ellipsis);
        text.set_h_align(HAlign::Center);
        text.core().set_bounds(Some(Rect::new(0.0, 0.0, 36.0, 10.0)));
        text.draw(&mut r).unwrap();
        let runs = runs(&r, &text);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].content, "abc...");
        assert!((runs[0].origin.x - 0.0).abs() < 1e-9);
        assert_eq!(
            r.node(text.layer.get().unwrap()).and_then(|n| n.clip),
            Some(Rect::new(0.0, 0.0, 36.0, 10.0))
        );
    }

    #[test]
    fn config_round_trip() {
        let text = Text::new(&Theme::default());
        text.setup_by_json_value(&json!({ "text": "Hi", "fontSize": 18, "hAlign": "center" }))
            .unwrap();
        text.set_selectable(true);
        let json = text.to_json().unwrap();
        assert_eq!(json["fontSize"], json!(18.0));
        assert_eq!(json["selectable"], json!(true));
        assert!(json.get("fontColor").is_none());

        let copy = Text::new(&Theme::default());
        copy.setup_by_json_value(&json).unwrap();
        assert_eq!(copy.text(), "Hi");
        assert_eq!(copy.h_align(), HAlign::Center);
        assert_eq!(copy.serialize(), text.serialize());
    }
}
