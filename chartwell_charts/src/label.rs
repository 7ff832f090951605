// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Label settings.
//!
//! A [`LabelSettings`] is a small settings object with its own bus. Its owner subscribes to that
//! bus and maps [`Signal::NEEDS_REDRAW`] to whatever it has to repaint.

use alloc::rc::Rc;
use alloc::string::String;
use core::cell::RefCell;
use core::fmt;

use chartwell_core::{
    ConfigError, ConsistencyState, DescriptorsMeta, ElementCore, NodeId, OptionValue,
    PropertyMeta, Settings, Signal, SignalBus, Surface, TextRun, Theme,
};
use chartwell_text::{FontFamily, HeuristicTextMeasurer, TextMeasurer, TextStyle};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

use crate::config::{self, apply_option};
use crate::layer::NodePool;
use crate::paint;
use crate::tooltip::FormatContext;

const REDRAW: PropertyMeta = PropertyMeta::new(ConsistencyState::NONE, Signal::NEEDS_REDRAW);

const LABEL_META: DescriptorsMeta = DescriptorsMeta::new(&[
    ("enabled", REDRAW),
    ("format", REDRAW),
    ("fontSize", REDRAW),
    ("fontColor", REDRAW),
    ("fontFamily", REDRAW),
]);

/// Label options.
pub struct LabelSettings {
    core: Rc<ElementCore>,
    settings: Settings,
    measurer: RefCell<Rc<dyn TextMeasurer>>,
}

impl fmt::Debug for LabelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelSettings")
            .field("id", &self.core.id())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl LabelSettings {
    /// Creates labels with the theme's label defaults.
    #[must_use]
    pub fn new(theme: &Theme) -> Self {
        let core = ElementCore::new(ConsistencyState::NONE, Signal::NEEDS_REDRAW);
        let settings = Settings::new(&core, LABEL_META)
            .with_theme_option("enabled", theme.labels.enabled)
            .with_theme_option("format", theme.labels.format.as_str())
            .with_theme_option("fontSize", theme.labels.font_size)
            .with_theme_option("fontColor", theme.labels.font_color.as_str())
            .with_theme_option("fontFamily", theme.text.font_family.as_str());
        Self {
            core,
            settings,
            measurer: RefCell::new(Rc::new(HeuristicTextMeasurer)),
        }
    }

    /// The bus owners subscribe to.
    #[must_use]
    pub fn bus(&self) -> &Rc<SignalBus> {
        self.core.bus()
    }

    /// Replaces the measurer used for label extents.
    pub fn set_measurer(&self, measurer: Rc<dyn TextMeasurer>) {
        *self.measurer.borrow_mut() = measurer;
        self.core.invalidate(ConsistencyState::NONE, Signal::NEEDS_REDRAW);
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

    /// See [`Settings::get_own_option`].
    #[must_use]
    pub fn get_own_option(&self, name: &str) -> Option<OptionValue> {
        self.settings.get_own_option(name)
    }

    /// Returns `true` if labels draw.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.get_option("enabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Turns labels on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.set_option("enabled", enabled);
    }

    /// Returns the format template.
    #[must_use]
    pub fn format(&self) -> String {
        self.get_option("format")
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default()
    }

    /// Sets the format template.
    pub fn set_format(&self, format: &str) {
        self.set_option("format", format);
    }

    /// Returns the font size.
    #[must_use]
    pub fn font_size(&self) -> f64 {
        self.get_option("fontSize")
            .and_then(|v| v.as_f64())
            .unwrap_or(11.0)
    }

    /// Renders the label text, or `None` when labels are disabled.
    #[must_use]
    pub fn render(&self, context: &FormatContext) -> Option<String> {
        self.enabled().then(|| context.format(&self.format()))
    }

    /// Measures `text` and centers it on `anchor`.
    #[must_use]
    pub fn layout(&self, text: String, anchor: Point) -> TextRun {
        let family = self
            .get_option("fontFamily")
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        let mut style = TextStyle::new(self.font_size());
        style.font_family = FontFamily::from_css(&family);
        let metrics = self.measurer.borrow().measure(&text, &style);
        let size = Size::new(metrics.advance_width, metrics.line_height());
        TextRun {
            content: text,
            origin: Point::new(anchor.x - size.width * 0.5, anchor.y - size.height * 0.5),
            size,
            font_size: style.font_size,
            font_family: family,
        }
    }

    /// Draws one label centered on `anchor` into a pooled text node under `parent`.
    pub(crate) fn draw(
        &self,
        surface: &mut dyn Surface,
        pool: &NodePool,
        parent: NodeId,
        context: &FormatContext,
        anchor: Point,
    ) -> Option<NodeId> {
        let text = self.render(context)?;
        let node = pool.text(surface, parent);
        surface.set_text(node, self.layout(text, anchor));
        surface.set_fill(node, paint::fill(self.get_option("fontColor").as_ref(), 1.0));
        Some(node)
    }

    /// Captures the explicitly set options.
    #[must_use]
    pub fn serialize(&self) -> LabelConfig {
        LabelConfig {
            enabled: self.get_own_option("enabled"),
            format: self.get_own_option("format"),
            font_size: self.get_own_option("fontSize"),
            font_color: self.get_own_option("fontColor"),
            font_family: self.get_own_option("fontFamily"),
        }
    }

    /// Applies the present keys, dispatching at most one signal.
    pub fn setup_by_json(&self, config: &LabelConfig) {
        self.core.suspend_signals_dispatching();
        let set = |n: &str, v: OptionValue| self.settings.set_option(n, v);
        apply_option(set, "enabled", config.enabled.as_ref());
        apply_option(set, "format", config.format.as_ref());
        apply_option(set, "fontSize", config.font_size.as_ref());
        apply_option(set, "fontColor", config.font_color.as_ref());
        apply_option(set, "fontFamily", config.font_family.as_ref());
        self.core.resume_signals_dispatching(true);
    }

    /// Applies a JSON object.
    pub fn setup_by_json_value(&self, value: &serde_json::Value) -> Result<(), ConfigError> {
        self.setup_by_json(&config::from_json(value)?);
        Ok(())
    }

    /// Releases every listener of the label bus.
    pub fn dispose(&self) {
        self.core.dispose();
    }
}

/// Serialized [`LabelSettings`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelConfig {
    /// Whether labels draw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<OptionValue>,
    /// Format template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OptionValue>,
    /// Font size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<OptionValue>,
    /// Font color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<OptionValue>,
    /// Font family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<OptionValue>,
}

impl LabelConfig {
    /// Returns `true` if no key is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.format.is_none()
            && self.font_size.is_none()
            && self.font_color.is_none()
            && self.font_family.is_none()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec::Vec;
    use core::cell::Cell;

    use chartwell_core::Recorder;
    use serde_json::json;

    use super::*;

    #[test]
    fn theme_defaults_and_rendering() {
        let labels = LabelSettings::new(&Theme::default());
        assert!(labels.enabled());
        let ctx = FormatContext::new().with("value", 12.0);
        assert_eq!(labels.render(&ctx).as_deref(), Some("12"));
        labels.set_format("v={%value}");
        assert_eq!(labels.render(&ctx).as_deref(), Some("v=12"));
        labels.set_enabled(false);
        assert_eq!(labels.render(&ctx), None);
    }

    #[test]
    fn changes_dispatch_redraw_and_setup_coalesces() {
        let labels = LabelSettings::new(&Theme::default());
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        labels.bus().listen(move |e| {
            assert_eq!(e.signal, Signal::NEEDS_REDRAW);
            h.set(h.get() + 1);
        });
        labels.set_option("fontSize", 20.0);
        assert_eq!(hits.get(), 1);
        labels
            .setup_by_json_value(&json!({ "format": "{%x}", "fontColor": "red", "enabled": false }))
            .unwrap();
        assert_eq!(hits.get(), 2);
        let config = labels.serialize();
        assert_eq!(config.font_size, Some(OptionValue::Number(20.0)));
        assert_eq!(config.enabled, Some(OptionValue::Bool(false)));
        assert!(!config.is_empty());
    }

    #[test]
    fn layout_centers_on_the_anchor() {
        let labels = LabelSettings::new(&Theme::default());
        let run = labels.layout("abcd".into(), Point::new(100.0, 50.0));
        assert!((run.origin.x + run.size.width * 0.5 - 100.0).abs() < 1e-9);
        assert!((run.origin.y + run.size.height * 0.5 - 50.0).abs() < 1e-9);
        assert_eq!(run.font_size, 11.0);

        let mut r = Recorder::new();
        let root = r.layer();
        let pool = NodePool::default();
        let node = labels
            .draw(&mut r, &pool, root, &FormatContext::new().with("value", 1.0), Point::ZERO)
            .unwrap();
        assert!(r.node(node).is_some_and(|n| n.fill.is_some()));
        let kids: Vec<_> = r.children(root);
        assert_eq!(kids, [node]);
    }
}
