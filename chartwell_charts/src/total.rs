// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Waterfall totals.
//!
//! A [`Total`] is a synthetic column inserted after the category named by its `x` option. It
//! shows the running sum of every value before it. The owning
//! [`TotalsStorage`](crate::TotalsStorage) pushes the value, bounds and drawing data into each
//! total during its own repair; a total only turns those into a rectangle, a hatch and a label.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use chartwell_core::{
    ConfigError, ConsistencyState, DescriptorsMeta, DrawCheck, DrawError, DrawScheduler,
    ElementCore, NodeId, OptionValue, PropertyMeta, Settings, SettingsState, Signal, StateGroups,
    StateSettings, Surface, TOTAL_PHASES, Theme, Value, VisualElement, resolve_state_option,
};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::config::{self, StateConfig, apply_option};
use crate::label::{LabelConfig, LabelSettings};
use crate::layer::{NodePool, RootLayer};
use crate::paint::{self, HatchFill};
use crate::symbol::{emit_lines, emit_rect};
use crate::tooltip::{FormatContext, Tooltip};

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

const TOTAL_STATES: ConsistencyState = ConsistencyState::VISUAL_BASE;
const TOTAL_SIGNALS: Signal = Signal::VISUAL_BASE
    .union(Signal::NEEDS_REDRAW_APPEARANCE)
    .union(Signal::NEEDS_RECALCULATION);

const PAINT: PropertyMeta = PropertyMeta::new(
    ConsistencyState::APPEARANCE,
    Signal::NEEDS_REDRAW_APPEARANCE,
);

const TOTAL_STATE_META: DescriptorsMeta =
    DescriptorsMeta::new(&[("fill", PAINT), ("stroke", PAINT), ("hatchFill", PAINT)]);

const TOTAL_META: DescriptorsMeta = DescriptorsMeta::new(&[
    (
        "x",
        PropertyMeta::new(ConsistencyState::NONE, Signal::NEEDS_RECALCULATION),
    ),
    ("name", PAINT),
    (
        "width",
        PropertyMeta::new(ConsistencyState::BOUNDS, Signal::BOUNDS_CHANGED),
    ),
]);

const HATCH_SPACING: f64 = 8.0;

/// Sums the finite numeric cells of `rows`.
pub(crate) fn sum_numeric(rows: &[Vec<Value>]) -> f64 {
    rows.iter()
        .flatten()
        .filter_map(|v| match v {
            Value::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        })
        .sum()
}

/// Vertical placement of a total as ratios of its bounds height, measured from the top.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawingData {
    /// Ratio of the value edge.
    pub value: f64,
    /// Ratio of the zero line.
    pub zero: f64,
}

/// Corners of a total's rectangle in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawingCoordinates {
    /// Left end of the value edge.
    pub left_top: Point,
    /// Right end of the value edge.
    pub right_top: Point,
    /// Right end of the zero edge.
    pub right_bottom: Point,
    /// Left end of the zero edge.
    pub left_bottom: Point,
}

impl DrawingCoordinates {
    /// Returns the corners in drawing order.
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        [
            self.left_top,
            self.right_top,
            self.right_bottom,
            self.left_bottom,
        ]
    }

    /// Returns the normalized rectangle spanned by the corners.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_points(self.left_top, self.right_bottom)
    }
}

/// Paint options and a label for one interaction state of a [`Total`].
pub struct TotalStateSettings {
    settings: StateSettings,
    label: LabelSettings,
}

impl fmt::Debug for TotalStateSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TotalStateSettings")
            .field("settings", &self.settings)
            .field("label", &self.label)
            .finish()
    }
}

impl TotalStateSettings {
    fn new(owner: &Rc<ElementCore>, state: SettingsState, theme: &Theme) -> Self {
        let (fill, stroke) = match state {
            SettingsState::Hovered => (&theme.totals.hovered_fill, &theme.totals.hovered_stroke),
            _ => (&theme.totals.fill, &theme.totals.stroke),
        };
        let settings = StateSettings::new(owner, state, TOTAL_STATE_META)
            .with_theme_option("fill", fill.as_str())
            .with_theme_option("stroke", stroke.as_str())
            .with_theme_option("hatchFill", false);

        let label = LabelSettings::new(theme);
        let weak = Rc::downgrade(owner);
        owner.subscribe(label.bus(), move |_| {
            if let Some(owner) = weak.upgrade() {
                owner.invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW_APPEARANCE);
            }
        });
        Self { settings, label }
    }

    /// The interaction state of this group.
    #[must_use]
    pub fn state(&self) -> SettingsState {
        self.settings.state()
    }

    /// The paint options.
    #[must_use]
    pub fn settings(&self) -> &StateSettings {
        &self.settings
    }

    /// See [`StateSettings::set_option`].
    pub fn set_option(&self, name: &str, value: impl Into<OptionValue>) -> bool {
        self.settings.set_option(name, value)
    }

    /// See [`StateSettings::get_option`].
    #[must_use]
    pub fn get_option(&self, name: &str) -> Option<OptionValue> {
        self.settings.get_option(name)
    }

    /// Sets the fill color.
    pub fn set_fill(&self, fill: &str) {
        self.set_option("fill", fill);
    }

    /// Sets the stroke, as `"<color> [<width>]"`.
    pub fn set_stroke(&self, stroke: &str) {
        self.set_option("stroke", stroke);
    }

    /// Sets the hatch pattern by name.
    pub fn set_hatch_fill(&self, hatch: &str) {
        self.set_option("hatchFill", hatch);
    }

    /// Label options of this state.
    #[must_use]
    pub fn label(&self) -> &LabelSettings {
        &self.label
    }

    /// Captures the explicitly set options.
    #[must_use]
    pub fn serialize(&self) -> TotalStateConfig {
        let StateConfig {
            fill,
            stroke,
            hatch_fill,
        } = StateConfig::capture(&self.settings);
        let label = self.label.serialize();
        TotalStateConfig {
            fill,
            stroke,
            hatch_fill,
            label: (!label.is_empty()).then_some(label),
        }
    }

    /// Applies the present keys.
    pub fn setup_by_json(&self, config: &TotalStateConfig) {
        StateConfig {
            fill: config.fill.clone(),
            stroke: config.stroke.clone(),
            hatch_fill: config.hatch_fill.clone(),
        }
        .apply(&self.settings);
        if let Some(label) = &config.label {
            self.label.setup_by_json(label);
        }
    }
}

/// Serialized [`TotalStateSettings`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStateConfig {
    /// Fill color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<OptionValue>,
    /// Stroke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<OptionValue>,
    /// Hatch pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hatch_fill: Option<OptionValue>,
    /// Label options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelConfig>,
}

/// Serialized [`Total`].
///
/// `fill`, `stroke`, `hatchFill` and `label` at the top level are aliases for the same keys of
/// `normal`; they are accepted on input and never produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalConfig {
    /// Category after which the total is inserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<OptionValue>,
    /// Display name, used as the category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<OptionValue>,
    /// Column width in pixels or percent of the category band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<OptionValue>,
    /// Enabled flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Normal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<TotalStateConfig>,
    /// Hovered state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hovered: Option<TotalStateConfig>,
    /// Alias of `normal.fill`.
    #[serde(default, skip_serializing)]
    pub fill: Option<OptionValue>,
    /// Alias of `normal.stroke`.
    #[serde(default, skip_serializing)]
    pub stroke: Option<OptionValue>,
    /// Alias of `normal.hatchFill`.
    #[serde(default, skip_serializing)]
    pub hatch_fill: Option<OptionValue>,
    /// Alias of `normal.label`.
    #[serde(default, skip_serializing)]
    pub label: Option<LabelConfig>,
}

impl TotalConfig {
    /// A config with only `x` set.
    #[must_use]
    pub fn at(x: &str) -> Self {
        Self {
            x: Some(x.into()),
            ..Self::default()
        }
    }

    /// Sets `name`.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the `fill` alias.
    #[must_use]
    pub fn with_fill(mut self, fill: &str) -> Self {
        self.fill = Some(fill.into());
        self
    }
}

/// A waterfall total.
pub struct Total {
    core: Rc<ElementCore>,
    settings: Settings,
    normal: TotalStateSettings,
    hovered: TotalStateSettings,
    active: Cell<SettingsState>,
    value: Cell<f64>,
    drawing_data: Cell<Option<DrawingData>>,
    coordinates: Cell<Option<DrawingCoordinates>>,
    tooltip: RefCell<Option<Rc<dyn Tooltip>>>,
    layer: RootLayer,
    shapes: NodePool,
    shape: Cell<Option<NodeId>>,
}

impl fmt::Debug for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Total")
            .field("core", &self.core)
            .field("settings", &self.settings)
            .field("active", &self.active.get())
            .field("value", &self.value.get())
            .finish_non_exhaustive()
    }
}

impl Total {
    /// Creates a total with the theme's total defaults.
    #[must_use]
    pub fn new(theme: &Theme) -> Rc<Self> {
        let core = ElementCore::new(TOTAL_STATES, TOTAL_SIGNALS);
        let settings = Settings::new(&core, TOTAL_META)
            .with_theme_option("width", theme.totals.width.as_str())
            .with_theme_option("name", theme.totals.legend_text.as_str());
        let normal = TotalStateSettings::new(&core, SettingsState::Normal, theme);
        let hovered = TotalStateSettings::new(&core, SettingsState::Hovered, theme);
        Rc::new(Self {
            core,
            settings,
            normal,
            hovered,
            active: Cell::new(SettingsState::Normal),
            value: Cell::new(0.0),
            drawing_data: Cell::new(None),
            coordinates: Cell::new(None),
            tooltip: RefCell::new(None),
            layer: RootLayer::default(),
            shapes: NodePool::default(),
            shape: Cell::new(None),
        })
    }

    /// Normal state settings.
    #[must_use]
    pub fn normal(&self) -> &TotalStateSettings {
        &self.normal
    }

    /// Hovered state settings.
    #[must_use]
    pub fn hovered(&self) -> &TotalStateSettings {
        &self.hovered
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

    /// Returns the category the total follows.
    #[must_use]
    pub fn x(&self) -> Option<String> {
        self.get_option("x")
            .and_then(|v| v.as_str().map(String::from))
    }

    /// Sets the category the total follows.
    pub fn set_x(&self, x: &str) {
        self.set_option("x", x);
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> String {
        self.get_option("name")
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default()
    }

    /// Sets the display name.
    pub fn set_name(&self, name: &str) {
        self.set_option("name", name);
    }

    /// Sets the width as pixels or a percent string.
    pub fn set_width(&self, width: impl Into<OptionValue>) {
        self.set_option("width", width);
    }

    /// Alias of `normal().set_fill`.
    pub fn set_fill(&self, fill: &str) {
        self.normal.set_fill(fill);
    }

    /// Alias of `normal().set_stroke`.
    pub fn set_stroke(&self, stroke: &str) {
        self.normal.set_stroke(stroke);
    }

    /// Alias of `normal().set_hatch_fill`.
    pub fn set_hatch_fill(&self, hatch: &str) {
        self.normal.set_hatch_fill(hatch);
    }

    /// Alias of `normal().label()`.
    #[must_use]
    pub fn label(&self) -> &LabelSettings {
        self.normal.label()
    }

    /// Sums the numeric cells of `rows`, stores the sum as the value and returns it.
    pub fn calculate_total_value(&self, rows: &[Vec<Value>]) -> f64 {
        let sum = sum_numeric(rows);
        self.set_value(sum);
        sum
    }

    /// The category key the total occupies on the x scale.
    #[must_use]
    pub fn total_x(&self) -> String {
        format!("total_{}", self.core.id().raw())
    }

    /// Categories inserted after the total's `x`.
    #[must_use]
    pub fn resolver_categories(&self) -> Vec<String> {
        vec![self.total_x()]
    }

    /// Returns the running sum shown by the total.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value.get()
    }

    /// Sets the value. The label text changes, so appearance is dirtied.
    pub fn set_value(&self, value: f64) {
        if self.value.replace(value) != value {
            self.core.invalidate(
                ConsistencyState::APPEARANCE,
                Signal::NEEDS_REDRAW_APPEARANCE,
            );
        }
    }

    /// Returns the vertical placement.
    #[must_use]
    pub fn drawing_data(&self) -> Option<DrawingData> {
        self.drawing_data.get()
    }

    /// Sets the vertical placement.
    pub fn set_drawing_data(&self, data: DrawingData) {
        if self.drawing_data.replace(Some(data)) != Some(data) {
            self.core
                .invalidate(ConsistencyState::BOUNDS, Signal::BOUNDS_CHANGED);
        }
    }

    /// Computes the rectangle corners from the bounds, the width option and the drawing data.
    #[must_use]
    pub fn drawing_coordinates(&self) -> Option<DrawingCoordinates> {
        let bounds = self.core.bounds()?;
        let data = self.drawing_data.get()?;
        let band = bounds.width();
        let width = self
            .get_option("width")
            .and_then(|w| w.normalize_size(band))
            .unwrap_or(band)
            .floor();
        let half_diff = (band - width) / 2.0;
        let left = bounds.x0 + half_diff;
        let right = bounds.x0 + band - half_diff;
        let top = data.value * bounds.height() + bounds.y0;
        let bottom = data.zero * bounds.height() + bounds.y0;
        Some(DrawingCoordinates {
            left_top: Point::new(left, top),
            right_top: Point::new(right, top),
            right_bottom: Point::new(right, bottom),
            left_bottom: Point::new(left, bottom),
        })
    }

    /// Returns `true` if `point` lies on the drawn rectangle.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.core.enabled()
            && self
                .coordinates
                .get()
                .is_some_and(|c| c.rect().contains(point))
    }

    /// Returns the interaction state used for drawing.
    #[must_use]
    pub fn active_state(&self) -> SettingsState {
        self.active.get()
    }

    /// Sets the tooltip shown on hover.
    pub fn set_tooltip(&self, tooltip: Rc<dyn Tooltip>) {
        *self.tooltip.borrow_mut() = Some(tooltip);
    }

    /// Returns the tooltip.
    #[must_use]
    pub fn tooltip(&self) -> Option<Rc<dyn Tooltip>> {
        self.tooltip.borrow().clone()
    }

    /// Tokens available to tooltip and label formats.
    #[must_use]
    pub fn format_context(&self) -> FormatContext {
        FormatContext::new()
            .with("x", self.x().unwrap_or_default())
            .with("value", self.value())
            .with("name", self.name())
            .with("totalX", self.total_x())
    }

    /// Switches to the hovered state, shows the tooltip at `point` and redraws.
    pub fn pointer_move(&self, surface: &mut dyn Surface, point: Point) -> Result<(), DrawError> {
        self.apply_state(SettingsState::Hovered);
        if let Some(tooltip) = self.tooltip() {
            tooltip.show_float(point.x, point.y, &self.format_context());
        }
        self.draw(surface)
    }

    /// Switches back to the normal state, hides the tooltip and redraws.
    pub fn pointer_out(&self, surface: &mut dyn Surface) -> Result<(), DrawError> {
        self.apply_state(SettingsState::Normal);
        if let Some(tooltip) = self.tooltip() {
            tooltip.hide();
        }
        self.draw(surface)
    }

    fn apply_state(&self, state: SettingsState) {
        if self.active.replace(state) != state {
            // Redrawn right away by the pointer handler, nobody else needs to know.
            self.core
                .invalidate(ConsistencyState::APPEARANCE, Signal::NONE);
        }
    }

    fn resolve(&self, name: &str) -> Option<OptionValue> {
        resolve_state_option(
            name,
            None,
            self.active.get(),
            StateGroups {
                normal: &self.normal.settings,
                hovered: Some(&self.hovered.settings),
                selected: None,
            },
        )
    }

    fn active_label(&self) -> &LabelSettings {
        match self.active.get() {
            SettingsState::Hovered => self.hovered.label(),
            _ => self.normal.label(),
        }
    }

    /// Captures the explicitly set options.
    #[must_use]
    pub fn serialize(&self) -> TotalConfig {
        let normal = self.normal.serialize();
        let hovered = self.hovered.serialize();
        TotalConfig {
            x: self.settings.get_own_option("x"),
            name: self.settings.get_own_option("name"),
            width: self.settings.get_own_option("width"),
            enabled: Some(self.core.enabled()),
            normal: (normal != TotalStateConfig::default()).then_some(normal),
            hovered: (hovered != TotalStateConfig::default()).then_some(hovered),
            ..TotalConfig::default()
        }
    }

    /// Applies the present keys, dispatching at most one signal.
    pub fn setup_by_json(&self, config: &TotalConfig) {
        self.core.suspend_signals_dispatching();
        let set = |n: &str, v: OptionValue| self.settings.set_option(n, v);
        apply_option(set, "x", config.x.as_ref());
        apply_option(set, "name", config.name.as_ref());
        apply_option(set, "width", config.width.as_ref());
        if let Some(normal) = &config.normal {
            self.normal.setup_by_json(normal);
        }
        if let Some(hovered) = &config.hovered {
            self.hovered.setup_by_json(hovered);
        }
        self.normal.setup_by_json(&TotalStateConfig {
            fill: config.fill.clone(),
            stroke: config.stroke.clone(),
            hatch_fill: config.hatch_fill.clone(),
            label: config.label.clone(),
        });
        if let Some(enabled) = config.enabled {
            self.core.set_enabled(enabled);
        }
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

    fn repair_appearance(&self, surface: &mut dyn Surface) {
        self.shapes.clear(surface);
        self.shape.set(None);
        let (Some(layer), Some(coords)) = (self.layer.get(), self.coordinates.get()) else {
            return;
        };

        let shape = self.shapes.path(surface, layer);
        emit_rect(surface, shape, coords.corners());
        surface.set_fill(shape, paint::fill(self.resolve("fill").as_ref(), 1.0));
        let stroke = paint::stroke(self.resolve("stroke").as_ref(), 1.0);
        surface.set_stroke(shape, stroke.clone());
        self.shape.set(Some(shape));

        let rect = coords.rect();
        if let Some(hatch) = HatchFill::from_option(self.resolve("hatchFill").as_ref()) {
            let node = self.shapes.path(surface, layer);
            emit_lines(surface, node, &hatch.segments(rect, HATCH_SPACING));
            surface.set_stroke(node, stroke);
            surface.set_clip(node, Some(rect));
        }

        let label = self.active_label();
        let anchor = Point::new(rect.center().x, rect.y0 - label.font_size());
        label.draw(surface, &self.shapes, layer, &self.format_context(), anchor);
    }

    /// The node of the drawn rectangle.
    #[must_use]
    pub fn shape(&self) -> Option<NodeId> {
        self.shape.get()
    }
}

impl VisualElement for Total {
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
                self.coordinates.set(self.drawing_coordinates());
                self.core
                    .invalidate(ConsistencyState::APPEARANCE, Signal::NONE);
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
        self.shapes.clear(surface);
        self.layer.release(surface);
        self.normal.label.dispose();
        self.hovered.label.dispose();
        self.core.dispose();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use chartwell_core::{NodeKind, Recorder};
    use serde_json::json;

    use super::*;
    use crate::tooltip::TextTooltip;

    fn placed(r: &mut Recorder) -> Rc<Total> {
        let root = r.layer();
        let total = Total::new(&Theme::default());
        total.core().set_container(Some(root));
        total.core().set_bounds(Some(Rect::new(0.0, 0.0, 100.0, 200.0)));
        total.set_drawing_data(DrawingData {
            value: 0.25,
            zero: 0.75,
        });
        total
    }

    #[test]
    fn coordinates_center_the_column_in_its_band() {
        let mut r = Recorder::new();
        let total = placed(&mut r);
        total.set_width("50%");
        let c = total.drawing_coordinates().unwrap();
        assert_eq!(c.left_top, Point::new(25.0, 50.0));
        assert_eq!(c.right_bottom, Point::new(75.0, 150.0));

        total.set_width(33.3);
        let c = total.drawing_coordinates().unwrap();
        assert_eq!(c.rect().width(), 33.0, "width is floored");
    }

    #[test]
    fn value_sums_numbers_only() {
        let total = Total::new(&Theme::default());
        let rows = [
            vec![Value::from("Jan"), Value::from(10.0)],
            vec![Value::Null, Value::from(-4.0), Value::from(f64::NAN)],
        ];
        assert_eq!(total.calculate_total_value(&rows), 6.0);
        assert_eq!(total.value(), 6.0);
        assert!(total.total_x().starts_with("total_"));
        assert_eq!(total.resolver_categories(), [total.total_x()]);
    }

    #[test]
    fn hover_switches_paint_and_shows_tooltip() {
        let mut r = Recorder::new();
        let total = placed(&mut r);
        let tooltip = TextTooltip::new();
        total.set_tooltip(tooltip.clone());
        total.set_name("Net");
        total.set_value(42.0);
        total.draw(&mut r).unwrap();

        let theme = Theme::default();
        let fill_of = |r: &Recorder| r.node(total.shape().unwrap()).and_then(|n| n.fill.clone());
        assert_eq!(
            fill_of(&r),
            paint::fill(Some(&theme.totals.fill.as_str().into()), 1.0)
        );

        let inside = Point::new(50.0, 100.0);
        assert!(total.contains(inside));
        total.pointer_move(&mut r, inside).unwrap();
        assert_eq!(total.active_state(), SettingsState::Hovered);
        assert_eq!(
            fill_of(&r),
            paint::fill(Some(&theme.totals.hovered_fill.as_str().into()), 1.0)
        );
        assert!(tooltip.is_visible());
        assert_eq!(tooltip.content(), "Net: 42");

        total.pointer_out(&mut r).unwrap();
        assert!(!tooltip.is_visible());
        assert_eq!(total.active_state(), SettingsState::Normal);
    }

    #[test]
    fn label_shows_the_value() {
        let mut r = Recorder::new();
        let total = placed(&mut r);
        total.set_value(12.5);
        total.draw(&mut r).unwrap();
        let layer = total.layer.get().unwrap();
        let texts: Vec<_> = r
            .children(layer)
            .into_iter()
            .filter_map(|n| match &r.node(n)?.kind {
                NodeKind::Text(run) => Some(run.content.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, ["12.5"]);
    }

    #[test]
    fn label_changes_invalidate_the_total() {
        let mut r = Recorder::new();
        let total = placed(&mut r);
        total.draw(&mut r).unwrap();
        assert!(total.core().is_consistent());

        let signals = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&signals);
        total
            .core()
            .listen_signals(move |e| s.borrow_mut().push(e.signal));
        total.label().set_format("{%name}");
        assert_eq!(total.core().dirty_states(), ConsistencyState::APPEARANCE);
        assert_eq!(*signals.borrow(), [Signal::NEEDS_REDRAW_APPEARANCE]);
    }

    #[test]
    fn value_and_placement_changes_are_announced() {
        let mut r = Recorder::new();
        let total = placed(&mut r);
        total.draw(&mut r).unwrap();

        let signals = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&signals);
        total
            .core()
            .listen_signals(move |e| s.borrow_mut().push(e.signal));

        total.set_value(7.0);
        total.set_value(7.0);
        total.set_drawing_data(DrawingData {
            value: 0.5,
            zero: 0.75,
        });
        assert_eq!(
            total.core().dirty_states(),
            ConsistencyState::APPEARANCE | ConsistencyState::BOUNDS
        );
        assert_eq!(
            *signals.borrow(),
            [Signal::NEEDS_REDRAW_APPEARANCE, Signal::BOUNDS_CHANGED]
        );

        // Quiet inside a suspension, as the storage does while repairing.
        signals.borrow_mut().clear();
        total.core().without_dispatch(|| total.set_value(8.0));
        assert!(signals.borrow().is_empty());
    }

    #[test]
    fn hatch_is_clipped_to_the_column() {
        let mut r = Recorder::new();
        let total = placed(&mut r);
        total.set_hatch_fill("cross");
        total.draw(&mut r).unwrap();
        let layer = total.layer.get().unwrap();
        let clips: Vec<_> = r
            .children(layer)
            .into_iter()
            .filter_map(|n| r.node(n)?.clip)
            .collect();
        assert_eq!(clips, [total.drawing_coordinates().unwrap().rect()]);
    }

    #[test]
    fn aliases_write_the_normal_state() {
        let total = Total::new(&Theme::default());
        total
            .setup_by_json_value(&json!({
                "x": "Mar",
                "fill": "red",
                "hovered": { "fill": "blue", "label": { "format": "{%name}" } }
            }))
            .unwrap();
        assert_eq!(total.normal().get_option("fill"), Some("red".into()));
        assert_eq!(total.hovered().get_option("fill"), Some("blue".into()));
        assert_eq!(total.hovered().label().format(), "{%name}");

        let json = total.to_json().unwrap();
        assert_eq!(json["normal"]["fill"], json!("red"));
        assert!(json.get("fill").is_none());
    }
}
