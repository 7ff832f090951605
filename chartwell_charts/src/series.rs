// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scatter series.
//!
//! A [`ScatterSeries`] maps the `x` and `value` fields of a data [`View`] through two linear
//! scales into its pixel bounds. The variant decides what is drawn per point: a marker, a
//! polyline vertex or a bubble sized by the `size` field.
//!
//! The series listens to its data, its scales, its error settings and its labels. Each of them
//! is translated into the series' own states before anything reaches the chart:
//!
//! | source   | received                  | dirties                   | dispatches                           |
//! |----------|---------------------------|---------------------------|--------------------------------------|
//! | data     | `DATA_CHANGED`            | `APPEARANCE, SERIES_DATA` | `NEEDS_RECALCULATION, DATA_CHANGED`  |
//! | scale    | `NEEDS_RECALCULATION`     | `APPEARANCE`              | `NEEDS_RECALCULATION`                |
//! | scale    | `NEEDS_REAPPLICATION`     | `APPEARANCE`              | `NEEDS_REDRAW`                       |
//! | error    | redraw or recalculation   | `SERIES_ERROR, APPEARANCE`| the same                             |
//! | labels   | anything                  | `SERIES_LABELS`           | `NEEDS_REDRAW`                       |

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use chartwell_core::reporting::{self, ErrorCode, WarningCode};
use chartwell_core::{
    ConfigError, ConsistencyState, DataIterator, DescriptorsMeta, DrawCheck, DrawError,
    DrawScheduler, ElementCore, HasError, HasMarkers, HasScales, ListenerKey, NodeId, OptionValue,
    PropertyMeta, SERIES_PHASES, Scale, Settings, SettingsState, Signal, SignalEvent,
    StateGroups, StateSettings, Surface, Theme, Value, VisualElement, resolve_state_option,
};
use kurbo::{BezPath, Insets, Point, Rect, Shape};
use serde::{Deserialize, Serialize};

use crate::config::{self, StateConfig, apply_option};
use crate::data::View;
use crate::error_bars::{ErrorConfig, ErrorSettings, whiskers};
use crate::label::{LabelConfig, LabelSettings};
use crate::layer::{NodePool, RootLayer};
use crate::legend::{LegendCategory, LegendItem};
use crate::paint::{self, HatchFill};
use crate::symbol::{Symbol, emit_lines, emit_path};
use crate::tooltip::FormatContext;
use crate::z_order;

const SERIES_STATES: ConsistencyState = ConsistencyState::VISUAL_BASE
    .union(ConsistencyState::SERIES_DATA)
    .union(ConsistencyState::SERIES_HATCH_FILL)
    .union(ConsistencyState::SERIES_LABELS)
    .union(ConsistencyState::SERIES_ERROR);
const SERIES_SIGNALS: Signal = Signal::VISUAL_BASE
    .union(Signal::DATA_CHANGED)
    .union(Signal::NEEDS_RECALCULATION)
    .union(Signal::NEED_UPDATE_LEGEND);

/// Extra signals of an enabled-flag change: the chart has to rescale and rebuild its legend.
const ENABLE_SIGNALS: Signal = Signal::DATA_CHANGED
    .union(Signal::NEEDS_RECALCULATION)
    .union(Signal::NEED_UPDATE_LEGEND);

const REDRAW: PropertyMeta =
    PropertyMeta::new(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW);

const SERIES_META: DescriptorsMeta = DescriptorsMeta::new(&[
    (
        "name",
        PropertyMeta::new(ConsistencyState::NONE, Signal::NEED_UPDATE_LEGEND),
    ),
    ("markerType", REDRAW),
    ("markerSize", REDRAW),
]);

const SERIES_STATE_META: DescriptorsMeta = DescriptorsMeta::new(&[
    ("fill", REDRAW),
    ("stroke", REDRAW),
    (
        "hatchFill",
        PropertyMeta::new(ConsistencyState::SERIES_HATCH_FILL, Signal::NEEDS_REDRAW),
    ),
]);

const HATCH_SPACING: f64 = 4.0;

/// The drawing variant of a [`ScatterSeries`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScatterSeriesType {
    /// One marker per point.
    #[default]
    Marker,
    /// A polyline through the points.
    Line,
    /// One circle per point, sized by the `size` field.
    Bubble,
}

impl ScatterSeriesType {
    /// Parses a series type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "marker" => Some(Self::Marker),
            "line" => Some(Self::Line),
            "bubble" => Some(Self::Bubble),
            _ => None,
        }
    }

    /// Returns the series type name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Line => "line",
            Self::Bubble => "bubble",
        }
    }

    /// Returns `true` if the variant draws error bars.
    #[must_use]
    pub fn supports_error(self) -> bool {
        matches!(self, Self::Marker | Self::Line)
    }

    /// Returns `true` if the variant carries a separate marker layer.
    #[must_use]
    pub fn supports_markers(self) -> bool {
        false
    }

    /// Returns `true` if point size comes from the data.
    #[must_use]
    pub fn is_size_based(self) -> bool {
        matches!(self, Self::Bubble)
    }
}

/// Clipping of a series' output.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Clip {
    /// No clipping.
    #[default]
    Off,
    /// Clip to the series bounds.
    Bounds,
    /// Clip to a fixed rectangle.
    Rect(Rect),
}

impl Clip {
    /// Resolves the clip rectangle for a series placed in `bounds`.
    #[must_use]
    pub fn area(self, bounds: Option<Rect>) -> Option<Rect> {
        match self {
            Self::Off => None,
            Self::Bounds => bounds,
            Self::Rect(rect) => Some(rect),
        }
    }
}

impl From<bool> for Clip {
    fn from(clip: bool) -> Self {
        if clip { Self::Bounds } else { Self::Off }
    }
}

impl From<Rect> for Clip {
    fn from(rect: Rect) -> Self {
        Self::Rect(rect)
    }
}

/// Serialized [`Clip`]: a flag or a rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClipConfig {
    /// `true` clips to the series bounds.
    Flag(bool),
    /// A fixed rectangle.
    Rect {
        /// Left edge.
        left: f64,
        /// Top edge.
        top: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
}

impl From<Clip> for ClipConfig {
    fn from(clip: Clip) -> Self {
        match clip {
            Clip::Off => Self::Flag(false),
            Clip::Bounds => Self::Flag(true),
            Clip::Rect(r) => Self::Rect {
                left: r.x0,
                top: r.y0,
                width: r.width(),
                height: r.height(),
            },
        }
    }
}

impl From<ClipConfig> for Clip {
    fn from(config: ClipConfig) -> Self {
        match config {
            ClipConfig::Flag(flag) => flag.into(),
            ClipConfig::Rect {
                left,
                top,
                width,
                height,
            } => Self::Rect(Rect::new(left, top, left + width, top + height)),
        }
    }
}

/// Summary of one numeric field over the plottable points.
///
/// Every value is NaN when no point contributed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldStatistics {
    /// Number of contributing points.
    pub count: usize,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Sum of all values.
    pub sum: f64,
    /// `sum / count`.
    pub average: f64,
    /// Middle value; the mean of the two middle values for an even count.
    pub median: f64,
    /// Most frequent value; the smallest one on ties.
    pub mode: f64,
    /// Value of the first contributing point.
    pub first: f64,
    /// Value of the last contributing point.
    pub last: f64,
}

impl Default for FieldStatistics {
    fn default() -> Self {
        Self {
            count: 0,
            min: f64::NAN,
            max: f64::NAN,
            sum: f64::NAN,
            average: f64::NAN,
            median: f64::NAN,
            mode: f64::NAN,
            first: f64::NAN,
            last: f64::NAN,
        }
    }
}

impl FieldStatistics {
    /// Summarizes `values` in data order.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        let (Some(first), Some(last)) = (values.first(), values.last()) else {
            return Self::default();
        };
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let mut mode = sorted[0];
        let mut best = 0;
        let mut run = 0;
        for (i, v) in sorted.iter().enumerate() {
            run = if i > 0 && sorted[i - 1] == *v { run + 1 } else { 1 };
            if run > best {
                best = run;
                mode = *v;
            }
        }

        let average = sum / count as f64;
        Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            sum,
            average,
            median,
            mode,
            first: *first,
            last: *last,
        }
    }
}

/// Statistics of a series, refreshed by its `data` phase.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeriesStatistics {
    /// The `x` field.
    pub x: FieldStatistics,
    /// The `value` field.
    pub value: FieldStatistics,
    /// The `size` field; only bubbles collect it.
    pub size: FieldStatistics,
}

/// Serialized [`ScatterSeries`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterSeriesConfig {
    /// Drawing variant. Read when the series is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_type: Option<ScatterSeriesType>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<OptionValue>,
    /// Marker shape name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_type: Option<OptionValue>,
    /// Marker size in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_size: Option<OptionValue>,
    /// Clipping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ClipConfig>,
    /// Error bars; only written for variants that draw them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorConfig>,
    /// Labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<LabelConfig>,
    /// Enabled flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Normal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<StateConfig>,
    /// Hovered state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hovered: Option<StateConfig>,
    /// Selected state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<StateConfig>,
}

/// A scatter series.
pub struct ScatterSeries {
    core: Rc<ElementCore>,
    kind: ScatterSeriesType,
    index: usize,
    bubble_size: (f64, f64),
    settings: Settings,
    normal: StateSettings,
    hovered: StateSettings,
    selected: StateSettings,
    active: Cell<SettingsState>,
    error: ErrorSettings,
    labels: LabelSettings,
    data: RefCell<Option<(Rc<View>, ListenerKey)>>,
    x_scale: RefCell<Option<(Rc<dyn Scale>, ListenerKey)>>,
    y_scale: RefCell<Option<(Rc<dyn Scale>, ListenerKey)>>,
    clip: Cell<Clip>,
    axes_lines_space: Cell<Insets>,
    statistics: Cell<SeriesStatistics>,
    points: RefCell<Vec<Option<Point>>>,
    layer: RootLayer,
    shapes: NodePool,
    error_paths: NodePool,
    label_nodes: NodePool,
}

impl fmt::Debug for ScatterSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScatterSeries")
            .field("core", &self.core)
            .field("kind", &self.kind)
            .field("index", &self.index)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ScatterSeries {
    /// Creates a series of `kind`, colored with palette entry `index`.
    #[must_use]
    pub fn new(theme: &Theme, kind: ScatterSeriesType, index: usize) -> Rc<Self> {
        let core = ElementCore::new(SERIES_STATES, SERIES_SIGNALS);
        core.set_z_index(z_order::SERIES);
        let settings = Settings::new(&core, SERIES_META)
            .with_theme_option("name", format!("Series {index}"))
            .with_theme_option("markerType", Symbol::default().as_str())
            .with_theme_option("markerSize", theme.series.marker_size);
        let color = theme.series.palette_color(index);
        let stroke = format!("{color} {}", theme.series.stroke_width);
        let group = |state, fill: &str| {
            StateSettings::new(&core, state, SERIES_STATE_META)
                .with_theme_option("fill", fill)
                .with_theme_option("stroke", stroke.as_str())
                .with_theme_option("hatchFill", false)
        };
        let normal = group(SettingsState::Normal, color);
        let hovered = group(SettingsState::Hovered, theme.series.hovered_fill.as_str());
        let selected = group(SettingsState::Selected, theme.series.selected_fill.as_str());

        let error = ErrorSettings::new(theme);
        let weak = Rc::downgrade(&core);
        core.subscribe(error.bus(), move |e| {
            let signal = e.signal & (Signal::NEEDS_REDRAW | Signal::NEEDS_RECALCULATION);
            if let Some(core) = weak.upgrade()
                && !signal.is_empty()
            {
                core.invalidate(
                    ConsistencyState::SERIES_ERROR | ConsistencyState::APPEARANCE,
                    signal,
                );
            }
        });
        let labels = LabelSettings::new(theme);
        let weak = Rc::downgrade(&core);
        core.subscribe(labels.bus(), move |_| {
            if let Some(core) = weak.upgrade() {
                core.invalidate(ConsistencyState::SERIES_LABELS, Signal::NEEDS_REDRAW);
            }
        });

        Rc::new(Self {
            core,
            kind,
            index,
            bubble_size: theme.series.bubble_size,
            settings,
            normal,
            hovered,
            selected,
            active: Cell::new(SettingsState::Normal),
            error,
            labels,
            data: RefCell::new(None),
            x_scale: RefCell::new(None),
            y_scale: RefCell::new(None),
            clip: Cell::new(Clip::Off),
            axes_lines_space: Cell::new(Insets::ZERO),
            statistics: Cell::new(SeriesStatistics::default()),
            points: RefCell::new(Vec::new()),
            layer: RootLayer::default(),
            shapes: NodePool::default(),
            error_paths: NodePool::default(),
            label_nodes: NodePool::default(),
        })
    }

    /// Creates a series from `config`, taking the variant from `seriesType`.
    #[must_use]
    pub fn from_config(theme: &Theme, config: &ScatterSeriesConfig, index: usize) -> Rc<Self> {
        let series = Self::new(theme, config.series_type.unwrap_or_default(), index);
        series.core.without_dispatch(|| series.setup_by_json(config));
        series
    }

    /// The drawing variant.
    #[must_use]
    pub fn kind(&self) -> ScatterSeriesType {
        self.kind
    }

    /// The palette index the series was created with.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
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

    /// Normal state settings.
    #[must_use]
    pub fn normal(&self) -> &StateSettings {
        &self.normal
    }

    /// Hovered state settings.
    #[must_use]
    pub fn hovered(&self) -> &StateSettings {
        &self.hovered
    }

    /// Selected state settings.
    #[must_use]
    pub fn selected(&self) -> &StateSettings {
        &self.selected
    }

    /// Returns the interaction state used for drawing.
    #[must_use]
    pub fn active_state(&self) -> SettingsState {
        self.active.get()
    }

    /// Switches the interaction state used for drawing.
    pub fn set_active_state(&self, state: SettingsState) {
        if self.active.replace(state) != state {
            self.core
                .invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW);
        }
    }

    /// Label options.
    #[must_use]
    pub fn labels(&self) -> &LabelSettings {
        &self.labels
    }

    /// Enables or disables the series, telling the chart to rescale and update its legend.
    pub fn set_enabled(&self, enabled: bool) {
        if self.core.enabled() == enabled {
            return;
        }
        self.core.suspend_signals_dispatching();
        self.core.set_enabled(enabled);
        self.core.dispatch_signal(ENABLE_SIGNALS);
        self.core.resume_signals_dispatching(true);
    }

    // --- data and scales ---

    /// Returns the bound data.
    #[must_use]
    pub fn data(&self) -> Option<Rc<View>> {
        self.data.borrow().as_ref().map(|(view, _)| view.clone())
    }

    /// Binds `view`, releasing the previous binding.
    pub fn set_data(&self, view: Rc<View>) {
        if !self.core.ensure_alive("set_data") {
            return;
        }
        if let Some((old, key)) = self.data.borrow_mut().take() {
            self.core.unsubscribe(old.bus(), key);
        }
        let weak = Rc::downgrade(&self.core);
        let key = self.core.subscribe(view.bus(), move |e| {
            if let Some(core) = weak.upgrade()
                && e.has_signal(Signal::DATA_CHANGED)
            {
                core.invalidate(
                    ConsistencyState::APPEARANCE | ConsistencyState::SERIES_DATA,
                    Signal::NEEDS_RECALCULATION | Signal::DATA_CHANGED,
                );
            }
        });
        *self.data.borrow_mut() = Some((view, key));
        self.core.invalidate(
            ConsistencyState::APPEARANCE | ConsistencyState::SERIES_DATA,
            Signal::NEEDS_RECALCULATION | Signal::NEEDS_REDRAW,
        );
    }

    fn bind_scale(
        &self,
        slot: &RefCell<Option<(Rc<dyn Scale>, ListenerKey)>>,
        scale: Rc<dyn Scale>,
        axis: &str,
    ) -> bool {
        if !scale.kind().is_scatter() {
            reporting::error(
                ErrorCode::IncorrectScaleType,
                &format!("{axis} scale of a scatter series must be linear"),
            );
            return false;
        }
        if slot
            .borrow()
            .as_ref()
            .is_some_and(|(old, _)| old.bus().source() == scale.bus().source())
        {
            return true;
        }
        if let Some((old, key)) = slot.borrow_mut().take() {
            self.core.unsubscribe(old.bus(), key);
        }
        let weak = Rc::downgrade(&self.core);
        let key = self.core.subscribe(scale.bus(), move |e| {
            if let Some(core) = weak.upgrade() {
                on_scale_signal(&core, e);
            }
        });
        *slot.borrow_mut() = Some((scale, key));
        self.core.invalidate(
            ConsistencyState::APPEARANCE,
            Signal::NEEDS_RECALCULATION | Signal::NEEDS_REDRAW,
        );
        true
    }

    // --- geometry ---

    /// Returns the clipping.
    #[must_use]
    pub fn clip(&self) -> Clip {
        self.clip.get()
    }

    /// Sets the clipping.
    pub fn set_clip(&self, clip: impl Into<Clip>) {
        let clip = clip.into();
        if self.clip.replace(clip) != clip {
            self.core.invalidate(
                ConsistencyState::BOUNDS,
                Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED,
            );
        }
    }

    /// Space taken by axis lines at the plot edges.
    #[must_use]
    pub fn axes_lines_space(&self) -> Insets {
        self.axes_lines_space.get()
    }

    /// Sets the space taken by axis lines.
    pub fn set_axes_lines_space(&self, space: Insets) {
        if self.axes_lines_space.replace(space) != space {
            self.core
                .invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW);
        }
    }

    /// Clamps a vertical pixel coordinate inside the axis lines.
    #[must_use]
    pub fn apply_axes_lines_space(&self, y: f64) -> f64 {
        let Some(bounds) = self.core.pixel_bounds() else {
            return y;
        };
        let space = self.axes_lines_space.get();
        let top = bounds.y0 + space.y0;
        let bottom = bounds.y1 - space.y1;
        if top > bottom { y } else { y.clamp(top, bottom) }
    }

    /// Maps a scale ratio to pixels: left to right horizontally, bottom to top vertically.
    #[must_use]
    pub fn apply_ratio_to_bounds(&self, ratio: f64, horizontal: bool) -> f64 {
        let Some(bounds) = self.core.pixel_bounds() else {
            return f64::NAN;
        };
        if horizontal {
            bounds.x0 + ratio * bounds.width()
        } else {
            bounds.y1 - ratio * bounds.height()
        }
    }

    /// The pixel x of `value`, NaN when the x scale is missing or rejects it.
    #[must_use]
    pub fn transform_x(&self, value: &Value) -> f64 {
        self.transform(&self.x_scale, value, true)
    }

    /// The pixel y of `value`, NaN when the y scale is missing or rejects it.
    #[must_use]
    pub fn transform_y(&self, value: &Value) -> f64 {
        self.transform(&self.y_scale, value, false)
    }

    fn transform(
        &self,
        slot: &RefCell<Option<(Rc<dyn Scale>, ListenerKey)>>,
        value: &Value,
        horizontal: bool,
    ) -> f64 {
        match slot.borrow().as_ref() {
            Some((scale, _)) if !scale.is_missing(value) => {
                self.apply_ratio_to_bounds(scale.transform(value), horizontal)
            }
            _ => f64::NAN,
        }
    }

    /// The pixel position of the iterator's current row.
    ///
    /// `None` for a disabled series, a row without `x` or `value`, or a value the scales call
    /// missing.
    #[must_use]
    pub fn reference_coords(&self, iterator: &dyn DataIterator) -> Option<Point> {
        if !self.core.enabled() {
            return None;
        }
        let x = self.transform_x(&iterator.get("x")?);
        let y = self.transform_y(&iterator.get("value")?);
        (!x.is_nan() && !y.is_nan()).then(|| Point::new(x, y))
    }

    // --- statistics ---

    /// Recomputes and stores the statistics of the plottable points.
    pub fn calculate_statistics(&self) -> SeriesStatistics {
        let mut xs = Vec::new();
        let mut values = Vec::new();
        let mut sizes = Vec::new();
        if let Some(view) = self.data() {
            let mut it = view.iterator();
            while it.advance() {
                let number = |field: &str| it.get(field).map_or(f64::NAN, |v| v.to_number());
                let (x, value) = (number("x"), number("value"));
                if !x.is_finite() || !value.is_finite() {
                    continue;
                }
                xs.push(x);
                values.push(value);
                if self.kind.is_size_based() {
                    let size = number("size");
                    if size.is_finite() {
                        sizes.push(size);
                    }
                }
            }
        }
        let stats = SeriesStatistics {
            x: FieldStatistics::from_values(&xs),
            value: FieldStatistics::from_values(&values),
            size: FieldStatistics::from_values(&sizes),
        };
        self.statistics.set(stats);
        stats
    }

    /// Statistics as of the last `data` phase or [`calculate_statistics`](Self::calculate_statistics).
    #[must_use]
    pub fn statistics(&self) -> SeriesStatistics {
        self.statistics.get()
    }

    /// Pixel positions of the rows as of the last appearance repair.
    #[must_use]
    pub fn points(&self) -> Vec<Option<Point>> {
        self.points.borrow().clone()
    }

    /// Tokens available to label formats for the iterator's current row.
    #[must_use]
    pub fn format_context(&self, iterator: &dyn DataIterator) -> FormatContext {
        let field = |name: &str| iterator.get(name).unwrap_or(Value::Null);
        let mut context = FormatContext::new()
            .with("x", field("x"))
            .with("value", field("value"))
            .with("seriesName", self.name());
        if self.kind.is_size_based() {
            context = context.with("size", field("size"));
        }
        context
    }

    /// The legend entry of this series.
    #[must_use]
    pub fn legend_item(&self) -> LegendItem {
        LegendItem::new(self.name(), LegendCategory::Series, self.core.id())
            .with_icon(
                paint::fill(self.normal.get_option("fill").as_ref(), 1.0),
                paint::stroke(self.normal.get_option("stroke").as_ref(), 1.0),
            )
            .with_source_key(format!("series_{}", self.index))
    }

    // --- configuration ---

    /// Captures the explicitly set options.
    #[must_use]
    pub fn serialize(&self) -> ScatterSeriesConfig {
        let state = |group: &StateSettings| {
            let config = StateConfig::capture(group);
            (!config.is_empty()).then_some(config)
        };
        let labels = self.labels.serialize();
        ScatterSeriesConfig {
            series_type: Some(self.kind),
            name: self.settings.get_own_option("name"),
            marker_type: self.settings.get_own_option("markerType"),
            marker_size: self.settings.get_own_option("markerSize"),
            clip: Some(self.clip.get().into()),
            error: self.kind.supports_error().then(|| self.error.serialize()),
            labels: (!labels.is_empty()).then_some(labels),
            enabled: Some(self.core.enabled()),
            normal: state(&self.normal),
            hovered: state(&self.hovered),
            selected: state(&self.selected),
        }
    }

    /// Applies the present keys, dispatching at most one signal. `seriesType` is ignored.
    pub fn setup_by_json(&self, config: &ScatterSeriesConfig) {
        self.core.suspend_signals_dispatching();
        let set = |n: &str, v: OptionValue| self.settings.set_option(n, v);
        apply_option(set, "name", config.name.as_ref());
        apply_option(set, "markerType", config.marker_type.as_ref());
        apply_option(set, "markerSize", config.marker_size.as_ref());
        if let Some(error) = &config.error {
            self.error().setup_by_json(error);
        }
        if let Some(clip) = config.clip {
            self.set_clip(Clip::from(clip));
        }
        if let Some(labels) = &config.labels {
            self.labels.setup_by_json(labels);
        }
        for (group, state) in [
            (&self.normal, &config.normal),
            (&self.hovered, &config.hovered),
            (&self.selected, &config.selected),
        ] {
            if let Some(state) = state {
                state.apply(group);
            }
        }
        if let Some(enabled) = config.enabled {
            self.set_enabled(enabled);
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

    // --- drawing ---

    fn resolve(&self, name: &str, iterator: &dyn DataIterator) -> Option<OptionValue> {
        resolve_state_option(
            name,
            point_option(iterator, name).as_ref(),
            self.active.get(),
            StateGroups {
                normal: &self.normal,
                hovered: Some(&self.hovered),
                selected: Some(&self.selected),
            },
        )
    }

    fn marker_size(&self) -> f64 {
        self.get_option("markerSize")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    fn bubble_diameter(&self, size: f64) -> f64 {
        let (lo, hi) = self.bubble_size;
        let stats = self.statistics.get().size;
        let span = stats.max - stats.min;
        let radius = if span > 0.0 {
            lo + (size - stats.min) / span * (hi - lo)
        } else {
            (lo + hi) / 2.0
        };
        radius * 2.0
    }

    fn repair_appearance(&self, surface: &mut dyn Surface) -> Result<(), DrawError> {
        self.shapes.clear(surface);
        let Some(view) = self.data() else {
            self.points.borrow_mut().clear();
            return Ok(());
        };
        if self.x_scale.borrow().is_none() {
            return Err(DrawError::phase("appearance", "missing x scale"));
        }
        if self.y_scale.borrow().is_none() {
            return Err(DrawError::phase("appearance", "missing y scale"));
        }
        let Some(layer) = self.layer.get() else {
            return Ok(());
        };

        let symbol = self
            .get_option("markerType")
            .and_then(|v| v.as_str().and_then(Symbol::from_name))
            .unwrap_or_default();
        let mut points = Vec::with_capacity(view.row_count());
        let mut line = BezPath::new();
        let mut pen_down = false;
        let mut it = view.iterator();
        while it.advance() {
            let point = self.reference_coords(&it);
            points.push(point);
            let Some(point) = point else {
                pen_down = false;
                continue;
            };
            match self.kind {
                ScatterSeriesType::Line => {
                    let point = Point::new(point.x, self.apply_axes_lines_space(point.y));
                    if pen_down {
                        line.line_to(point);
                    } else {
                        line.move_to(point);
                        pen_down = true;
                    }
                }
                ScatterSeriesType::Marker | ScatterSeriesType::Bubble => {
                    let (shape, size) = if self.kind.is_size_based() {
                        let size = it.get("size").map_or(f64::NAN, |v| v.to_number());
                        if !size.is_finite() {
                            continue;
                        }
                        (Symbol::Circle, self.bubble_diameter(size))
                    } else {
                        (symbol, self.marker_size())
                    };
                    self.draw_point(surface, layer, &it, shape.path(point, size));
                }
            }
        }
        if !line.elements().is_empty() {
            let node = self.shapes.path(surface, layer);
            emit_path(surface, node, &line);
            surface.set_stroke(node, paint::stroke(self.resolve("stroke", &it).as_ref(), 1.0));
        }
        *self.points.borrow_mut() = points;

        let clip = self.clip.get().area(self.core.pixel_bounds());
        surface.set_clip(layer, clip);
        self.core.invalidate(
            ConsistencyState::SERIES_ERROR | ConsistencyState::SERIES_LABELS,
            Signal::NONE,
        );
        Ok(())
    }

    fn draw_point(
        &self,
        surface: &mut dyn Surface,
        layer: NodeId,
        iterator: &dyn DataIterator,
        path: BezPath,
    ) {
        let node = self.shapes.path(surface, layer);
        emit_path(surface, node, &path);
        surface.set_fill(node, paint::fill(self.resolve("fill", iterator).as_ref(), 1.0));
        let stroke = paint::stroke(self.resolve("stroke", iterator).as_ref(), 1.0);
        surface.set_stroke(node, stroke.clone());
        if let Some(hatch) = HatchFill::from_option(self.resolve("hatchFill", iterator).as_ref()) {
            let rect = path.bounding_box();
            let node = self.shapes.path(surface, layer);
            emit_lines(surface, node, &hatch.segments(rect, HATCH_SPACING));
            surface.set_stroke(node, stroke);
            surface.set_clip(node, Some(rect));
        }
    }

    fn repair_error(&self, surface: &mut dyn Surface) {
        self.error_paths.clear(surface);
        if !self.kind.supports_error() || !self.error.has_any_error_values() {
            return;
        }
        let (Some(layer), Some(view)) = (self.layer.get(), self.data()) else {
            return;
        };
        let mode = self.error.mode();
        let points = self.points.borrow();
        let mut it = view.iterator();
        while it.advance() {
            let Some(Some(center)) = it.index().and_then(|i| points.get(i).copied()) else {
                continue;
            };
            for horizontal in [true, false] {
                let shown = if horizontal {
                    mode.shows_x()
                } else {
                    mode.shows_value()
                };
                if !shown {
                    continue;
                }
                let (lower, upper) = self.error.error_values(horizontal, &it);
                if lower.is_nan() && upper.is_nan() {
                    continue;
                }
                let field = if horizontal { "x" } else { "value" };
                let base = it.get(field).map_or(f64::NAN, |v| v.to_number());
                let lower = if lower.is_nan() { 0.0 } else { lower };
                let upper = if upper.is_nan() { 0.0 } else { upper };
                let (from, to) = if horizontal {
                    (
                        Point::new(self.transform_x(&Value::Number(base - lower)), center.y),
                        Point::new(self.transform_x(&Value::Number(base + upper)), center.y),
                    )
                } else {
                    (
                        Point::new(center.x, self.transform_y(&Value::Number(base - lower))),
                        Point::new(center.x, self.transform_y(&Value::Number(base + upper))),
                    )
                };
                if from.x.is_nan() || from.y.is_nan() || to.x.is_nan() || to.y.is_nan() {
                    continue;
                }
                let node = self.error_paths.path(surface, layer);
                let lines = whiskers(horizontal, from, to, self.error.error_width(horizontal));
                emit_lines(surface, node, &lines);
                surface.set_stroke(node, self.error.error_stroke(horizontal, &it));
                surface.set_z_index(node, z_order::ERROR_PATHS - z_order::SERIES);
            }
        }
    }

    fn repair_labels(&self, surface: &mut dyn Surface) {
        self.label_nodes.clear(surface);
        let (Some(layer), Some(view)) = (self.layer.get(), self.data()) else {
            return;
        };
        if !self.labels.enabled() {
            return;
        }
        let points = self.points.borrow();
        let mut it = view.iterator();
        while it.advance() {
            let Some(Some(point)) = it.index().and_then(|i| points.get(i).copied()) else {
                continue;
            };
            let anchor = Point::new(point.x, point.y - self.labels.font_size());
            let context = self.format_context(&it);
            if let Some(node) = self
                .labels
                .draw(surface, &self.label_nodes, layer, &context, anchor)
            {
                surface.set_z_index(node, z_order::LABELS - z_order::SERIES);
            }
        }
    }
}

fn on_scale_signal(core: &ElementCore, event: &SignalEvent) {
    let mut signal = Signal::NONE;
    if event.has_signal(Signal::NEEDS_RECALCULATION) {
        signal |= Signal::NEEDS_RECALCULATION;
    }
    if event.has_signal(Signal::NEEDS_REAPPLICATION) {
        signal |= Signal::NEEDS_REDRAW;
    }
    if !signal.is_empty() {
        core.invalidate(ConsistencyState::APPEARANCE, signal);
    }
}

fn point_option(iterator: &dyn DataIterator, field: &str) -> Option<OptionValue> {
    match iterator.get(field)? {
        Value::Str(s) => Some(s.into()),
        Value::Number(n) => Some(n.into()),
        Value::Bool(b) => Some(b.into()),
        Value::Null => None,
    }
}

impl VisualElement for ScatterSeries {
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
        DrawScheduler::new(SERIES_PHASES).run(&self.core, |phase| {
            match phase.name {
                "data" => {
                    self.calculate_statistics();
                    self.core
                        .invalidate(ConsistencyState::APPEARANCE, Signal::NONE);
                }
                "bounds" => {
                    self.core
                        .invalidate(ConsistencyState::APPEARANCE, Signal::NONE);
                }
                "container" => {
                    self.layer.mount(surface, &self.core);
                }
                "appearance" => self.repair_appearance(surface)?,
                "error" => self.repair_error(surface),
                _ => self.repair_labels(surface),
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
        self.error_paths.clear(surface);
        self.label_nodes.clear(surface);
        self.layer.release(surface);
        self.error.dispose();
        self.labels.dispose();
        self.data.borrow_mut().take();
        self.x_scale.borrow_mut().take();
        self.y_scale.borrow_mut().take();
        self.core.dispose();
    }
}

impl HasError for ScatterSeries {
    type Settings = ErrorSettings;

    fn supports_error(&self) -> bool {
        self.kind.supports_error()
    }

    /// Returns the error settings, warning when the variant does not draw them.
    fn error(&self) -> &ErrorSettings {
        if !self.kind.supports_error() {
            reporting::warning(WarningCode::SeriesDoesntSupportError, self.kind.as_str());
        }
        &self.error
    }
}

impl HasMarkers for ScatterSeries {
    fn supports_markers(&self) -> bool {
        self.kind.supports_markers()
    }
}

impl HasScales for ScatterSeries {
    fn x_scale(&self) -> Option<Rc<dyn Scale>> {
        self.x_scale.borrow().as_ref().map(|(s, _)| s.clone())
    }

    fn y_scale(&self) -> Option<Rc<dyn Scale>> {
        self.y_scale.borrow().as_ref().map(|(s, _)| s.clone())
    }

    fn set_x_scale(&self, scale: Rc<dyn Scale>) -> bool {
        self.bind_scale(&self.x_scale, scale, "x")
    }

    fn set_y_scale(&self, scale: Rc<dyn Scale>) -> bool {
        self.bind_scale(&self.y_scale, scale, "y")
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use chartwell_core::{NodeKind, Recorder};
    use serde_json::json;

    use super::*;
    use crate::data::{DataSet, Mapping};
    use crate::scale::{LinearScale, OrdinalScale};

    fn log(core: &ElementCore) -> Rc<RefCell<Vec<Signal>>> {
        let signals = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&signals);
        core.listen_signals(move |e| s.borrow_mut().push(e.signal));
        signals
    }

    fn fixed(lo: f64, hi: f64) -> Rc<LinearScale> {
        let scale = LinearScale::new();
        scale.set_minimum(Some(lo));
        scale.set_maximum(Some(hi));
        scale
    }

    /// A series over `rows` with x in `[0, 4]`, value in `[0, 20]`, placed in 400x200.
    fn placed(kind: ScatterSeriesType, rows: Vec<Vec<Value>>, r: &mut Recorder) -> Rc<ScatterSeries> {
        let series = ScatterSeries::new(&Theme::default(), kind, 0);
        series.set_data(DataSet::new(rows).map_as(Mapping::x_value().field("size", 2)));
        series.set_x_scale(fixed(0.0, 4.0));
        series.set_y_scale(fixed(0.0, 20.0));
        series
            .core()
            .set_parent_bounds(Some(Rect::new(0.0, 0.0, 400.0, 200.0)));
        series.core().set_container(Some(r.layer()));
        series
    }

    fn paths(r: &Recorder, layer: NodeId) -> usize {
        r.children(layer)
            .into_iter()
            .filter(|n| matches!(r.node(*n).map(|n| &n.kind), Some(NodeKind::Path(_))))
            .count()
    }

    #[test]
    fn data_changes_reach_the_chart_as_recalculation() {
        let series = ScatterSeries::new(&Theme::default(), ScatterSeriesType::Marker, 0);
        let signals = log(series.core());
        let view = DataSet::new(vec![vec![1.0.into(), 2.0.into()]]).map_as(Mapping::x_value());
        series.set_data(view.clone());
        view.set_value(0, "value", 3.0);
        assert_eq!(
            *signals.borrow(),
            [
                Signal::NEEDS_RECALCULATION | Signal::NEEDS_REDRAW,
                Signal::NEEDS_RECALCULATION | Signal::DATA_CHANGED,
            ]
        );

        let other = DataSet::new(Vec::new()).map_as(Mapping::x_value());
        series.set_data(other);
        signals.borrow_mut().clear();
        view.set_value(0, "value", 4.0);
        assert!(signals.borrow().is_empty(), "old view is released");
    }

    #[test]
    fn ordinal_scales_are_rejected() {
        let series = ScatterSeries::new(&Theme::default(), ScatterSeriesType::Marker, 0);
        let linear = LinearScale::new();
        assert!(series.set_x_scale(linear.clone()));
        assert!(!series.set_x_scale(OrdinalScale::new()));
        let kept = series.x_scale().unwrap();
        assert_eq!(kept.bus().source(), linear.bus().source());
    }

    #[test]
    fn scale_signals_are_translated() {
        let series = ScatterSeries::new(&Theme::default(), ScatterSeriesType::Marker, 0);
        let y = LinearScale::new();
        series.set_y_scale(y.clone());
        series.core().mark_consistent(ConsistencyState::ALL);
        let signals = log(series.core());

        y.set_minimum(Some(-5.0));
        y.set_tick_count(10);
        assert_eq!(
            *signals.borrow(),
            [Signal::NEEDS_REDRAW, Signal::NEEDS_RECALCULATION]
        );
        assert_eq!(series.core().dirty_states(), ConsistencyState::APPEARANCE);

        let replacement = LinearScale::new();
        series.set_y_scale(replacement);
        signals.borrow_mut().clear();
        y.set_minimum(Some(-6.0));
        assert!(signals.borrow().is_empty(), "old scale is released");
    }

    #[test]
    fn reference_coords_skip_unplottable_rows() {
        let mut r = Recorder::new();
        let series = placed(
            ScatterSeriesType::Marker,
            vec![
                vec![1.0.into(), 10.0.into()],
                vec![Value::Null, 10.0.into()],
                vec![3.0.into(), "n/a".into()],
                vec![2.0.into()],
            ],
            &mut r,
        );
        let view = series.data().unwrap();
        let mut it = view.iterator();
        let mut coords = Vec::new();
        while it.advance() {
            coords.push(series.reference_coords(&it));
        }
        assert_eq!(coords, [Some(Point::new(100.0, 100.0)), None, None, None]);

        series.set_enabled(false);
        it.reset();
        it.advance();
        assert_eq!(series.reference_coords(&it), None);
    }

    #[test]
    fn statistics_cover_plottable_points() {
        let series = ScatterSeries::new(&Theme::default(), ScatterSeriesType::Bubble, 0);
        let rows = [(5.0, 1.0, 3.0), (2.0, 2.0, 1.0), (2.0, 3.0, 2.0), (1.0, 6.0, 6.0)]
            .into_iter()
            .map(|(x, v, s)| vec![x.into(), v.into(), s.into()])
            .chain([vec![Value::Null, 9.0.into(), 9.0.into()]])
            .collect();
        series.set_data(DataSet::new(rows).map_as(Mapping::x_value().field("size", 2)));

        let stats = series.calculate_statistics();
        assert_eq!(stats.x.count, 4);
        assert_eq!(stats.x.sum, 10.0);
        assert_eq!(stats.x.average, 2.5);
        assert_eq!(stats.x.median, 2.0);
        assert_eq!(stats.x.mode, 2.0);
        assert_eq!((stats.x.first, stats.x.last), (5.0, 1.0));
        assert_eq!((stats.value.min, stats.value.max), (1.0, 6.0));
        assert_eq!(stats.size.max, 6.0);
        assert_eq!(series.statistics(), stats);

        let empty = FieldStatistics::from_values(&[]);
        assert_eq!(empty.count, 0);
        assert!(empty.average.is_nan());
    }

    #[test]
    fn markers_draw_one_path_per_point() {
        let mut r = Recorder::new();
        let series = placed(
            ScatterSeriesType::Marker,
            vec![
                vec![1.0.into(), 10.0.into()],
                vec![Value::Null, 3.0.into()],
                vec![3.0.into(), 15.0.into()],
            ],
            &mut r,
        );
        series.draw(&mut r).unwrap();
        let layer = series.layer.get().unwrap();
        assert_eq!(paths(&r, layer), 2);
        assert_eq!(series.points()[1], None);
        assert_eq!(series.label_nodes.len(), 2);

        let before = series.core().repair_count();
        series.draw(&mut r).unwrap();
        assert_eq!(series.core().repair_count(), before);
    }

    #[test]
    fn lines_break_at_missing_points() {
        let mut r = Recorder::new();
        let series = placed(
            ScatterSeriesType::Line,
            vec![
                vec![0.0.into(), 0.0.into()],
                vec![1.0.into(), 5.0.into()],
                vec![2.0.into(), Value::Null],
                vec![3.0.into(), 10.0.into()],
            ],
            &mut r,
        );
        series.draw(&mut r).unwrap();
        let layer = series.layer.get().unwrap();
        let line = r
            .children(layer)
            .into_iter()
            .find_map(|n| match &r.node(n)?.kind {
                NodeKind::Path(p) => Some(p.clone()),
                _ => None,
            })
            .unwrap();
        let moves = line
            .elements()
            .iter()
            .filter(|e| matches!(e, kurbo::PathEl::MoveTo(_)))
            .count();
        assert_eq!(moves, 2);
    }

    #[test]
    fn missing_scale_fails_the_appearance_phase_only() {
        let mut r = Recorder::new();
        let series = ScatterSeries::new(&Theme::default(), ScatterSeriesType::Marker, 0);
        series.set_data(DataSet::new(vec![vec![1.0.into(), 1.0.into()]]).map_as(Mapping::x_value()));
        series.set_x_scale(LinearScale::new());
        series.core().set_container(Some(r.layer()));

        let err = series.draw(&mut r).unwrap_err();
        assert!(matches!(err, DrawError::Phase { phase: "appearance", .. }));
        assert!(!series.core().has_invalidation_state(ConsistencyState::SERIES_DATA));
        assert!(!series.core().has_invalidation_state(ConsistencyState::CONTAINER));
        assert!(series.core().has_invalidation_state(ConsistencyState::APPEARANCE));
    }

    #[test]
    fn error_bars_follow_the_variant() {
        let rows = || vec![vec![2.0.into(), 10.0.into(), 1.0.into()]];
        let mut r = Recorder::new();
        let marker = placed(ScatterSeriesType::Marker, rows(), &mut r);
        marker.error().set_option("valueError", 5.0);
        marker.error().set_mode(crate::error_bars::ErrorMode::Value);
        marker.draw(&mut r).unwrap();
        assert_eq!(marker.error_paths.len(), 1);
        let bar = match &r.node(marker.error_paths.nodes()[0]).unwrap().kind {
            NodeKind::Path(p) => p.bounding_box(),
            _ => unreachable!(),
        };
        assert_eq!((bar.y0, bar.y1), (50.0, 150.0));

        let bubble = placed(ScatterSeriesType::Bubble, rows(), &mut r);
        assert!(!bubble.supports_error());
        bubble.error().set_option("valueError", 5.0);
        bubble.draw(&mut r).unwrap();
        assert_eq!(bubble.error_paths.len(), 0);
        assert!(bubble.serialize().error.is_none());
    }

    #[test]
    fn error_changes_dirty_the_error_phase() {
        let series = ScatterSeries::new(&Theme::default(), ScatterSeriesType::Line, 0);
        series.core().mark_consistent(ConsistencyState::ALL);
        let signals = log(series.core());
        series.error().set_option("xError", "10%");
        assert!(series.core().has_invalidation_state(ConsistencyState::SERIES_ERROR));
        assert_eq!(
            *signals.borrow(),
            [Signal::NEEDS_RECALCULATION | Signal::NEEDS_REDRAW]
        );
    }

    #[test]
    fn clip_dirties_bounds_and_clips_the_layer() {
        let mut r = Recorder::new();
        let series = placed(
            ScatterSeriesType::Marker,
            vec![vec![1.0.into(), 1.0.into()]],
            &mut r,
        );
        series.draw(&mut r).unwrap();
        let signals = log(series.core());
        series.set_clip(true);
        assert_eq!(
            *signals.borrow(),
            [Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED]
        );
        series.draw(&mut r).unwrap();
        let layer = series.layer.get().unwrap();
        assert_eq!(
            r.node(layer).unwrap().clip,
            Some(Rect::new(0.0, 0.0, 400.0, 200.0))
        );
    }

    #[test]
    fn disabling_asks_for_rescale_and_legend_once() {
        let series = ScatterSeries::new(&Theme::default(), ScatterSeriesType::Marker, 0);
        let signals = log(series.core());
        series.set_enabled(false);
        assert_eq!(
            *signals.borrow(),
            [Signal::NEEDS_REDRAW | Signal::ENABLED_STATE_CHANGED | ENABLE_SIGNALS]
        );
        series.set_enabled(false);
        assert_eq!(signals.borrow().len(), 1);
    }

    #[test]
    fn hovered_fill_resolves_over_normal() {
        let mut r = Recorder::new();
        let series = placed(
            ScatterSeriesType::Marker,
            vec![vec![1.0.into(), 1.0.into()]],
            &mut r,
        );
        series.normal().set_option("fill", "red");
        series.hovered().set_option("fill", "blue");
        series.set_active_state(SettingsState::Hovered);
        series.draw(&mut r).unwrap();
        let shape = series.shapes.nodes()[0];
        assert_eq!(
            r.node(shape).unwrap().fill,
            paint::fill(Some(&"blue".into()), 1.0)
        );
    }

    #[test]
    fn config_round_trip() {
        let series = ScatterSeries::new(&Theme::default(), ScatterSeriesType::Line, 2);
        series
            .setup_by_json_value(&json!({
                "name": "Latency",
                "clip": { "left": 0.0, "top": 0.0, "width": 50.0, "height": 20.0 },
                "error": { "xError": 2.0 },
                "normal": { "stroke": "#ff0000 2" }
            }))
            .unwrap();
        let json = series.to_json().unwrap();
        assert_eq!(json["seriesType"], json!("line"));
        assert_eq!(json["error"]["xError"], json!(2.0));

        let copy = ScatterSeries::from_config(&Theme::default(), &series.serialize(), 2);
        assert_eq!(copy.kind(), ScatterSeriesType::Line);
        assert_eq!(copy.name(), "Latency");
        assert_eq!(copy.clip(), Clip::Rect(Rect::new(0.0, 0.0, 50.0, 20.0)));
        assert_eq!(copy.normal().get_option("stroke"), Some("#ff0000 2".into()));
        assert_eq!(copy.legend_item().text, "Latency");
    }
}
