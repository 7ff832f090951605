// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Waterfall chart.
//!
//! Each category moves a running sum by its value. The chart draws one floating column per
//! category from the sum before it to the sum after it, and lets its [`TotalsStorage`] insert
//! total columns that show the running sum at a chosen category.
//!
//! Children (the title and the totals storage) report through a translation table; the chart
//! repairs itself in [`CHART_PHASES`] order.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use chartwell_core::{
    AttachError, CHART_PHASES, Composite, ConfigError, ConsistencyState, DataIterator, DrawCheck,
    DrawError, DrawScheduler, ElementCore, ListenerKey, Scale, Signal, Surface, Theme, Translation, Value,
    VisualElement,
};
use hashbrown::HashMap;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::data::View;
use crate::label::{LabelConfig, LabelSettings};
use crate::layer::{NodePool, RootLayer};
use crate::legend::{LegendCategory, LegendItem};
use crate::paint;
use crate::scale::{LinearScale, OrdinalScale, category_key};
use crate::symbol::emit_rect;
use crate::text::{Text, TextConfig};
use crate::tooltip::{FormatContext, TextTooltip};
use crate::total::{Total, sum_numeric};
use crate::totals_storage::{TotalsStorage, TotalsStorageConfig};

const CHART_STATES: ConsistencyState = ConsistencyState::VISUAL_BASE
    .union(ConsistencyState::RECALCULATION)
    .union(ConsistencyState::SCALES)
    .union(ConsistencyState::CHART_SERIES)
    .union(ConsistencyState::CHART_LABELS)
    .union(ConsistencyState::CHART_LEGEND);
const CHART_SIGNALS: Signal = Signal::VISUAL_BASE
    .union(Signal::NEEDS_RECALCULATION)
    .union(Signal::NEED_UPDATE_LEGEND);

const RESCALE: ConsistencyState = ConsistencyState::RECALCULATION
    .union(ConsistencyState::SCALES)
    .union(ConsistencyState::CHART_SERIES)
    .union(ConsistencyState::CHART_LABELS);

const CHART_TRANSLATIONS: &[Translation] = &[
    Translation::new(Signal::NEEDS_RECALCULATION, RESCALE, Signal::NEEDS_REDRAW),
    Translation::new(
        Signal::NEEDS_REDRAW_APPEARANCE,
        ConsistencyState::CHART_SERIES.union(ConsistencyState::CHART_LABELS),
        Signal::NEEDS_REDRAW,
    ),
    Translation::new(
        Signal::NEEDS_REDRAW,
        ConsistencyState::CHART_SERIES,
        Signal::NEEDS_REDRAW,
    ),
    Translation::new(
        Signal::BOUNDS_CHANGED,
        ConsistencyState::BOUNDS.union(ConsistencyState::CHART_SERIES),
        Signal::NEEDS_REDRAW,
    ),
    Translation::new(
        Signal::NEED_UPDATE_LEGEND,
        ConsistencyState::CHART_LEGEND,
        Signal::NEEDS_REDRAW,
    ),
];

/// Gap between the title and the plot, in pixels.
const TITLE_GAP: f64 = 8.0;
/// Share of a category band taken by its column.
const COLUMN_WIDTH: f64 = 0.9;

/// One category of a waterfall: the running sum before and after its value.
#[derive(Clone, Debug, PartialEq)]
pub struct WaterfallColumn {
    /// Category key.
    pub category: String,
    /// Running sum before the category.
    pub start: f64,
    /// Running sum after the category.
    pub end: f64,
}

impl WaterfallColumn {
    /// The category's own value.
    #[must_use]
    pub fn diff(&self) -> f64 {
        self.end - self.start
    }

    /// Returns `true` for a non-negative value.
    #[must_use]
    pub fn is_increase(&self) -> bool {
        self.end >= self.start
    }
}

/// Serialized [`WaterfallChart`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallConfig {
    /// Title options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<TextConfig>,
    /// Column label options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<LabelConfig>,
    /// Totals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<TotalsStorageConfig>,
    /// Enabled flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// A waterfall chart.
pub struct WaterfallChart {
    core: Rc<ElementCore>,
    theme: Rc<Theme>,
    children: Composite,
    data: RefCell<Option<(Rc<View>, ListenerKey)>>,
    x_scale: Rc<OrdinalScale>,
    y_scale: Rc<LinearScale>,
    totals: Rc<TotalsStorage>,
    title: Rc<Text>,
    labels: LabelSettings,
    tooltip: Rc<TextTooltip>,
    columns: RefCell<Vec<WaterfallColumn>>,
    plot: Cell<Option<Rect>>,
    legend: RefCell<Vec<LegendItem>>,
    hovered: RefCell<Option<Rc<Total>>>,
    layer: RootLayer,
    shapes: NodePool,
    label_nodes: NodePool,
}

impl fmt::Debug for WaterfallChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaterfallChart")
            .field("core", &self.core)
            .field("children", &self.children)
            .field("columns", &self.columns.borrow().len())
            .finish_non_exhaustive()
    }
}

impl WaterfallChart {
    /// Creates an empty chart.
    pub fn new(theme: Rc<Theme>) -> Result<Rc<Self>, AttachError> {
        let core = ElementCore::new(CHART_STATES, CHART_SIGNALS);
        let children = Composite::new(&core, CHART_TRANSLATIONS);
        let x_scale = OrdinalScale::new();
        let y_scale = LinearScale::new();

        let totals = TotalsStorage::new(theme.clone());
        totals.set_scales(x_scale.clone(), y_scale.clone());
        let tooltip = TextTooltip::new();
        totals.set_tooltip(tooltip.clone());
        children.attach(totals.clone())?;

        let title = Text::new(&theme);
        children.attach(title.clone())?;

        let labels = LabelSettings::new(&theme);
        let weak = Rc::downgrade(&core);
        core.subscribe(labels.bus(), move |_| {
            if let Some(core) = weak.upgrade() {
                core.invalidate(ConsistencyState::CHART_LABELS, Signal::NEEDS_REDRAW);
            }
        });

        Ok(Rc::new(Self {
            core,
            theme,
            children,
            data: RefCell::new(None),
            x_scale,
            y_scale,
            totals,
            title,
            labels,
            tooltip,
            columns: RefCell::new(Vec::new()),
            plot: Cell::new(None),
            legend: RefCell::new(Vec::new()),
            hovered: RefCell::new(None),
            layer: RootLayer::default(),
            shapes: NodePool::default(),
            label_nodes: NodePool::default(),
        }))
    }

    /// Binds `view`, which maps `x` to the category and `value` to its change.
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
                core.invalidate(RESCALE, Signal::NEEDS_REDRAW);
            }
        });
        *self.data.borrow_mut() = Some((view, key));
        self.core.invalidate(RESCALE, Signal::NEEDS_REDRAW);
    }

    /// Returns the bound data.
    #[must_use]
    pub fn data(&self) -> Option<Rc<View>> {
        self.data.borrow().as_ref().map(|(view, _)| view.clone())
    }

    /// The category scale, including total categories.
    #[must_use]
    pub fn x_scale(&self) -> &Rc<OrdinalScale> {
        &self.x_scale
    }

    /// The value scale.
    #[must_use]
    pub fn y_scale(&self) -> &Rc<LinearScale> {
        &self.y_scale
    }

    /// The totals.
    #[must_use]
    pub fn totals(&self) -> &Rc<TotalsStorage> {
        &self.totals
    }

    /// The title.
    #[must_use]
    pub fn title(&self) -> &Rc<Text> {
        &self.title
    }

    /// Column label options.
    #[must_use]
    pub fn labels(&self) -> &LabelSettings {
        &self.labels
    }

    /// The tooltip shared by the totals.
    #[must_use]
    pub fn tooltip(&self) -> &Rc<TextTooltip> {
        &self.tooltip
    }

    /// Columns as of the last recalculation.
    #[must_use]
    pub fn columns(&self) -> Vec<WaterfallColumn> {
        self.columns.borrow().clone()
    }

    /// The plot area as of the last bounds repair.
    #[must_use]
    pub fn plot_bounds(&self) -> Option<Rect> {
        self.plot.get()
    }

    /// Legend items as of the last legend repair.
    #[must_use]
    pub fn legend_items(&self) -> Vec<LegendItem> {
        self.legend.borrow().clone()
    }

    /// The running sum shown by the total occupying `total_x`: every value up to and including
    /// the total's `x` category.
    ///
    /// `None` if no total has that key or its `x` is not a category of the data.
    pub fn total_value(&self, total_x: &str) -> Option<f64> {
        let total = self
            .totals
            .all_totals()
            .into_iter()
            .find(|t| t.total_x() == total_x)?;
        let x = total.x()?;
        let view = self.data()?;
        let mut rows = Vec::new();
        let mut it = view.iterator();
        let mut found = false;
        while it.advance() {
            let category = it.get("x").and_then(|v| category_key(&v));
            rows.push(Vec::from([it.get("value").unwrap_or(Value::Null)]));
            if category.as_deref() == Some(x.as_str()) {
                found = true;
                break;
            }
        }
        found.then(|| sum_numeric(&rows))
    }

    /// Hovers the total under `point`, if any. Returns `true` when a total is hovered.
    pub fn pointer_move(&self, surface: &mut dyn Surface, point: Point) -> Result<bool, DrawError> {
        let hit = self
            .totals
            .all_totals()
            .into_iter()
            .find(|t| t.contains(point));
        let previous = self.hovered.borrow_mut().take();
        if let Some(previous) = previous
            && hit
                .as_ref()
                .is_none_or(|t| t.core().id() != previous.core().id())
        {
            previous.pointer_out(surface)?;
        }
        let Some(total) = hit else {
            return Ok(false);
        };
        total.pointer_move(surface, point)?;
        *self.hovered.borrow_mut() = Some(total);
        Ok(true)
    }

    /// Ends any hover.
    pub fn pointer_out(&self, surface: &mut dyn Surface) -> Result<(), DrawError> {
        let previous = self.hovered.borrow_mut().take();
        if let Some(previous) = previous {
            previous.pointer_out(surface)?;
        }
        Ok(())
    }

    /// Captures the explicitly set options.
    #[must_use]
    pub fn serialize(&self) -> WaterfallConfig {
        let title = self.title.serialize();
        let labels = self.labels.serialize();
        let totals = self.totals.serialize();
        WaterfallConfig {
            title: (title != TextConfig::default()).then_some(title),
            labels: (!labels.is_empty()).then_some(labels),
            totals: (!totals.items.is_empty()).then_some(totals),
            enabled: Some(self.core.enabled()),
        }
    }

    /// Applies the present keys, dispatching at most one signal.
    pub fn setup_by_json(&self, config: &WaterfallConfig) -> Result<(), AttachError> {
        self.core.suspend_signals_dispatching();
        if let Some(title) = &config.title {
            self.title.setup_by_json(title);
        }
        if let Some(labels) = &config.labels {
            self.labels.setup_by_json(labels);
        }
        let totals = config
            .totals
            .as_ref()
            .map_or(Ok(()), |t| self.totals.setup_by_json(t));
        if let Some(enabled) = config.enabled {
            self.core.set_enabled(enabled);
        }
        self.core.resume_signals_dispatching(true);
        totals
    }

    /// Applies a JSON object.
    pub fn setup_by_json_value(&self, value: &serde_json::Value) -> Result<(), ConfigError> {
        let config: WaterfallConfig = config::from_json(value)?;
        self.setup_by_json(&config)
            .map_err(|e| ConfigError::new(format!("{e}")))
    }

    /// Returns the serialized options as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, ConfigError> {
        config::to_json(&self.serialize())
    }

    // --- repair ---

    fn recalculate(&self) {
        let mut columns = Vec::new();
        let mut sums = HashMap::new();
        if let Some(view) = self.data() {
            let mut running = 0.0;
            let mut it = view.iterator();
            while it.advance() {
                let Some(category) = it.get("x").and_then(|v| category_key(&v)) else {
                    continue;
                };
                let value = it.get("value").map_or(f64::NAN, |v| v.to_number());
                let start = running;
                if value.is_finite() {
                    running += value;
                }
                sums.entry(category.clone()).or_insert(running);
                columns.push(WaterfallColumn {
                    category,
                    start,
                    end: running,
                });
            }
        }

        let categories: Vec<String> = columns.iter().map(|c| c.category.clone()).collect();
        let values = self
            .totals
            .all_totals()
            .iter()
            .filter_map(|t| {
                let sum = sums.get(&t.x()?)?;
                Some((t.total_x(), *sum))
            })
            .collect();
        self.x_scale
            .set_values(self.totals.populate_by_totals(&categories));
        self.totals.set_values(values);
        tracing::debug!(columns = columns.len(), "waterfall recalculated");
        *self.columns.borrow_mut() = columns;
    }

    fn calculate_scales(&self) {
        self.y_scale.start_auto_calc();
        self.y_scale.extend_data_range(0.0);
        for column in self.columns.borrow().iter() {
            self.y_scale.extend_data_range(column.start);
            self.y_scale.extend_data_range(column.end);
        }
        for total in self.totals.all_totals() {
            if total.core().enabled() {
                self.y_scale.extend_data_range(total.value());
            }
        }
        self.y_scale.finish_auto_calc();
        // Placement of every total depends on the domain.
        self.totals
            .core()
            .invalidate(ConsistencyState::TOTALS_VALUES, Signal::NONE);
    }

    fn layout(&self, surface: &mut dyn Surface) -> Result<(), DrawError> {
        let layer = self.layer.mount(surface, &self.core);
        let Some(bounds) = self.core.pixel_bounds() else {
            self.plot.set(None);
            return Ok(());
        };
        self.title.core().without_dispatch(|| {
            self.title.core().set_container(Some(layer));
            self.title.core().set_parent_bounds(Some(bounds));
        });
        let mut plot = bounds;
        if self.title.core().enabled() && !self.title.text().is_empty() {
            self.title.draw(surface)?;
            if let Some(title) = self.title.measured_bounds() {
                plot.y0 = (title.y1 + TITLE_GAP).min(plot.y1);
            }
        }
        self.plot.set(Some(plot));
        self.totals.core().without_dispatch(|| {
            self.totals.core().set_container(Some(layer));
            self.totals.core().set_parent_bounds(Some(plot));
        });
        Ok(())
    }

    fn column_rect(&self, column: &WaterfallColumn, plot: Rect) -> Option<Rect> {
        let ratio = self.x_scale.transform(&Value::Str(column.category.clone()));
        if !ratio.is_finite() {
            return None;
        }
        let band = self.x_scale.point_width_ratio() * plot.width();
        let width = band * COLUMN_WIDTH;
        let left = plot.x0 + ratio * plot.width() + (band - width) / 2.0;
        let y = |v: f64| plot.y1 - self.y_scale.transform(&Value::Number(v)) * plot.height();
        Some(Rect::new(left, y(column.start), left + width, y(column.end)).abs())
    }

    fn draw_series(&self, surface: &mut dyn Surface) -> Result<(), DrawError> {
        self.shapes.clear(surface);
        if let (Some(layer), Some(plot)) = (self.layer.get(), self.plot.get()) {
            let palette = &self.theme.series;
            for column in self.columns.borrow().iter() {
                let Some(rect) = self.column_rect(column, plot) else {
                    continue;
                };
                let color = if column.is_increase() {
                    self.theme.series.palette_color(0)
                } else {
                    self.theme.series.palette_color(1)
                };
                let node = self.shapes.path(surface, layer);
                emit_rect(
                    surface,
                    node,
                    [
                        Point::new(rect.x0, rect.y0),
                        Point::new(rect.x1, rect.y0),
                        Point::new(rect.x1, rect.y1),
                        Point::new(rect.x0, rect.y1),
                    ],
                );
                surface.set_fill(node, paint::fill(Some(&color.into()), 1.0));
                surface.set_stroke(
                    node,
                    paint::stroke(
                        Some(&format!("{color} {}", palette.stroke_width).into()),
                        1.0,
                    ),
                );
            }
        }
        self.children.draw_children(surface)?;
        Ok(())
    }

    fn draw_labels(&self, surface: &mut dyn Surface) {
        self.label_nodes.clear(surface);
        let (Some(layer), Some(plot)) = (self.layer.get(), self.plot.get()) else {
            return;
        };
        for column in self.columns.borrow().iter() {
            let Some(rect) = self.column_rect(column, plot) else {
                continue;
            };
            let context = FormatContext::new()
                .with("x", column.category.as_str())
                .with("value", column.diff())
                .with("sum", column.end);
            let anchor = Point::new(rect.center().x, rect.y0 - self.labels.font_size());
            if let Some(node) = self
                .labels
                .draw(surface, &self.label_nodes, layer, &context, anchor)
            {
                surface.set_z_index(node, crate::z_order::LABELS);
            }
        }
    }

    fn update_legend(&self) {
        let series = &self.theme.series;
        let item = |text: &str, index: usize| {
            let color = self.theme.series.palette_color(index);
            LegendItem::new(text, LegendCategory::Series, self.core.id())
                .with_icon(
                    paint::fill(Some(&color.into()), 1.0),
                    paint::stroke(
                        Some(&format!("{color} {}", series.stroke_width).into()),
                        1.0,
                    ),
                )
                .with_source_key(text.to_lowercase())
        };
        let mut items = Vec::from([item("Increase", 0), item("Decrease", 1)]);
        if self.totals.all_totals().iter().any(|t| t.core().enabled()) {
            items.push(self.totals.legend_item());
        }
        *self.legend.borrow_mut() = items;
    }
}

impl VisualElement for WaterfallChart {
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
        DrawScheduler::new(CHART_PHASES).run(&self.core, |phase| {
            match phase.name {
                "recalculation" => self.recalculate(),
                "scales" => self.calculate_scales(),
                "bounds" => self.layout(surface)?,
                "series" => self.draw_series(surface)?,
                "labels" => self.draw_labels(surface),
                _ => self.update_legend(),
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
        self.label_nodes.clear(surface);
        self.children.dispose_children(surface);
        self.layer.release(surface);
        self.labels.dispose();
        self.data.borrow_mut().take();
        self.core.dispose();
    }
}
