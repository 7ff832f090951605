// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scatter chart: a set of [`ScatterSeries`] sharing two linear scales.

use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use chartwell_core::{
    AttachError, CHART_PHASES, Composite, ConfigError, ConsistencyState, DrawCheck, DrawError,
    DrawScheduler, ElementCore, HasScales, Signal, Surface, Theme, Translation, VisualElement,
};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::layer::RootLayer;
use crate::legend::LegendItem;
use crate::scale::LinearScale;
use crate::series::{ScatterSeries, ScatterSeriesConfig, ScatterSeriesType};

const CHART_STATES: ConsistencyState = ConsistencyState::VISUAL_BASE
    .union(ConsistencyState::RECALCULATION)
    .union(ConsistencyState::SCALES)
    .union(ConsistencyState::CHART_SERIES)
    .union(ConsistencyState::CHART_LEGEND);
const CHART_SIGNALS: Signal = Signal::VISUAL_BASE.union(Signal::NEED_UPDATE_LEGEND);

const RESCALE: ConsistencyState = ConsistencyState::RECALCULATION
    .union(ConsistencyState::SCALES)
    .union(ConsistencyState::CHART_SERIES);

const CHART_TRANSLATIONS: &[Translation] = &[
    Translation::new(
        Signal::NEEDS_RECALCULATION.union(Signal::DATA_CHANGED),
        RESCALE,
        Signal::NEEDS_REDRAW,
    ),
    Translation::new(
        Signal::NEEDS_REDRAW.union(Signal::BOUNDS_CHANGED),
        ConsistencyState::CHART_SERIES,
        Signal::NEEDS_REDRAW,
    ),
    Translation::new(
        Signal::NEED_UPDATE_LEGEND,
        ConsistencyState::CHART_LEGEND,
        Signal::NEEDS_REDRAW,
    ),
    Translation::new(
        Signal::ENABLED_STATE_CHANGED,
        ConsistencyState::CHART_SERIES.union(ConsistencyState::CHART_LEGEND),
        Signal::NEEDS_REDRAW,
    ),
];

/// Serialized [`ScatterChart`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScatterChartConfig {
    /// Series in drawing order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<ScatterSeriesConfig>,
    /// Enabled flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// A scatter chart.
pub struct ScatterChart {
    core: Rc<ElementCore>,
    theme: Rc<Theme>,
    children: Composite,
    series: RefCell<Vec<Rc<ScatterSeries>>>,
    removed: RefCell<Vec<Rc<ScatterSeries>>>,
    next_index: Cell<usize>,
    x_scale: Rc<LinearScale>,
    y_scale: Rc<LinearScale>,
    legend: RefCell<Vec<LegendItem>>,
    layer: RootLayer,
}

impl fmt::Debug for ScatterChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScatterChart")
            .field("core", &self.core)
            .field("series", &self.series.borrow().len())
            .field("x_scale", &self.x_scale.domain())
            .field("y_scale", &self.y_scale.domain())
            .finish_non_exhaustive()
    }
}

impl ScatterChart {
    /// Creates a chart without series.
    #[must_use]
    pub fn new(theme: Rc<Theme>) -> Rc<Self> {
        let core = ElementCore::new(CHART_STATES, CHART_SIGNALS);
        let children = Composite::new(&core, CHART_TRANSLATIONS);
        Rc::new(Self {
            core,
            theme,
            children,
            series: RefCell::new(Vec::new()),
            removed: RefCell::new(Vec::new()),
            next_index: Cell::new(0),
            x_scale: LinearScale::new(),
            y_scale: LinearScale::new(),
            legend: RefCell::new(Vec::new()),
            layer: RootLayer::default(),
        })
    }

    /// The shared x scale.
    #[must_use]
    pub fn x_scale(&self) -> &Rc<LinearScale> {
        &self.x_scale
    }

    /// The shared y scale.
    #[must_use]
    pub fn y_scale(&self) -> &Rc<LinearScale> {
        &self.y_scale
    }

    /// Adds a series of `kind` bound to the chart's scales.
    pub fn add_series(&self, kind: ScatterSeriesType) -> Result<Rc<ScatterSeries>, AttachError> {
        let series = ScatterSeries::new(&self.theme, kind, self.next_index.get());
        self.adopt(series)
    }

    /// Adds a series described by a JSON object. `seriesType` picks the variant.
    pub fn add_series_json(
        &self,
        value: &serde_json::Value,
    ) -> Result<Rc<ScatterSeries>, ConfigError> {
        let config: ScatterSeriesConfig = config::from_json(value)?;
        self.add_series_config(&config)
            .map_err(|e| ConfigError::new(format!("{e}")))
    }

    fn add_series_config(
        &self,
        config: &ScatterSeriesConfig,
    ) -> Result<Rc<ScatterSeries>, AttachError> {
        let series = ScatterSeries::from_config(&self.theme, config, self.next_index.get());
        self.adopt(series)
    }

    fn adopt(&self, series: Rc<ScatterSeries>) -> Result<Rc<ScatterSeries>, AttachError> {
        if !self.core.ensure_alive("add_series") {
            return Err(AttachError::Disposed);
        }
        series.core().without_dispatch(|| {
            series.set_x_scale(self.x_scale.clone());
            series.set_y_scale(self.y_scale.clone());
        });
        self.children.attach(series.clone())?;
        self.next_index.set(self.next_index.get() + 1);
        self.series.borrow_mut().push(series.clone());
        self.core.invalidate(
            RESCALE | ConsistencyState::BOUNDS | ConsistencyState::CHART_LEGEND,
            Signal::NEEDS_REDRAW,
        );
        Ok(series)
    }

    /// Detaches the series at `index`. Its nodes are released on the next draw.
    pub fn remove_series_at(&self, index: usize) -> Option<Rc<ScatterSeries>> {
        if index >= self.series.borrow().len() {
            return None;
        }
        let series = self.series.borrow_mut().remove(index);
        if let Err(e) = self.children.detach(series.core().id()) {
            tracing::warn!(error = %e, "series was not a child of the chart");
        }
        self.removed.borrow_mut().push(series.clone());
        self.core.invalidate(
            RESCALE | ConsistencyState::CHART_LEGEND,
            Signal::NEEDS_REDRAW,
        );
        Some(series)
    }

    /// The series at `index`.
    #[must_use]
    pub fn series_at(&self, index: usize) -> Option<Rc<ScatterSeries>> {
        self.series.borrow().get(index).cloned()
    }

    /// Number of series.
    #[must_use]
    pub fn series_count(&self) -> usize {
        self.series.borrow().len()
    }

    /// Every series in drawing order.
    #[must_use]
    pub fn all_series(&self) -> Vec<Rc<ScatterSeries>> {
        self.series.borrow().clone()
    }

    /// Legend items as of the last legend repair.
    #[must_use]
    pub fn legend_items(&self) -> Vec<LegendItem> {
        self.legend.borrow().clone()
    }

    /// Captures every series.
    #[must_use]
    pub fn serialize(&self) -> ScatterChartConfig {
        ScatterChartConfig {
            series: self.series.borrow().iter().map(|s| s.serialize()).collect(),
            enabled: Some(self.core.enabled()),
        }
    }

    /// Adds one series per item, dispatching at most one signal.
    pub fn setup_by_json(&self, config: &ScatterChartConfig) -> Result<(), AttachError> {
        self.core.suspend_signals_dispatching();
        let added = config
            .series
            .iter()
            .try_for_each(|item| self.add_series_config(item).map(|_| ()));
        if let Some(enabled) = config.enabled {
            self.core.set_enabled(enabled);
        }
        self.core.resume_signals_dispatching(true);
        added
    }

    /// Applies a JSON object.
    pub fn setup_by_json_value(&self, value: &serde_json::Value) -> Result<(), ConfigError> {
        let config: ScatterChartConfig = config::from_json(value)?;
        self.setup_by_json(&config)
            .map_err(|e| ConfigError::new(format!("{e}")))
    }

    /// Returns the serialized chart as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, ConfigError> {
        config::to_json(&self.serialize())
    }

    fn enabled_series(&self) -> Vec<Rc<ScatterSeries>> {
        self.series
            .borrow()
            .iter()
            .filter(|s| s.core().enabled())
            .cloned()
            .collect()
    }

    fn calculate_scales(&self) {
        self.x_scale.start_auto_calc();
        self.y_scale.start_auto_calc();
        for series in self.enabled_series() {
            let stats = series.statistics();
            if stats.x.count == 0 {
                continue;
            }
            self.x_scale.extend_data_range(stats.x.min);
            self.x_scale.extend_data_range(stats.x.max);
            self.y_scale.extend_data_range(stats.value.min);
            self.y_scale.extend_data_range(stats.value.max);
        }
        let x_moved = self.x_scale.finish_auto_calc();
        let y_moved = self.y_scale.finish_auto_calc();
        if x_moved || y_moved {
            tracing::debug!(x = ?self.x_scale.domain(), y = ?self.y_scale.domain(), "rescaled");
            for series in self.series.borrow().iter() {
                series
                    .core()
                    .invalidate(ConsistencyState::APPEARANCE, Signal::NONE);
            }
        }
    }

    fn place_series(&self, surface: &mut dyn Surface) {
        let layer = self.layer.mount(surface, &self.core);
        let bounds = self.core.pixel_bounds();
        for series in self.series.borrow().iter() {
            series.core().without_dispatch(|| {
                series.core().set_container(Some(layer));
                series.core().set_parent_bounds(bounds);
            });
        }
    }

    fn draw_series(&self, surface: &mut dyn Surface) -> Result<(), DrawError> {
        for series in self.removed.borrow_mut().drain(..) {
            series.dispose(surface);
        }
        self.children.draw_children(surface)?;
        Ok(())
    }
}

impl VisualElement for ScatterChart {
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
                "recalculation" => {
                    for series in self.enabled_series() {
                        series.calculate_statistics();
                    }
                }
                "scales" => self.calculate_scales(),
                "bounds" => self.place_series(surface),
                "series" => self.draw_series(surface)?,
                "legend" => {
                    *self.legend.borrow_mut() = self
                        .enabled_series()
                        .iter()
                        .map(|s| s.legend_item())
                        .collect();
                }
                _ => {}
            }
            Ok::<(), DrawError>(())
        })?;
        Ok(())
    }

    fn remove(&self, surface: &mut dyn Surface) {
        self.layer.detach(surface);
    }

    fn dispose(&self, surface: &mut dyn Surface) {
        for series in self.removed.borrow_mut().drain(..) {
            series.dispose(surface);
        }
        self.series.borrow_mut().clear();
        self.children.dispose_children(surface);
        self.layer.release(surface);
        self.core.dispose();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use chartwell_core::{Recorder, Value};
    use kurbo::Rect;
    use serde_json::json;

    use super::*;
    use crate::data::{DataSet, Mapping};

    fn rows(points: &[(f64, f64)]) -> Vec<Vec<Value>> {
        points
            .iter()
            .map(|(x, y)| Vec::from([Value::from(*x), Value::from(*y)]))
            .collect()
    }

    fn chart(r: &mut Recorder) -> Rc<ScatterChart> {
        let chart = ScatterChart::new(Rc::new(Theme::default()));
        chart.core().set_container(Some(r.layer()));
        chart
            .core()
            .set_parent_bounds(Some(Rect::new(0.0, 0.0, 400.0, 300.0)));
        chart
    }

    fn with_data(chart: &ScatterChart, points: &[(f64, f64)]) -> Rc<ScatterSeries> {
        let series = chart.add_series(ScatterSeriesType::Marker).unwrap();
        series.set_data(DataSet::new(rows(points)).map_as(Mapping::x_value()));
        series
    }

    fn log(core: &ElementCore) -> Rc<RefCell<Vec<Signal>>> {
        let signals = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&signals);
        core.listen_signals(move |e| s.borrow_mut().push(e.signal));
        signals
    }

    #[test]
    fn scales_cover_every_enabled_series() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        with_data(&chart, &[(1.0, 2.0), (3.0, 4.0)]);
        let wide = with_data(&chart, &[(0.0, 0.0), (100.0, 50.0)]);
        chart.draw(&mut r).unwrap();
        let (lo, hi) = chart.x_scale().domain();
        assert!(lo <= 0.0 && hi >= 100.0);

        wide.set_enabled(false);
        assert!(
            chart
                .core()
                .has_invalidation_state(ConsistencyState::RECALCULATION)
        );
        chart.draw(&mut r).unwrap();
        let (lo, hi) = chart.x_scale().domain();
        assert!(lo <= 1.0 && hi >= 3.0 && hi < 100.0);
        assert_eq!(chart.legend_items().len(), 1);
    }

    #[test]
    fn series_points_use_the_chart_bounds() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        let series = with_data(&chart, &[(0.0, 0.0), (10.0, 10.0)]);
        chart.x_scale().set_minimum(Some(0.0));
        chart.x_scale().set_maximum(Some(10.0));
        chart.y_scale().set_minimum(Some(0.0));
        chart.y_scale().set_maximum(Some(10.0));
        chart.draw(&mut r).unwrap();
        assert_eq!(
            series.points(),
            [Some(kurbo::Point::new(0.0, 300.0)), Some(kurbo::Point::new(400.0, 0.0))]
        );
    }

    #[test]
    fn data_edits_rescale() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        let series = with_data(&chart, &[(1.0, 1.0), (2.0, 2.0)]);
        chart.draw(&mut r).unwrap();
        assert!(chart.core().is_consistent());

        let signals = log(chart.core());
        series.data().unwrap().set_value(1, "value", 500.0);
        assert!(chart.core().has_invalidation_state(ConsistencyState::SCALES));
        assert_eq!(*signals.borrow(), [Signal::NEEDS_REDRAW]);
        chart.draw(&mut r).unwrap();
        assert!(chart.y_scale().domain().1 >= 500.0);
    }

    #[test]
    fn explicit_domain_redraws_without_recalculation() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        with_data(&chart, &[(1.0, 1.0), (2.0, 2.0)]);
        chart.draw(&mut r).unwrap();

        chart.y_scale().set_inverted(true);
        assert!(
            chart
                .core()
                .has_invalidation_state(ConsistencyState::CHART_SERIES)
        );
        assert!(
            !chart
                .core()
                .has_invalidation_state(ConsistencyState::RECALCULATION)
        );
    }

    #[test]
    fn removed_series_release_their_nodes() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        with_data(&chart, &[(1.0, 1.0)]);
        let second = with_data(&chart, &[(2.0, 2.0)]);
        chart.draw(&mut r).unwrap();
        let live = r.live_count();

        let removed = chart.remove_series_at(1).unwrap();
        assert!(Rc::ptr_eq(&removed, &second));
        assert_eq!(chart.series_count(), 1);
        assert!(chart.remove_series_at(5).is_none());
        chart.draw(&mut r).unwrap();
        assert!(r.live_count() < live);
        assert!(second.core().is_disposed());
    }

    #[test]
    fn json_series_pick_their_variant() {
        let chart = ScatterChart::new(Rc::new(Theme::default()));
        let bubble = chart
            .add_series_json(&json!({ "seriesType": "bubble", "name": "Sizes" }))
            .unwrap();
        assert_eq!(bubble.kind(), ScatterSeriesType::Bubble);
        assert_eq!(bubble.name(), "Sizes");
        assert!(chart.add_series_json(&json!({ "seriesType": 3 })).is_err());

        let copy = ScatterChart::new(Rc::new(Theme::default()));
        copy.setup_by_json(&chart.serialize()).unwrap();
        assert_eq!(copy.series_count(), 1);
        assert_eq!(copy.series_at(0).unwrap().name(), "Sizes");
    }
}
