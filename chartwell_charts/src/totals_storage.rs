// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The totals of a waterfall chart.
//!
//! [`TotalsStorage`] owns every [`Total`] of a chart. It inserts their categories into the x
//! axis, places them from the chart's scales and draws them into one layer.
//!
//! A total that changes its `x` asks for recalculation, since the category list moves. Paint,
//! bounds and enabled changes only ask for an appearance redraw.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use chartwell_core::{
    AttachError, Composite, ConfigError, ConsistencyState, DrawCheck, DrawError, DrawScheduler,
    ElementCore, Phase, Scale, Signal, Surface, Theme, Translation, Value, VisualElement,
};
use hashbrown::HashMap;
use kurbo::Rect;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::layer::RootLayer;
use crate::legend::{LegendCategory, LegendItem};
use crate::paint;
use crate::scale::{LinearScale, OrdinalScale};
use crate::tooltip::Tooltip;
use crate::total::{DrawingData, Total, TotalConfig};
use crate::z_order;

const STORAGE_STATES: ConsistencyState =
    ConsistencyState::VISUAL_BASE.union(ConsistencyState::TOTALS_VALUES);
const STORAGE_SIGNALS: Signal = Signal::VISUAL_BASE
    .union(Signal::NEEDS_REDRAW_APPEARANCE)
    .union(Signal::NEEDS_RECALCULATION);

const STORAGE_TRANSLATIONS: &[Translation] = &[
    // Disabled totals leave the categories, so toggling one recalculates the chart.
    Translation::new(
        Signal::NEEDS_RECALCULATION.union(Signal::ENABLED_STATE_CHANGED),
        ConsistencyState::TOTALS_VALUES,
        Signal::NEEDS_RECALCULATION,
    ),
    Translation::new(
        Signal::NEEDS_REDRAW_APPEARANCE
            .union(Signal::BOUNDS_CHANGED)
            .union(Signal::ENABLED_STATE_CHANGED),
        ConsistencyState::APPEARANCE,
        Signal::NEEDS_REDRAW_APPEARANCE,
    ),
];

const STORAGE_PHASES: &[Phase] = &[
    Phase::new(
        ConsistencyState::CONTAINER.union(ConsistencyState::Z_INDEX),
        "container",
    ),
    Phase::new(
        ConsistencyState::TOTALS_VALUES.union(ConsistencyState::BOUNDS),
        "values",
    ),
    Phase::new(ConsistencyState::APPEARANCE, "appearance"),
];

/// Serialized [`TotalsStorage`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalsStorageConfig {
    /// One entry per total, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<TotalConfig>,
}

/// Owns and draws the totals of one chart.
pub struct TotalsStorage {
    core: Rc<ElementCore>,
    theme: Rc<Theme>,
    children: Composite,
    totals: RefCell<Vec<Rc<Total>>>,
    removed: RefCell<Vec<Rc<Total>>>,
    values: RefCell<HashMap<String, f64>>,
    x_scale: RefCell<Option<Rc<OrdinalScale>>>,
    y_scale: RefCell<Option<Rc<LinearScale>>>,
    tooltip: RefCell<Option<Rc<dyn Tooltip>>>,
    layer: RootLayer,
}

impl fmt::Debug for TotalsStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TotalsStorage")
            .field("core", &self.core)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl TotalsStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new(theme: Rc<Theme>) -> Rc<Self> {
        let core = ElementCore::new(STORAGE_STATES, STORAGE_SIGNALS);
        core.set_z_index(z_order::TOTALS);
        let children = Composite::new(&core, STORAGE_TRANSLATIONS);
        Rc::new(Self {
            core,
            theme,
            children,
            totals: RefCell::new(Vec::new()),
            removed: RefCell::new(Vec::new()),
            values: RefCell::new(HashMap::new()),
            x_scale: RefCell::new(None),
            y_scale: RefCell::new(None),
            tooltip: RefCell::new(None),
            layer: RootLayer::default(),
        })
    }

    /// Creates a total from `config` and takes ownership of it.
    ///
    /// The config is applied with the new total's signals suspended and discarded; the storage
    /// then asks for recalculation once.
    pub fn add_total(&self, config: &TotalConfig) -> Result<Rc<Total>, AttachError> {
        let total = Total::new(&self.theme);
        total.core().suspend_signals_dispatching();
        total.setup_by_json(config);
        total.core().resume_signals_dispatching(false);

        self.children.attach(total.clone())?;
        if let Some(tooltip) = self.tooltip.borrow().clone() {
            total.set_tooltip(tooltip);
        }
        self.totals.borrow_mut().push(total.clone());
        self.core.invalidate(
            ConsistencyState::TOTALS_VALUES | ConsistencyState::APPEARANCE,
            Signal::NEEDS_RECALCULATION | Signal::NEEDS_REDRAW_APPEARANCE,
        );
        Ok(total)
    }

    /// Parses `value` as a [`TotalConfig`] and adds the total.
    pub fn add_total_json(&self, value: &serde_json::Value) -> Result<Rc<Total>, ConfigError> {
        let config: TotalConfig = config::from_json(value)?;
        self.add_total(&config)
            .map_err(|e| ConfigError::new(alloc::format!("{e}")))
    }

    /// Removes `total`. Returns `None` if it is not owned by this storage.
    pub fn remove_total(&self, total: &Total) -> Option<Rc<Total>> {
        let index = self
            .totals
            .borrow()
            .iter()
            .position(|t| t.core().id() == total.core().id())?;
        self.remove_total_at(index)
    }

    /// Removes the total at `index` from the collection and disposes it.
    ///
    /// Its surface nodes are released by the next draw.
    pub fn remove_total_at(&self, index: usize) -> Option<Rc<Total>> {
        let total = {
            let mut totals = self.totals.borrow_mut();
            if index >= totals.len() {
                return None;
            }
            totals.remove(index)
        };
        // The storage signal below reports the removal.
        let _ = self.children.detach(total.core().id());
        total.core().dispose();
        self.removed.borrow_mut().push(total.clone());
        self.core.invalidate(
            ConsistencyState::TOTALS_VALUES | ConsistencyState::APPEARANCE,
            Signal::NEEDS_RECALCULATION | Signal::NEEDS_REDRAW_APPEARANCE,
        );
        Some(total)
    }

    /// Returns the total at `index`.
    #[must_use]
    pub fn total_at(&self, index: usize) -> Option<Rc<Total>> {
        self.totals.borrow().get(index).cloned()
    }

    /// Returns a snapshot of every total.
    #[must_use]
    pub fn all_totals(&self) -> Vec<Rc<Total>> {
        self.totals.borrow().clone()
    }

    /// Returns `categories` with every total's categories inserted right after its `x`.
    ///
    /// Totals whose `x` is not a category are skipped.
    #[must_use]
    pub fn populate_by_totals(&self, categories: &[String]) -> Vec<String> {
        let mut out = categories.to_vec();
        for total in self.totals.borrow().iter() {
            if !total.core().enabled() {
                continue;
            }
            let Some(x) = total.x() else {
                continue;
            };
            if let Some(index) = out.iter().position(|c| *c == x) {
                let at = index + 1;
                out.splice(at..at, total.resolver_categories());
            }
        }
        out
    }

    /// Installs the chart's scales.
    pub(crate) fn set_scales(&self, x_scale: Rc<OrdinalScale>, y_scale: Rc<LinearScale>) {
        *self.x_scale.borrow_mut() = Some(x_scale);
        *self.y_scale.borrow_mut() = Some(y_scale);
        self.core
            .invalidate(ConsistencyState::TOTALS_VALUES, Signal::NONE);
    }

    /// Replaces the running sums, keyed by [`Total::total_x`].
    pub(crate) fn set_values(&self, values: HashMap<String, f64>) {
        if *self.values.borrow() == values {
            return;
        }
        *self.values.borrow_mut() = values;
        self.core
            .invalidate(ConsistencyState::TOTALS_VALUES, Signal::NONE);
    }

    /// Shares `tooltip` with every total, present and future.
    pub fn set_tooltip(&self, tooltip: Rc<dyn Tooltip>) {
        for total in self.totals.borrow().iter() {
            total.set_tooltip(tooltip.clone());
        }
        *self.tooltip.borrow_mut() = Some(tooltip);
    }

    /// The band of `total` on the x scale, inside the storage's parent bounds.
    #[must_use]
    pub fn total_bounds(&self, total: &Total) -> Option<Rect> {
        let x_scale = self.x_scale.borrow().clone()?;
        let area = self.core.parent_bounds()?;
        let ratio = x_scale.transform(&Value::Str(total.total_x()));
        if !ratio.is_finite() {
            return None;
        }
        let left = ratio * area.width() + area.x0;
        let width = x_scale.point_width_ratio() * area.width();
        Some(Rect::new(left, area.y0, left + width, area.y1))
    }

    /// The vertical placement of `total` on the y scale.
    #[must_use]
    pub fn drawing_data(&self, total: &Total) -> Option<DrawingData> {
        let y_scale = self.y_scale.borrow().clone()?;
        Some(DrawingData {
            value: 1.0 - y_scale.transform(&Value::Number(total.value())),
            zero: 1.0 - y_scale.transform(&Value::Number(0.0)),
        })
    }

    /// The legend entry shared by every total.
    #[must_use]
    pub fn legend_item(&self) -> LegendItem {
        let fill = self
            .totals
            .borrow()
            .first()
            .and_then(|t| t.normal().get_option("fill"))
            .or_else(|| Some(self.theme.totals.fill.as_str().into()));
        LegendItem::new(
            self.theme.totals.legend_text.as_str(),
            LegendCategory::Total,
            self.core.id(),
        )
        .with_icon(paint::fill(fill.as_ref(), 1.0), None)
        .with_source_key("totalStorage")
    }

    /// Captures every total.
    #[must_use]
    pub fn serialize(&self) -> TotalsStorageConfig {
        TotalsStorageConfig {
            items: self.totals.borrow().iter().map(|t| t.serialize()).collect(),
        }
    }

    /// Adds one total per item.
    pub fn setup_by_json(&self, config: &TotalsStorageConfig) -> Result<(), AttachError> {
        for item in &config.items {
            self.add_total(item)?;
        }
        Ok(())
    }

    /// Applies a JSON object.
    pub fn setup_by_json_value(&self, value: &serde_json::Value) -> Result<(), ConfigError> {
        let config: TotalsStorageConfig = config::from_json(value)?;
        self.setup_by_json(&config)
            .map_err(|e| ConfigError::new(alloc::format!("{e}")))
    }

    /// Returns the serialized totals as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, ConfigError> {
        config::to_json(&self.serialize())
    }

    fn repair_values(&self) {
        let values = self.values.borrow();
        for total in self.totals.borrow().iter() {
            let value = values.get(&total.total_x()).copied().unwrap_or(0.0);
            let bounds = self.total_bounds(total);
            total.core().without_dispatch(|| {
                total.set_value(value);
                total.core().set_bounds(bounds);
                if let Some(data) = self.drawing_data(total) {
                    total.set_drawing_data(data);
                }
            });
        }
        self.core
            .invalidate(ConsistencyState::APPEARANCE, Signal::NONE);
    }

    fn repair_appearance(&self, surface: &mut dyn Surface) -> Result<(), DrawError> {
        for total in self.removed.borrow_mut().drain(..) {
            total.dispose(surface);
        }
        let layer = self.layer.get();
        for total in self.totals.borrow().iter() {
            total.core().without_dispatch(|| total.core().set_container(layer));
        }
        self.children.draw_children(surface)?;
        Ok(())
    }
}

impl VisualElement for TotalsStorage {
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
        DrawScheduler::new(STORAGE_PHASES).run(&self.core, |phase| match phase.name {
            "container" => {
                self.layer.mount(surface, &self.core);
                Ok(())
            }
            "values" => {
                self.repair_values();
                Ok(())
            }
            _ => self.repair_appearance(surface),
        })?;
        Ok(())
    }

    fn remove(&self, surface: &mut dyn Surface) {
        self.layer.detach(surface);
    }

    fn dispose(&self, surface: &mut dyn Surface) {
        for total in self.removed.borrow_mut().drain(..) {
            total.dispose(surface);
        }
        self.totals.borrow_mut().clear();
        self.children.dispose_children(surface);
        self.layer.release(surface);
        self.core.dispose();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use chartwell_core::Recorder;
    use serde_json::json;

    use super::*;

    fn storage() -> Rc<TotalsStorage> {
        TotalsStorage::new(Rc::new(Theme::default()))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn add_total_signals_once_and_shares_the_tooltip() {
        let storage = storage();
        let tooltip = crate::tooltip::TextTooltip::new();
        storage.set_tooltip(tooltip);
        let signals = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&signals);
        storage
            .core()
            .listen_signals(move |e| s.borrow_mut().push(e.signal));

        let total = storage
            .add_total(&TotalConfig::at("Feb").with_name("Q1"))
            .unwrap();
        assert_eq!(total.x().as_deref(), Some("Feb"));
        assert!(total.tooltip().is_some());
        assert_eq!(
            *signals.borrow(),
            [Signal::NEEDS_RECALCULATION | Signal::NEEDS_REDRAW_APPEARANCE]
        );
    }

    #[test]
    fn categories_follow_their_x() {
        let storage = storage();
        let a = storage.add_total(&TotalConfig::at("Jan")).unwrap();
        let b = storage.add_total(&TotalConfig::at("Mar")).unwrap();
        storage.add_total(&TotalConfig::at("Dec")).unwrap();

        let out = storage.populate_by_totals(&strings(&["Jan", "Feb", "Mar"]));
        assert_eq!(
            out,
            vec![
                "Jan".to_string(),
                a.total_x(),
                "Feb".to_string(),
                "Mar".to_string(),
                b.total_x()
            ]
        );
    }

    #[test]
    fn remove_total_at_shrinks_the_collection() {
        let storage = storage();
        let first = storage.add_total(&TotalConfig::at("Jan")).unwrap();
        storage.add_total(&TotalConfig::at("Feb")).unwrap();
        assert_eq!(storage.all_totals().len(), 2);

        let removed = storage.remove_total_at(0).unwrap();
        assert_eq!(removed.core().id(), first.core().id());
        assert!(removed.core().is_disposed());
        assert_eq!(storage.all_totals().len(), 1);
        assert_eq!(storage.total_at(0).unwrap().x().as_deref(), Some("Feb"));
        assert!(storage.remove_total_at(5).is_none());
        assert!(storage.remove_total(&first).is_none());
    }

    #[test]
    fn total_x_changes_request_recalculation() {
        let mut r = Recorder::new();
        let root = r.layer();
        let storage = storage();
        storage.core().set_container(Some(root));
        let total = storage.add_total(&TotalConfig::at("Jan")).unwrap();
        storage.draw(&mut r).unwrap();
        assert!(storage.core().is_consistent());

        total.set_x("Feb");
        assert!(storage
            .core()
            .has_invalidation_state(ConsistencyState::TOTALS_VALUES));
        assert!(!storage
            .core()
            .has_invalidation_state(ConsistencyState::APPEARANCE));

        storage.draw(&mut r).unwrap();
        total.set_fill("red");
        assert_eq!(storage.core().dirty_states(), ConsistencyState::APPEARANCE);
    }

    #[test]
    fn places_totals_from_the_scales() {
        let mut r = Recorder::new();
        let root = r.layer();
        let storage = storage();
        storage.core().set_container(Some(root));
        storage
            .core()
            .set_parent_bounds(Some(Rect::new(0.0, 0.0, 400.0, 100.0)));
        let total = storage.add_total(&TotalConfig::at("B")).unwrap();

        let x = OrdinalScale::new();
        x.set_values(storage.populate_by_totals(&strings(&["A", "B", "C"])));
        let y = LinearScale::new();
        y.set_minimum(Some(0.0));
        y.set_maximum(Some(100.0));
        storage.set_scales(x, y);
        let mut values = HashMap::new();
        values.insert(total.total_x(), 25.0);
        storage.set_values(values);
        storage.draw(&mut r).unwrap();

        assert_eq!(total.value(), 25.0);
        assert_eq!(total.core().bounds(), Some(Rect::new(200.0, 0.0, 300.0, 100.0)));
        assert_eq!(
            total.drawing_data(),
            Some(DrawingData {
                value: 0.75,
                zero: 1.0
            })
        );
        assert!(r.is_attached(total.shape().unwrap()));
    }

    #[test]
    fn removed_totals_release_their_nodes_on_the_next_draw() {
        let mut r = Recorder::new();
        let root = r.layer();
        let storage = storage();
        storage.core().set_container(Some(root));
        storage
            .core()
            .set_parent_bounds(Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let total = storage.add_total(&TotalConfig::at("A")).unwrap();
        let x = OrdinalScale::new();
        x.set_values(storage.populate_by_totals(&strings(&["A"])));
        storage.set_scales(x, LinearScale::new());
        storage.draw(&mut r).unwrap();
        let shape = total.shape().unwrap();
        assert!(r.node(shape).is_some());

        storage.remove_total_at(0);
        storage.draw(&mut r).unwrap();
        assert!(r.node(shape).is_none());
    }

    #[test]
    fn items_round_trip() {
        let storage = storage();
        storage
            .setup_by_json_value(&json!({
                "items": [{ "x": "Jan", "name": "Start" }, { "x": "Jun", "fill": "red" }]
            }))
            .unwrap();
        assert_eq!(storage.all_totals().len(), 2);

        let copy = TotalsStorage::new(Rc::new(Theme::default()));
        copy.setup_by_json(&storage.serialize()).unwrap();
        let totals = copy.all_totals();
        assert_eq!(totals[0].name(), "Start");
        assert_eq!(totals[1].normal().get_option("fill"), Some("red".into()));
    }

    #[test]
    fn legend_item_is_keyed_for_the_storage() {
        let storage = storage();
        let item = storage.legend_item();
        assert_eq!(item.text, "Total");
        assert_eq!(item.category, LegendCategory::Total);
        assert_eq!(item.source_key, "totalStorage");
        assert_eq!(item.source_uid, storage.core().id());
        assert!(item.icon_fill.is_some());
    }
}
