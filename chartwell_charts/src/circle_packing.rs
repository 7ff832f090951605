// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Circle-packing chart.
//!
//! The hierarchy arrives as pre-order rows with a `depth` and a `value` field: a row's parent is
//! the nearest previous row one level up. Levels down to `maxDepth` are drawn in full; the next
//! `hintDepth` levels are drawn as hints with `hintOpacity`. Node fills fade across the color
//! range spanned by the fully drawn values.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use chartwell_core::{
    ConfigError, ConsistencyState, DataIterator, DescriptorsMeta, DrawCheck, DrawError,
    DrawScheduler, ElementCore, ListenerKey, NodeId, OptionValue, Phase, PropertyMeta, Settings,
    SettingsState, Signal, StateGroups, StateSettings, Surface, Theme, VisualElement,
    resolve_state_option,
};
use kurbo::{Circle, Point, Rect, Shape};
use serde::{Deserialize, Serialize};

use crate::config::{self, StateConfig, apply_option};
use crate::data::View;
use crate::label::{LabelConfig, LabelSettings};
use crate::layer::{NodePool, RootLayer};
use crate::legend::{LegendCategory, LegendItem};
use crate::paint::{self, HatchFill};
use crate::symbol::{emit_lines, emit_path};
use crate::tooltip::FormatContext;
use crate::z_order;

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

const CHART_STATES: ConsistencyState = ConsistencyState::VISUAL_BASE
    .union(ConsistencyState::CHART_LEGEND)
    .union(ConsistencyState::TREEMAP_NODE_TYPES)
    .union(ConsistencyState::TREEMAP_HINT_OPACITY);
const CHART_SIGNALS: Signal = Signal::VISUAL_BASE
    .union(Signal::NEED_UPDATE_LEGEND)
    .union(Signal::NEED_UPDATE_COLOR_RANGE);

const PAINT: PropertyMeta = PropertyMeta::new(
    ConsistencyState::APPEARANCE,
    Signal::NEEDS_REDRAW.union(Signal::NEED_UPDATE_LEGEND),
);
const NOOP: PropertyMeta = PropertyMeta::new(ConsistencyState::NONE, Signal::NONE);

const STATE_META: DescriptorsMeta = DescriptorsMeta::new(&[
    ("fill", PAINT),
    ("stroke", PAINT),
    ("hatchFill", PAINT),
    ("labels", NOOP),
]);
const HOVERED_META: DescriptorsMeta = DescriptorsMeta::new(&[
    ("fill", PAINT),
    ("stroke", PAINT),
    ("hatchFill", PAINT),
    ("labels", NOOP),
    ("headers", NOOP),
]);

const CHART_META: DescriptorsMeta = DescriptorsMeta::new(&[
    (
        "maxDepth",
        PropertyMeta::new(
            ConsistencyState::CHART_LEGEND
                .union(ConsistencyState::TREEMAP_NODE_TYPES)
                .union(ConsistencyState::APPEARANCE),
            Signal::NEEDS_REDRAW.union(Signal::NEED_UPDATE_COLOR_RANGE),
        ),
    ),
    (
        "hintDepth",
        PropertyMeta::new(
            ConsistencyState::TREEMAP_NODE_TYPES.union(ConsistencyState::APPEARANCE),
            Signal::NEEDS_REDRAW,
        ),
    ),
    (
        "hintOpacity",
        PropertyMeta::new(ConsistencyState::TREEMAP_HINT_OPACITY, Signal::NEEDS_REDRAW),
    ),
    (
        "headersDisplayMode",
        PropertyMeta::new(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW),
    ),
    (
        "labelsDisplayMode",
        PropertyMeta::new(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW),
    ),
]);

const PACKING_PHASES: &[Phase] = &[
    Phase::new(
        ConsistencyState::CONTAINER.union(ConsistencyState::Z_INDEX),
        "container",
    ),
    Phase::new(ConsistencyState::TREEMAP_NODE_TYPES, "node types"),
    Phase::new(ConsistencyState::BOUNDS, "bounds"),
    Phase::new(ConsistencyState::APPEARANCE, "appearance"),
    Phase::new(ConsistencyState::TREEMAP_HINT_OPACITY, "hint opacity"),
    Phase::new(ConsistencyState::CHART_LEGEND, "legend"),
];

/// Share of a parent's diameter available to its children.
const PADDING: f64 = 0.9;
/// Opacity of the lowest value in the color range.
const MIN_RANGE_OPACITY: f64 = 0.35;
const HATCH_SPACING: f64 = 6.0;

/// How a label or header that does not fit its circle is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// Drawn regardless of size.
    AlwaysShow,
    /// Drawn and clipped to the circle.
    #[default]
    Clip,
    /// Skipped when wider than the circle.
    Drop,
}

impl DisplayMode {
    /// Parses `"alwaysShow"`, `"clip"` or `"drop"`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "alwaysShow" => Some(Self::AlwaysShow),
            "clip" => Some(Self::Clip),
            "drop" => Some(Self::Drop),
            _ => None,
        }
    }
}

/// One row of the hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct CircleNode {
    /// Display name, if the data has one.
    pub name: Option<String>,
    /// Level; roots are 0.
    pub depth: usize,
    /// Weight.
    pub value: f64,
    /// Index of the parent node.
    pub parent: Option<usize>,
}

/// Whether a node is drawn in full or as a hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    /// Within `maxDepth`.
    Visible,
    /// Within `hintDepth` levels below `maxDepth`.
    Hint,
}

/// A node's place on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Index into [`CirclePackingChart::nodes`].
    pub node: usize,
    /// The circle.
    pub circle: Circle,
    /// Visible or hint.
    pub node_type: NodeType,
}

/// Serialized [`CirclePackingChart`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CirclePackingConfig {
    /// Deepest fully drawn level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<OptionValue>,
    /// Hint levels below `maxDepth`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_depth: Option<OptionValue>,
    /// Opacity of hint nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_opacity: Option<OptionValue>,
    /// Header display mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers_display_mode: Option<OptionValue>,
    /// Label display mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels_display_mode: Option<OptionValue>,
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

/// A circle-packing chart.
pub struct CirclePackingChart {
    core: Rc<ElementCore>,
    settings: Settings,
    normal: StateSettings,
    hovered: StateSettings,
    selected: StateSettings,
    labels: LabelSettings,
    data: RefCell<Option<(Rc<View>, ListenerKey)>>,
    nodes: RefCell<Vec<CircleNode>>,
    node_types: RefCell<Vec<Option<NodeType>>>,
    node_values: RefCell<Vec<f64>>,
    hint_node_values: RefCell<Vec<f64>>,
    placements: RefCell<Vec<Placement>>,
    hovered_node: Cell<Option<usize>>,
    selected_node: Cell<Option<usize>>,
    legend: RefCell<Vec<LegendItem>>,
    layer: RootLayer,
    shapes: NodePool,
    hint_shapes: RefCell<Vec<(usize, NodeId)>>,
    label_nodes: NodePool,
}

impl fmt::Debug for CirclePackingChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CirclePackingChart")
            .field("core", &self.core)
            .field("settings", &self.settings)
            .field("nodes", &self.nodes.borrow().len())
            .finish_non_exhaustive()
    }
}

impl CirclePackingChart {
    /// Creates an empty chart with the theme's circle-packing defaults.
    #[must_use]
    pub fn new(theme: &Theme) -> Rc<Self> {
        let defaults = &theme.circle_packing;
        let core = ElementCore::new(CHART_STATES, CHART_SIGNALS);
        core.set_z_index(z_order::SERIES);
        let settings = Settings::new(&core, CHART_META)
            .with_theme_option("maxDepth", defaults.max_depth)
            .with_theme_option("hintDepth", defaults.hint_depth)
            .with_theme_option("hintOpacity", defaults.hint_opacity)
            .with_theme_option("headersDisplayMode", defaults.headers_display_mode.as_str())
            .with_theme_option("labelsDisplayMode", defaults.labels_display_mode.as_str());
        let group = |state, meta, fill: &str| {
            StateSettings::new(&core, state, meta)
                .with_theme_option("fill", fill)
                .with_theme_option("stroke", defaults.stroke.as_str())
                .with_theme_option("hatchFill", false)
        };
        let normal = group(SettingsState::Normal, STATE_META, defaults.fill.as_str());
        let hovered = group(
            SettingsState::Hovered,
            HOVERED_META,
            defaults.hovered_fill.as_str(),
        );
        let selected = group(
            SettingsState::Selected,
            STATE_META,
            defaults.selected_fill.as_str(),
        );

        let labels = LabelSettings::new(theme);
        let weak = Rc::downgrade(&core);
        core.subscribe(labels.bus(), move |_| {
            if let Some(core) = weak.upgrade() {
                core.invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW);
            }
        });

        Rc::new(Self {
            core,
            settings,
            normal,
            hovered,
            selected,
            labels,
            data: RefCell::new(None),
            nodes: RefCell::new(Vec::new()),
            node_types: RefCell::new(Vec::new()),
            node_values: RefCell::new(Vec::new()),
            hint_node_values: RefCell::new(Vec::new()),
            placements: RefCell::new(Vec::new()),
            hovered_node: Cell::new(None),
            selected_node: Cell::new(None),
            legend: RefCell::new(Vec::new()),
            layer: RootLayer::default(),
            shapes: NodePool::default(),
            hint_shapes: RefCell::new(Vec::new()),
            label_nodes: NodePool::default(),
        })
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

    /// Deepest fully drawn level.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.depth_option("maxDepth")
    }

    /// Sets the deepest fully drawn level.
    pub fn set_max_depth(&self, depth: usize) {
        self.set_option("maxDepth", depth as f64);
    }

    /// Number of hint levels below [`max_depth`](Self::max_depth).
    #[must_use]
    pub fn hint_depth(&self) -> usize {
        self.depth_option("hintDepth")
    }

    /// Sets the number of hint levels.
    pub fn set_hint_depth(&self, depth: usize) {
        self.set_option("hintDepth", depth as f64);
    }

    /// Opacity of hint nodes.
    #[must_use]
    pub fn hint_opacity(&self) -> f64 {
        self.get_option("hintOpacity")
            .and_then(|v| v.as_f64())
            .map_or(1.0, |o| o.clamp(0.0, 1.0))
    }

    /// Sets the opacity of hint nodes.
    pub fn set_hint_opacity(&self, opacity: f64) {
        self.set_option("hintOpacity", opacity);
    }

    /// Treatment of headers that do not fit.
    #[must_use]
    pub fn headers_display_mode(&self) -> DisplayMode {
        self.mode_option("headersDisplayMode")
    }

    /// Treatment of labels that do not fit.
    #[must_use]
    pub fn labels_display_mode(&self) -> DisplayMode {
        self.mode_option("labelsDisplayMode")
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "depths are small non-negative whole numbers"
    )]
    fn depth_option(&self, name: &str) -> usize {
        self.get_option(name)
            .and_then(|v| v.as_f64())
            .filter(|d| d.is_finite())
            .map_or(0, |d| d.max(0.0) as usize)
    }

    fn mode_option(&self, name: &str) -> DisplayMode {
        self.get_option(name)
            .and_then(|v| v.as_str().and_then(DisplayMode::from_name))
            .unwrap_or_default()
    }

    /// Normal state options.
    #[must_use]
    pub fn normal(&self) -> &StateSettings {
        &self.normal
    }

    /// Hovered state options.
    #[must_use]
    pub fn hovered(&self) -> &StateSettings {
        &self.hovered
    }

    /// Selected state options.
    #[must_use]
    pub fn selected(&self) -> &StateSettings {
        &self.selected
    }

    /// Node labels.
    #[must_use]
    pub fn labels(&self) -> &LabelSettings {
        &self.labels
    }

    /// Binds `view`, which maps `depth`, `value` and optionally `name`.
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
                    ConsistencyState::TREEMAP_NODE_TYPES
                        | ConsistencyState::APPEARANCE
                        | ConsistencyState::CHART_LEGEND,
                    Signal::NEEDS_REDRAW | Signal::NEED_UPDATE_COLOR_RANGE,
                );
            }
        });
        *self.data.borrow_mut() = Some((view, key));
        self.core.invalidate(
            ConsistencyState::TREEMAP_NODE_TYPES
                | ConsistencyState::APPEARANCE
                | ConsistencyState::CHART_LEGEND,
            Signal::NEEDS_REDRAW | Signal::NEED_UPDATE_COLOR_RANGE,
        );
    }

    /// Returns the bound data.
    #[must_use]
    pub fn data(&self) -> Option<Rc<View>> {
        self.data.borrow().as_ref().map(|(view, _)| view.clone())
    }

    /// Nodes as of the last node-type repair.
    #[must_use]
    pub fn nodes(&self) -> Vec<CircleNode> {
        self.nodes.borrow().clone()
    }

    /// Values of fully drawn nodes, in data order.
    #[must_use]
    pub fn node_values(&self) -> Vec<f64> {
        self.node_values.borrow().clone()
    }

    /// Values of hint nodes, in data order.
    #[must_use]
    pub fn hint_node_values(&self) -> Vec<f64> {
        self.hint_node_values.borrow().clone()
    }

    /// `(min, max)` of [`node_values`](Self::node_values).
    #[must_use]
    pub fn color_range(&self) -> Option<(f64, f64)> {
        self.node_values.borrow().iter().fold(None, |range, v| {
            Some(match range {
                None => (*v, *v),
                Some((lo, hi)) => (f64::min(lo, *v), f64::max(hi, *v)),
            })
        })
    }

    /// Circles as of the last bounds repair.
    #[must_use]
    pub fn placements(&self) -> Vec<Placement> {
        self.placements.borrow().clone()
    }

    /// Legend items as of the last legend repair.
    #[must_use]
    pub fn legend_items(&self) -> Vec<LegendItem> {
        self.legend.borrow().clone()
    }

    /// The deepest visible node under `point`.
    #[must_use]
    pub fn node_at(&self, point: Point) -> Option<usize> {
        self.placements
            .borrow()
            .iter()
            .filter(|p| p.node_type == NodeType::Visible && p.circle.contains(point))
            .max_by_key(|p| self.nodes.borrow().get(p.node).map_or(0, |n| n.depth))
            .map(|p| p.node)
    }

    /// Hovers the node under `point` and redraws. Returns the hovered node.
    pub fn pointer_move(
        &self,
        surface: &mut dyn Surface,
        point: Point,
    ) -> Result<Option<usize>, DrawError> {
        let hit = self.node_at(point);
        if self.hovered_node.replace(hit) != hit {
            // Redrawn right away, nobody else needs to know.
            self.core
                .invalidate(ConsistencyState::APPEARANCE, Signal::NONE);
        }
        self.draw(surface)?;
        Ok(hit)
    }

    /// Ends any hover and redraws.
    pub fn pointer_out(&self, surface: &mut dyn Surface) -> Result<(), DrawError> {
        if self.hovered_node.take().is_some() {
            self.core
                .invalidate(ConsistencyState::APPEARANCE, Signal::NONE);
        }
        self.draw(surface)
    }

    /// Selects a node, or clears the selection.
    pub fn select(&self, node: Option<usize>) {
        if self.selected_node.replace(node) != node {
            self.core
                .invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW);
        }
    }

    /// The selected node.
    #[must_use]
    pub fn selected_node(&self) -> Option<usize> {
        self.selected_node.get()
    }

    /// Captures the explicitly set options.
    #[must_use]
    pub fn serialize(&self) -> CirclePackingConfig {
        let state = |group: &StateSettings| {
            let config = StateConfig::capture(group);
            (!config.is_empty()).then_some(config)
        };
        let labels = self.labels.serialize();
        CirclePackingConfig {
            max_depth: self.settings.get_own_option("maxDepth"),
            hint_depth: self.settings.get_own_option("hintDepth"),
            hint_opacity: self.settings.get_own_option("hintOpacity"),
            headers_display_mode: self.settings.get_own_option("headersDisplayMode"),
            labels_display_mode: self.settings.get_own_option("labelsDisplayMode"),
            labels: (!labels.is_empty()).then_some(labels),
            enabled: Some(self.core.enabled()),
            normal: state(&self.normal),
            hovered: state(&self.hovered),
            selected: state(&self.selected),
        }
    }

    /// Applies the present keys, dispatching at most one signal.
    pub fn setup_by_json(&self, config: &CirclePackingConfig) {
        self.core.suspend_signals_dispatching();
        let set = |n: &str, v: OptionValue| self.settings.set_option(n, v);
        apply_option(set, "maxDepth", config.max_depth.as_ref());
        apply_option(set, "hintDepth", config.hint_depth.as_ref());
        apply_option(set, "hintOpacity", config.hint_opacity.as_ref());
        apply_option(
            set,
            "headersDisplayMode",
            config.headers_display_mode.as_ref(),
        );
        apply_option(set, "labelsDisplayMode", config.labels_display_mode.as_ref());
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

    // --- repair ---

    fn read_nodes(&self) -> Vec<CircleNode> {
        let Some(view) = self.data() else {
            return Vec::new();
        };
        let mut nodes: Vec<CircleNode> = Vec::new();
        let mut it = view.iterator();
        while it.advance() {
            let depth = it.get("depth").map_or(f64::NAN, |v| v.to_number());
            if !depth.is_finite() || depth < 0.0 || depth.floor() != depth {
                tracing::warn!(row = it.index(), "circle packing row without a valid depth");
                continue;
            }
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "checked to be a non-negative whole number"
            )]
            let depth = depth as usize;
            let parent = if depth == 0 {
                None
            } else {
                let parent = nodes.iter().rposition(|n| n.depth < depth);
                match parent {
                    Some(p) if nodes[p].depth == depth - 1 => Some(p),
                    _ => {
                        tracing::warn!(row = it.index(), depth, "circle packing row without a parent");
                        continue;
                    }
                }
            };
            let value = it.get("value").map_or(f64::NAN, |v| v.to_number());
            nodes.push(CircleNode {
                name: it
                    .get("name")
                    .and_then(|v| v.as_str().map(String::from)),
                depth,
                value: if value.is_finite() { value.max(0.0) } else { 0.0 },
                parent,
            });
        }
        nodes
    }

    fn classify(&self) {
        let nodes = self.read_nodes();
        let max_depth = self.max_depth();
        let hint_limit = max_depth + self.hint_depth();
        let mut types = Vec::with_capacity(nodes.len());
        let mut values = Vec::new();
        let mut hint_values = Vec::new();
        for node in &nodes {
            let node_type = if node.depth <= max_depth {
                values.push(node.value);
                Some(NodeType::Visible)
            } else if node.depth <= hint_limit {
                hint_values.push(node.value);
                Some(NodeType::Hint)
            } else {
                None
            };
            types.push(node_type);
        }
        tracing::debug!(
            nodes = nodes.len(),
            visible = values.len(),
            hints = hint_values.len(),
            "circle packing node types"
        );
        *self.nodes.borrow_mut() = nodes;
        *self.node_types.borrow_mut() = types;
        *self.node_values.borrow_mut() = values;
        *self.hint_node_values.borrow_mut() = hint_values;
        self.core.invalidate(
            ConsistencyState::BOUNDS | ConsistencyState::APPEARANCE,
            Signal::NONE,
        );
    }

    fn layout(&self) {
        let mut placements = Vec::new();
        if let Some(bounds) = self.core.pixel_bounds() {
            let nodes = self.nodes.borrow();
            let types = self.node_types.borrow();
            let radius = 0.5 * bounds.width().min(bounds.height());
            let frame = Circle::new(bounds.center(), radius / PADDING);
            let roots: Vec<usize> = (0..nodes.len())
                .filter(|i| nodes[*i].parent.is_none())
                .collect();
            let mut queue = Vec::from([(frame, roots)]);
            while let Some((parent, children)) = queue.pop() {
                let total: f64 = children.iter().map(|c| nodes[*c].value).sum();
                if total <= 0.0 {
                    continue;
                }
                let span = 2.0 * parent.radius * PADDING;
                let mut left = parent.center.x - 0.5 * span;
                for child in children {
                    let diameter = span * nodes[child].value / total;
                    let circle = Circle::new(
                        Point::new(left + 0.5 * diameter, parent.center.y),
                        0.5 * diameter,
                    );
                    left += diameter;
                    let Some(node_type) = types.get(child).copied().flatten() else {
                        continue;
                    };
                    placements.push(Placement {
                        node: child,
                        circle,
                        node_type,
                    });
                    let grandchildren = (child + 1..nodes.len())
                        .filter(|i| nodes[*i].parent == Some(child))
                        .collect();
                    queue.push((circle, grandchildren));
                }
            }
            // Parents below children.
            placements.sort_by_key(|p| nodes[p.node].depth);
        }
        *self.placements.borrow_mut() = placements;
        self.core
            .invalidate(ConsistencyState::APPEARANCE, Signal::NONE);
    }

    fn node_state(&self, node: usize) -> SettingsState {
        if self.selected_node.get() == Some(node) {
            SettingsState::Selected
        } else if self.hovered_node.get() == Some(node) {
            SettingsState::Hovered
        } else {
            SettingsState::Normal
        }
    }

    fn resolve(&self, name: &str, state: SettingsState) -> Option<OptionValue> {
        resolve_state_option(
            name,
            None,
            state,
            StateGroups {
                normal: &self.normal,
                hovered: Some(&self.hovered),
                selected: Some(&self.selected),
            },
        )
    }

    fn range_opacity(&self, value: f64) -> f64 {
        match self.color_range() {
            Some((lo, hi)) if hi > lo => {
                MIN_RANGE_OPACITY + (1.0 - MIN_RANGE_OPACITY) * (value - lo) / (hi - lo)
            }
            _ => 1.0,
        }
    }

    fn repair_appearance(&self, surface: &mut dyn Surface) {
        self.shapes.clear(surface);
        self.label_nodes.clear(surface);
        self.hint_shapes.borrow_mut().clear();
        let Some(layer) = self.layer.get() else {
            return;
        };
        let nodes = self.nodes.borrow();
        let hint_opacity = self.hint_opacity();
        for placement in self.placements.borrow().iter() {
            let Some(node) = nodes.get(placement.node) else {
                continue;
            };
            let state = self.node_state(placement.node);
            let opacity = match placement.node_type {
                NodeType::Visible => self.range_opacity(node.value),
                NodeType::Hint => hint_opacity,
            };
            let shape = self.shapes.path(surface, layer);
            emit_path(surface, shape, &placement.circle.to_path(0.1));
            surface.set_fill(shape, paint::fill(self.resolve("fill", state).as_ref(), opacity));
            let stroke = paint::stroke(self.resolve("stroke", state).as_ref(), 1.0);
            surface.set_stroke(shape, stroke.clone());
            if placement.node_type == NodeType::Hint {
                self.hint_shapes.borrow_mut().push((placement.node, shape));
                continue;
            }

            let bbox = placement.circle.bounding_box();
            if let Some(hatch) = HatchFill::from_option(self.resolve("hatchFill", state).as_ref())
            {
                let node = self.shapes.path(surface, layer);
                emit_lines(surface, node, &hatch.segments(bbox, HATCH_SPACING));
                surface.set_stroke(node, stroke);
                surface.set_clip(node, Some(bbox));
            }
            self.draw_label(surface, layer, placement, node);
        }
    }

    fn draw_label(
        &self,
        surface: &mut dyn Surface,
        layer: NodeId,
        placement: &Placement,
        node: &CircleNode,
    ) {
        let has_children = self
            .placements
            .borrow()
            .iter()
            .any(|p| self.nodes.borrow().get(p.node).and_then(|n| n.parent) == Some(placement.node));
        let context = FormatContext::new()
            .with("value", node.value)
            .with("name", node.name.as_deref().unwrap_or_default())
            .with("depth", node.depth as f64);
        let Some(text) = self.labels.render(&context) else {
            return;
        };
        let circle = placement.circle;
        // Parents carry a header at the top, leaves a label in the middle.
        let (mode, anchor) = if has_children {
            (
                self.headers_display_mode(),
                Point::new(
                    circle.center.x,
                    circle.center.y - circle.radius + self.labels.font_size(),
                ),
            )
        } else {
            (self.labels_display_mode(), circle.center)
        };
        let run = self.labels.layout(text, anchor);
        if mode == DisplayMode::Drop && run.size.width > 2.0 * circle.radius {
            return;
        }
        let label = self.label_nodes.text(surface, layer);
        surface.set_text(label, run);
        surface.set_fill(
            label,
            paint::fill(self.labels.get_option("fontColor").as_ref(), 1.0),
        );
        surface.set_z_index(label, z_order::LABELS - z_order::SERIES);
        if mode == DisplayMode::Clip {
            surface.set_clip(label, Some(circle.bounding_box()));
        }
    }

    fn repair_hint_opacity(&self, surface: &mut dyn Surface) {
        let opacity = self.hint_opacity();
        for (node, shape) in self.hint_shapes.borrow().iter() {
            let fill = self.resolve("fill", self.node_state(*node));
            surface.set_fill(*shape, paint::fill(fill.as_ref(), opacity));
        }
    }

    fn update_legend(&self) {
        let mut items = Vec::new();
        if let Some((lo, hi)) = self.color_range() {
            let fill = self.normal.get_option("fill");
            let stroke = self.normal.get_option("stroke");
            for (value, key) in [(lo, "min"), (hi, "max")] {
                items.push(
                    LegendItem::new(format!("{value}"), LegendCategory::Series, self.core.id())
                        .with_icon(
                            paint::fill(fill.as_ref(), self.range_opacity(value)),
                            paint::stroke(stroke.as_ref(), 1.0),
                        )
                        .with_source_key(key),
                );
            }
        }
        *self.legend.borrow_mut() = items;
    }
}

impl VisualElement for CirclePackingChart {
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
        DrawScheduler::new(PACKING_PHASES).run(&self.core, |phase| {
            match phase.name {
                "container" => {
                    self.layer.mount(surface, &self.core);
                }
                "node types" => self.classify(),
                "bounds" => self.layout(),
                "appearance" => self.repair_appearance(surface),
                "hint opacity" => self.repair_hint_opacity(surface),
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
        self.hint_shapes.borrow_mut().clear();
        self.layer.release(surface);
        self.labels.dispose();
        self.data.borrow_mut().take();
        self.core.dispose();
    }
}

/// The bounding rectangle of every placement, if any.
#[must_use]
pub fn placements_bounds(placements: &[Placement]) -> Option<Rect> {
    placements
        .iter()
        .map(|p| p.circle.bounding_box())
        .reduce(|a, b| a.union(b))
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use chartwell_core::{Recorder, Value};
    use serde_json::json;

    use super::*;
    use crate::data::{DataSet, Mapping};

    const TREE: [(f64, f64); 6] = [
        (0.0, 10.0),
        (1.0, 6.0),
        (2.0, 3.0),
        (2.0, 3.0),
        (1.0, 4.0),
        (2.0, 4.0),
    ];

    fn view(rows: &[(f64, f64)]) -> Rc<View> {
        let rows = rows
            .iter()
            .map(|(d, v)| Vec::from([Value::from(*d), Value::from(*v)]))
            .collect();
        DataSet::new(rows).map_as(Mapping::new().field("depth", 0).field("value", 1))
    }

    fn chart(r: &mut Recorder) -> Rc<CirclePackingChart> {
        let chart = CirclePackingChart::new(&Theme::default());
        chart.set_data(view(&TREE));
        chart.core().set_container(Some(r.layer()));
        chart
            .core()
            .set_bounds(Some(Rect::new(0.0, 0.0, 200.0, 200.0)));
        chart
    }

    #[test]
    fn depths_split_nodes_into_visible_and_hints() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        chart.set_max_depth(1);
        chart.set_hint_depth(1);
        chart.draw(&mut r).unwrap();
        assert_eq!(chart.node_values(), [10.0, 6.0, 4.0]);
        assert_eq!(chart.hint_node_values(), [3.0, 3.0, 4.0]);
        assert_eq!(chart.color_range(), Some((4.0, 10.0)));
        assert_eq!(chart.nodes()[5].parent, Some(4));
        assert_eq!(chart.placements().len(), 6);
    }

    #[test]
    fn deeper_levels_than_the_hints_are_not_placed() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        chart.set_max_depth(0);
        chart.draw(&mut r).unwrap();
        assert_eq!(chart.node_values(), [10.0]);
        assert!(chart.hint_node_values().is_empty());
        assert_eq!(chart.placements().len(), 1);
    }

    #[test]
    fn children_stay_inside_their_parent() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        chart.draw(&mut r).unwrap();
        let placements = chart.placements();
        let nodes = chart.nodes();
        let circle_of = |i: usize| placements.iter().find(|p| p.node == i).unwrap().circle;
        for p in &placements {
            if let Some(parent) = nodes[p.node].parent {
                let outer = circle_of(parent);
                let offset = (p.circle.center - outer.center).hypot();
                assert!(offset + p.circle.radius <= outer.radius + 1e-9);
            }
        }
        let bounds = placements_bounds(&placements).unwrap();
        let frame = Rect::new(0.0, 0.0, 200.0, 200.0).inflate(1e-9, 1e-9);
        assert_eq!(frame.union(bounds), frame);
    }

    #[test]
    fn option_metadata_drives_the_phases() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        chart.draw(&mut r).unwrap();
        let signals = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&signals);
        chart
            .core()
            .listen_signals(move |e| s.borrow_mut().push(e.signal));

        chart.set_hint_opacity(0.1);
        assert_eq!(
            chart.core().dirty_states(),
            ConsistencyState::TREEMAP_HINT_OPACITY
        );
        chart.draw(&mut r).unwrap();

        chart.set_max_depth(1);
        assert!(chart.core().has_invalidation_state(
            ConsistencyState::CHART_LEGEND | ConsistencyState::TREEMAP_NODE_TYPES
        ));
        chart.normal().set_option("fill", "red");
        chart.normal().set_option("labels", true);
        assert_eq!(
            *signals.borrow(),
            [
                Signal::NEEDS_REDRAW,
                Signal::NEEDS_REDRAW | Signal::NEED_UPDATE_COLOR_RANGE,
                Signal::NEEDS_REDRAW | Signal::NEED_UPDATE_LEGEND,
            ]
        );
    }

    #[test]
    fn hint_opacity_repaints_hints_only() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        chart.set_max_depth(1);
        chart.set_hint_depth(1);
        chart.draw(&mut r).unwrap();
        let shapes = chart.shapes.nodes();

        chart.set_hint_opacity(1.0);
        chart.draw(&mut r).unwrap();
        assert_eq!(chart.shapes.nodes(), shapes, "no rebuild");
        let (_, hint) = chart.hint_shapes.borrow()[0];
        assert_eq!(
            r.node(hint).unwrap().fill,
            paint::fill(chart.normal().get_option("fill").as_ref(), 1.0)
        );
    }

    #[test]
    fn hover_picks_the_deepest_node() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        chart.set_max_depth(1);
        chart.draw(&mut r).unwrap();
        let leaf = chart
            .placements()
            .into_iter()
            .find(|p| p.node == 4)
            .unwrap();
        assert_eq!(chart.pointer_move(&mut r, leaf.circle.center).unwrap(), Some(4));
        assert_eq!(chart.node_state(4), SettingsState::Hovered);
        assert_eq!(chart.pointer_move(&mut r, Point::new(1.0, 1.0)).unwrap(), None);
        chart.pointer_out(&mut r).unwrap();
        assert_eq!(chart.node_state(4), SettingsState::Normal);
    }

    #[test]
    fn dropped_labels_do_not_fit() {
        let mut r = Recorder::new();
        let chart = chart(&mut r);
        chart.labels().set_format("a very long label that cannot fit anywhere");
        chart.draw(&mut r).unwrap();
        let drawn = chart.label_nodes.len();
        assert!(drawn > 0);

        chart.set_option("labelsDisplayMode", "drop");
        chart.set_option("headersDisplayMode", "drop");
        chart.draw(&mut r).unwrap();
        assert_eq!(chart.label_nodes.len(), 0);
    }

    #[test]
    fn config_round_trip() {
        let chart = CirclePackingChart::new(&Theme::default());
        chart
            .setup_by_json_value(&json!({
                "maxDepth": 2,
                "hintOpacity": 0.2,
                "labelsDisplayMode": "alwaysShow",
                "hovered": { "fill": "orange" }
            }))
            .unwrap();
        let copy = CirclePackingChart::new(&Theme::default());
        copy.setup_by_json(&chart.serialize());
        assert_eq!(copy.max_depth(), 2);
        assert_eq!(copy.hint_opacity(), 0.2);
        assert_eq!(copy.labels_display_mode(), DisplayMode::AlwaysShow);
        assert_eq!(
            copy.hovered().get_own_option("fill"),
            Some(OptionValue::from("orange"))
        );
    }
}
