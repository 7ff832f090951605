// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Invalidation-driven element runtime for Chartwell.
//!
//! Every chart entity (series, totals, labels, whole charts) is a *visual element* that tracks
//! which parts of its derived output are stale and repairs only those parts when it is drawn:
//!
//! ```text
//!   setter ──► ElementCore::invalidate(state, signal)
//!                 │                    │
//!                 ▼                    ▼
//!        ConsistencyTracker        SignalBus::dispatch ──► listeners (parent composite,
//!        (dirty bits)                                       dependents)
//!                 │                                             │
//!                 │              Translation table ◄────────────┘
//!                 ▼
//!   draw() ──► DrawScheduler::run ──► repair phases (in fixed order) ──► mark_consistent
//! ```
//!
//! - **[`signal`]**: per-object notification buses carrying [`Signal`] bitmasks, with
//!   suspension and coalescing.
//! - **[`consistency`]**: per-object [`ConsistencyState`] bitmasks restricted to the element's
//!   supported set.
//! - **[`settings`]**: property bundles whose metadata says which states and signals a change
//!   triggers, including per interaction state (normal/hovered/selected) groups.
//! - **[`element`]**: the shared [`ElementCore`] and the [`VisualElement`] capability.
//! - **[`composite`]**: parent elements that own children and translate their signals.
//! - **[`scheduler`]**: ordered repair phases run at draw time.
//!
//! Rendering, scales and data access are collaborators behind small traits
//! ([`Surface`], [`Scale`], [`DataIterator`]). The crate never inspects pixels; it only
//! sequences surface calls and tracks dirtiness.
//!
//! The runtime is single-threaded and synchronous: dispatch, invalidation and drawing all run
//! to completion. Handlers may invalidate other elements re-entrantly. A signal graph in which
//! two elements keep re-dirtying each other from their repair phases never settles; nothing
//! here detects that.

#![no_std]

extern crate alloc;

pub mod composite;
pub mod consistency;
pub mod data;
pub mod element;
pub mod error;
pub mod id;
pub mod reporting;
pub mod scale;
pub mod scheduler;
pub mod settings;
pub mod signal;
pub mod surface;
pub mod theme;

pub use composite::{Composite, Translation, translate};
pub use consistency::{ConsistencyState, ConsistencyTracker};
pub use data::{DataIterator, MetaValue, Value};
pub use element::{DrawCheck, ElementCore, HasError, HasMarkers, HasScales, VisualElement};
pub use error::{AttachError, ConfigError, DrawError};
pub use id::ObjectId;
pub use reporting::{ErrorCode, WarningCode};
pub use scale::{Scale, ScaleKind};
pub use scheduler::{
    CHART_PHASES, DrawScheduler, Phase, RepairReport, SERIES_PHASES, TOTAL_PHASES,
};
pub use settings::{
    DescriptorsMeta, OptionValue, PropertyMeta, Settings, SettingsState, StateGroups,
    StateSettings, resolve_state_option,
};
pub use signal::{ListenerKey, Signal, SignalBus, SignalEvent};
pub use surface::{Node, NodeId, NodeKind, Recorder, Stroke, Surface, TextRun};
pub use theme::{CirclePackingTheme, LabelTheme, SeriesTheme, TextTheme, Theme, TotalTheme};
