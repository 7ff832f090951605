// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw scheduling.
//!
//! A [`DrawScheduler`] holds an ordered list of repair [`Phase`]s. At draw time it enters only
//! the phases whose states are dirty, in declared order, and marks each phase consistent right
//! after its repair succeeds. A failing phase stops the run: that phase and every later one
//! stay dirty, earlier ones stay repaired.
//!
//! The order is a contract. Later phases read data produced by earlier ones (series layout
//! needs resolved scales, labels need laid-out series).
//!
//! A repair that re-dirties its own phase loses that invalidation, since the phase is marked
//! consistent once the repair returns.

use alloc::vec::Vec;

use crate::consistency::ConsistencyState;
use crate::element::ElementCore;

/// One repair step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phase {
    /// States this phase repairs.
    pub state: ConsistencyState,
    /// Name used in logs and reports.
    pub name: &'static str,
}

impl Phase {
    /// Creates a phase.
    #[must_use]
    pub const fn new(state: ConsistencyState, name: &'static str) -> Self {
        Self { state, name }
    }
}

/// Chart-level order: statistics, scales, layout, series, labels, legend.
pub const CHART_PHASES: &[Phase] = &[
    Phase::new(ConsistencyState::RECALCULATION, "recalculation"),
    Phase::new(ConsistencyState::SCALES, "scales"),
    Phase::new(
        ConsistencyState::BOUNDS
            .union(ConsistencyState::CONTAINER)
            .union(ConsistencyState::Z_INDEX),
        "bounds",
    ),
    Phase::new(
        ConsistencyState::CHART_SERIES.union(ConsistencyState::APPEARANCE),
        "series",
    ),
    Phase::new(ConsistencyState::CHART_LABELS, "labels"),
    Phase::new(ConsistencyState::CHART_LEGEND, "legend"),
];

/// Series-level order: points, layout, placement, paint, error bars, labels.
pub const SERIES_PHASES: &[Phase] = &[
    Phase::new(ConsistencyState::SERIES_DATA, "data"),
    Phase::new(ConsistencyState::BOUNDS, "bounds"),
    Phase::new(
        ConsistencyState::CONTAINER.union(ConsistencyState::Z_INDEX),
        "container",
    ),
    Phase::new(
        ConsistencyState::APPEARANCE.union(ConsistencyState::SERIES_HATCH_FILL),
        "appearance",
    ),
    Phase::new(ConsistencyState::SERIES_ERROR, "error"),
    Phase::new(ConsistencyState::SERIES_LABELS, "labels"),
];

/// Order for single-shape elements such as waterfall totals.
pub const TOTAL_PHASES: &[Phase] = &[
    Phase::new(
        ConsistencyState::CONTAINER.union(ConsistencyState::Z_INDEX),
        "container",
    ),
    Phase::new(ConsistencyState::BOUNDS, "bounds"),
    Phase::new(ConsistencyState::APPEARANCE, "appearance"),
];

/// The phases a [`DrawScheduler::run`] executed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Executed phase names, in order.
    pub executed: Vec<&'static str>,
}

impl RepairReport {
    /// Returns `true` if the phase ran.
    #[must_use]
    pub fn ran(&self, name: &str) -> bool {
        self.executed.iter().any(|n| *n == name)
    }

    /// Returns `true` if nothing ran.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executed.is_empty()
    }
}

/// Runs repair phases in a fixed order.
#[derive(Clone, Copy, Debug)]
pub struct DrawScheduler {
    phases: &'static [Phase],
}

impl DrawScheduler {
    /// Creates a scheduler for `phases`, kept in declared order.
    #[must_use]
    pub const fn new(phases: &'static [Phase]) -> Self {
        Self { phases }
    }

    /// Returns the phases.
    #[must_use]
    pub fn phases(&self) -> &'static [Phase] {
        self.phases
    }

    /// Repairs every dirty phase of `core` in order.
    pub fn run<E>(
        &self,
        core: &ElementCore,
        mut repair: impl FnMut(&Phase) -> Result<(), E>,
    ) -> Result<RepairReport, E> {
        let mut report = RepairReport::default();
        for phase in self.phases {
            if !core.has_invalidation_state(phase.state) {
                continue;
            }
            tracing::debug!(element = core.id().raw(), phase = phase.name, "repair");
            repair(phase)?;
            core.mark_consistent(phase.state);
            core.record_repair();
            report.executed.push(phase.name);
        }
        Ok(report)
    }
}
