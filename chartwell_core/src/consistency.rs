// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Consistency tracking.
//!
//! A [`ConsistencyState`] bit marks one aspect of an element's derived output as stale. Each
//! element declares the bits it supports; the [`ConsistencyTracker`] ignores everything else on
//! both [`mark_dirty`](ConsistencyTracker::mark_dirty) and
//! [`mark_consistent`](ConsistencyTracker::mark_consistent).

use core::cell::Cell;

use bitflags::bitflags;

bitflags! {
    /// A bitmask of stale aspects.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ConsistencyState: u32 {
        /// Paint (fill, stroke, hatch) is stale.
        const APPEARANCE = 1 << 0;
        /// Geometry is stale.
        const BOUNDS = 1 << 1;
        /// The rendered output is not attached to the current container.
        const CONTAINER = 1 << 2;
        /// Stacking order is stale.
        const Z_INDEX = 1 << 3;
        /// Visibility must be reconciled with the enabled flag.
        const ENABLED = 1 << 4;

        /// Series points must be re-read from data.
        const SERIES_DATA = 1 << 5;
        /// Series hatch fill is stale.
        const SERIES_HATCH_FILL = 1 << 6;
        /// Series labels are stale.
        const SERIES_LABELS = 1 << 7;
        /// Series error bars are stale.
        const SERIES_ERROR = 1 << 8;

        /// Chart statistics must be recalculated.
        const RECALCULATION = 1 << 9;
        /// Chart scales must be re-resolved.
        const SCALES = 1 << 10;
        /// Chart series must be redrawn.
        const CHART_SERIES = 1 << 11;
        /// Chart-level labels are stale.
        const CHART_LABELS = 1 << 12;
        /// Chart legend is stale.
        const CHART_LEGEND = 1 << 13;

        /// Hierarchical node classification (visible vs hint nodes) is stale.
        const TREEMAP_NODE_TYPES = 1 << 14;
        /// Hint node opacity is stale.
        const TREEMAP_HINT_OPACITY = 1 << 15;

        /// Waterfall total values are stale.
        const TOTALS_VALUES = 1 << 16;

        /// The bits every visual element supports.
        const VISUAL_BASE = Self::APPEARANCE.bits()
            | Self::BOUNDS.bits()
            | Self::CONTAINER.bits()
            | Self::Z_INDEX.bits()
            | Self::ENABLED.bits();

        /// Every bit, including ones no constant names yet.
        const ALL = u32::MAX;
    }
}

impl Default for ConsistencyState {
    fn default() -> Self {
        Self::NONE
    }
}

impl ConsistencyState {
    /// The empty mask.
    pub const NONE: Self = Self::empty();
}

/// Per-element dirty bits restricted to a supported set.
#[derive(Debug)]
pub struct ConsistencyTracker {
    supported: ConsistencyState,
    dirty: Cell<ConsistencyState>,
}

impl ConsistencyTracker {
    /// Creates a tracker with every supported bit dirty.
    #[must_use]
    pub fn new(supported: ConsistencyState) -> Self {
        Self {
            supported,
            dirty: Cell::new(supported),
        }
    }

    /// Returns the supported set.
    #[must_use]
    pub fn supported(&self) -> ConsistencyState {
        self.supported
    }

    /// Returns the current dirty set.
    #[must_use]
    pub fn dirty(&self) -> ConsistencyState {
        self.dirty.get()
    }

    /// Marks the supported part of `mask` dirty and returns the bits that went from clean to dirty.
    pub fn mark_dirty(&self, mask: ConsistencyState) -> ConsistencyState {
        let allowed = mask & self.supported;
        let before = self.dirty.get();
        self.dirty.set(before | allowed);
        allowed.difference(before)
    }

    /// Returns `true` if any bit of `mask` is dirty.
    #[must_use]
    pub fn has(&self, mask: ConsistencyState) -> bool {
        self.dirty.get().intersects(mask)
    }

    /// Clears exactly the supported part of `mask`.
    pub fn mark_consistent(&self, mask: ConsistencyState) {
        let cleared = mask & self.supported;
        self.dirty.set(self.dirty.get().difference(cleared));
    }

    /// Returns `true` if nothing is dirty.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.dirty.get().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPORTED: ConsistencyState =
        ConsistencyState::APPEARANCE.union(ConsistencyState::BOUNDS);

    #[test]
    fn starts_fully_dirty() {
        let t = ConsistencyTracker::new(SUPPORTED);
        assert_eq!(t.dirty(), SUPPORTED);
        assert!(!t.is_consistent());
    }

    #[test]
    fn unsupported_bits_are_ignored() {
        let t = ConsistencyTracker::new(SUPPORTED);
        t.mark_consistent(ConsistencyState::ALL);
        assert!(t.is_consistent());

        let newly = t.mark_dirty(ConsistencyState::SERIES_DATA | ConsistencyState::CONTAINER);
        assert!(newly.is_empty());
        assert!(t.is_consistent());
    }

    #[test]
    fn mark_dirty_reports_only_new_bits() {
        let t = ConsistencyTracker::new(SUPPORTED);
        t.mark_consistent(ConsistencyState::APPEARANCE);
        let newly = t.mark_dirty(SUPPORTED);
        assert_eq!(newly, ConsistencyState::APPEARANCE);
        assert!(t.mark_dirty(SUPPORTED).is_empty(), "already dirty");
    }

    #[test]
    fn mark_consistent_clears_exactly_the_given_bits() {
        let t = ConsistencyTracker::new(SUPPORTED);
        t.mark_consistent(ConsistencyState::BOUNDS);
        assert!(t.has(ConsistencyState::APPEARANCE));
        assert!(!t.has(ConsistencyState::BOUNDS));
        assert!(t.has(ConsistencyState::BOUNDS | ConsistencyState::APPEARANCE));
    }

    #[test]
    fn all_keeps_bits_without_a_name() {
        let unnamed = ConsistencyState::from_bits_retain(1 << 30);
        assert!(ConsistencyState::ALL.contains(unnamed | ConsistencyState::VISUAL_BASE));
        assert!((!ConsistencyState::APPEARANCE).contains(unnamed));
        assert_eq!(ConsistencyState::default(), ConsistencyState::NONE);
        assert!(ConsistencyState::NONE.is_empty());
    }

    #[test]
    fn all_supported_invalidation_is_clipped_to_the_supported_set() {
        let t = ConsistencyTracker::new(SUPPORTED);
        t.mark_consistent(ConsistencyState::ALL);
        assert!(t.is_consistent());
        assert_eq!(t.mark_dirty(ConsistencyState::ALL), SUPPORTED);
    }
}
