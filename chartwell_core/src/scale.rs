// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scale boundary.

use alloc::rc::Rc;

use crate::data::Value;
use crate::signal::SignalBus;

/// The scale families series distinguish between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScaleKind {
    /// Continuous numeric domain.
    Linear,
    /// Discrete categories.
    Ordinal,
}

impl ScaleKind {
    /// Returns `true` for kinds a scatter series accepts.
    #[must_use]
    pub fn is_scatter(self) -> bool {
        matches!(self, Self::Linear)
    }
}

/// Maps data values to normalized ratios.
///
/// Scales emit [`Signal::NEEDS_RECALCULATION`](crate::Signal::NEEDS_RECALCULATION) when their
/// domain must be recomputed and [`Signal::NEEDS_REAPPLICATION`](crate::Signal::NEEDS_REAPPLICATION)
/// when only the mapping moved.
pub trait Scale: core::fmt::Debug {
    /// The scale's notification bus.
    fn bus(&self) -> &Rc<SignalBus>;
    /// The scale family.
    fn kind(&self) -> ScaleKind;
    /// Maps a value to a ratio, nominally in `[0, 1]`.
    fn transform(&self, value: &Value) -> f64;
    /// Returns `true` if the value cannot be placed on this scale.
    fn is_missing(&self, value: &Value) -> bool;
    /// The width of one point as a ratio of the full range.
    fn point_width_ratio(&self) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_linear_is_scatter() {
        assert!(ScaleKind::Linear.is_scatter());
        assert!(!ScaleKind::Ordinal.is_scatter());
    }
}
