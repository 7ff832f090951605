// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Legend item data.
//!
//! Charts collect items from their series and totals storages during the `legend` phase.
//! Laying items out is left to the host.

use alloc::string::String;

use chartwell_core::{ObjectId, Stroke};
use peniko::Brush;

/// What produced a legend item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LegendCategory {
    /// A series.
    Series,
    /// The totals of a waterfall chart.
    Total,
}

/// One legend entry.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendItem {
    /// Entry text.
    pub text: String,
    /// Source kind.
    pub category: LegendCategory,
    /// Whether the icon is drawn.
    pub icon_enabled: bool,
    /// Icon fill.
    pub icon_fill: Option<Brush>,
    /// Icon stroke.
    pub icon_stroke: Option<Stroke>,
    /// Id of the source object.
    pub source_uid: ObjectId,
    /// Key of the source inside its owner.
    pub source_key: String,
}

impl LegendItem {
    /// Creates an item with an enabled icon and no paint.
    #[must_use]
    pub fn new(text: impl Into<String>, category: LegendCategory, source_uid: ObjectId) -> Self {
        Self {
            text: text.into(),
            category,
            icon_enabled: true,
            icon_fill: None,
            icon_stroke: None,
            source_uid,
            source_key: String::new(),
        }
    }

    /// Sets the icon paint.
    #[must_use]
    pub fn with_icon(mut self, fill: Option<Brush>, stroke: Option<Stroke>) -> Self {
        self.icon_fill = fill;
        self.icon_stroke = stroke;
        self
    }

    /// Sets the source key.
    #[must_use]
    pub fn with_source_key(mut self, key: impl Into<String>) -> Self {
        self.source_key = key.into();
        self
    }
}
