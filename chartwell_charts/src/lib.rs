// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chart entities built on `chartwell_core`.
//!
//! Every type here owns an [`ElementCore`](chartwell_core::ElementCore) and repairs itself
//! phase by phase when drawn:
//! - **Data**: [`DataSet`] rows and [`View`] field mappings.
//! - **Scales**: [`LinearScale`] and [`OrdinalScale`].
//! - **Series**: [`ScatterSeries`] in marker, line and bubble variants, with [`ErrorSettings`]
//!   and [`LabelSettings`].
//! - **Waterfall**: [`Total`] columns kept by a [`TotalsStorage`] inside a [`WaterfallChart`].
//! - **Charts**: [`ScatterChart`], [`WaterfallChart`] and [`CirclePackingChart`].
//! - **Text**: the [`Text`] element used for titles.
//!
//! Configuration is typed: each entity has a serde struct whose keys are the option names, with
//! `serialize` / `setup_by_json` to round-trip it.

#![no_std]

extern crate alloc;

pub mod circle_packing;
pub mod config;
pub mod data;
pub mod error_bars;
#[cfg(not(feature = "std"))]
mod float;
pub mod label;
mod layer;
pub mod legend;
pub mod paint;
#[cfg(test)]
mod pipeline_tests;
pub mod scale;
pub mod scatter_chart;
pub mod series;
pub mod symbol;
pub mod text;
pub mod tooltip;
pub mod total;
pub mod totals_storage;
pub mod waterfall_chart;
pub mod z_order;

pub use circle_packing::{
    CircleNode, CirclePackingChart, CirclePackingConfig, DisplayMode, NodeType, Placement,
};
pub use config::StateConfig;
pub use data::{DataSet, Mapping, RowIterator, View};
pub use error_bars::{ErrorConfig, ErrorMode, ErrorSettings};
pub use label::{LabelConfig, LabelSettings};
pub use legend::{LegendCategory, LegendItem};
pub use scale::{LinearScale, OrdinalScale, category_key};
pub use scatter_chart::{ScatterChart, ScatterChartConfig};
pub use series::{
    Clip, ClipConfig, FieldStatistics, ScatterSeries, ScatterSeriesConfig, ScatterSeriesType,
    SeriesStatistics,
};
pub use symbol::Symbol;
pub use text::{Text, TextConfig};
pub use tooltip::{FormatContext, TextTooltip, Tooltip};
pub use total::{DrawingCoordinates, DrawingData, Total, TotalConfig, TotalStateConfig};
pub use totals_storage::{TotalsStorage, TotalsStorageConfig};
pub use waterfall_chart::{WaterfallChart, WaterfallColumn, WaterfallConfig};
