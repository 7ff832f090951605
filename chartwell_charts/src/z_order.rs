// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Z-index conventions.
//!
//! Elements stack by z-index inside their container. These constants keep the layers of a chart
//! in a predictable order.

/// Series layers (columns, markers, lines).
pub const SERIES: i32 = 30;

/// Waterfall totals.
pub const TOTALS: i32 = 40;

/// Error bar paths inside a series layer.
pub const ERROR_PATHS: i32 = 45;

/// Point labels.
pub const LABELS: i32 = 50;

/// Chart titles.
pub const TITLES: i32 = 80;
