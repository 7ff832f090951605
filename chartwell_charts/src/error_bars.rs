// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error bar settings.
//!
//! Error amounts are numbers or percent strings (`"10%"` is ten percent of the point's own x or
//! value). Point fields with the same names override the settings row by row.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use chartwell_core::{
    ConfigError, ConsistencyState, DataIterator, DescriptorsMeta, ElementCore, OptionValue,
    PropertyMeta, Settings, Signal, SignalBus, Stroke, Theme, Value,
};
use kurbo::{Line, Point};
use serde::{Deserialize, Serialize};

use crate::config::{self, apply_option};
use crate::paint;

/// Which axes show error bars.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// No error bars.
    None,
    /// Horizontal bars only.
    X,
    /// Vertical bars only.
    Value,
    /// Both.
    #[default]
    Both,
}

impl ErrorMode {
    /// Parses a mode name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "none" => Some(Self::None),
            "x" => Some(Self::X),
            "value" => Some(Self::Value),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    /// Returns the mode name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::X => "x",
            Self::Value => "value",
            Self::Both => "both",
        }
    }

    /// Returns `true` if horizontal bars are drawn.
    #[must_use]
    pub fn shows_x(self) -> bool {
        matches!(self, Self::X | Self::Both)
    }

    /// Returns `true` if vertical bars are drawn.
    #[must_use]
    pub fn shows_value(self) -> bool {
        matches!(self, Self::Value | Self::Both)
    }
}

const AMOUNT: PropertyMeta = PropertyMeta::new(
    ConsistencyState::NONE,
    Signal::NEEDS_RECALCULATION.union(Signal::NEEDS_REDRAW),
);
const LOOK: PropertyMeta = PropertyMeta::new(ConsistencyState::NONE, Signal::NEEDS_REDRAW);

const ERROR_META: DescriptorsMeta = DescriptorsMeta::new(&[
    ("mode", AMOUNT),
    ("xError", AMOUNT),
    ("valueError", AMOUNT),
    ("xLowerError", AMOUNT),
    ("xUpperError", AMOUNT),
    ("valueLowerError", AMOUNT),
    ("valueUpperError", AMOUNT),
    ("xErrorWidth", LOOK),
    ("valueErrorWidth", LOOK),
    ("xErrorStroke", LOOK),
    ("valueErrorStroke", LOOK),
]);

const AMOUNT_KEYS: [&str; 6] = [
    "xError",
    "valueError",
    "xLowerError",
    "xUpperError",
    "valueLowerError",
    "valueUpperError",
];

/// Error bar options of one series.
pub struct ErrorSettings {
    core: Rc<ElementCore>,
    settings: Settings,
}

impl fmt::Debug for ErrorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSettings")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ErrorSettings {
    /// Creates settings with theme defaults and no error amounts.
    #[must_use]
    pub fn new(theme: &Theme) -> Self {
        let core = ElementCore::new(
            ConsistencyState::NONE,
            Signal::NEEDS_REDRAW | Signal::NEEDS_RECALCULATION,
        );
        let settings = Settings::new(&core, ERROR_META)
            .with_theme_option("mode", ErrorMode::default().as_str())
            .with_theme_option("xErrorWidth", theme.series.error_width)
            .with_theme_option("valueErrorWidth", theme.series.error_width)
            .with_theme_option("xErrorStroke", theme.series.error_stroke.as_str())
            .with_theme_option("valueErrorStroke", theme.series.error_stroke.as_str());
        Self { core, settings }
    }

    /// The bus the owning series subscribes to.
    #[must_use]
    pub fn bus(&self) -> &Rc<SignalBus> {
        self.core.bus()
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

    /// Returns the mode.
    #[must_use]
    pub fn mode(&self) -> ErrorMode {
        self.get_option("mode")
            .and_then(|v| v.as_str().and_then(ErrorMode::from_name))
            .unwrap_or_default()
    }

    /// Sets the mode.
    pub fn set_mode(&self, mode: ErrorMode) {
        self.set_option("mode", mode.as_str());
    }

    /// Returns `true` if any error amount is configured.
    #[must_use]
    pub fn has_any_error_values(&self) -> bool {
        AMOUNT_KEYS.iter().any(|k| self.settings.has_own_option(k))
    }

    /// Returns the whisker width for the horizontal or vertical bars.
    #[must_use]
    pub fn error_width(&self, horizontal: bool) -> f64 {
        let key = if horizontal { "xErrorWidth" } else { "valueErrorWidth" };
        self.get_option(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
    }

    /// Returns the stroke of the current row, honoring a point-level override.
    #[must_use]
    pub fn error_stroke(&self, horizontal: bool, iterator: &dyn DataIterator) -> Option<Stroke> {
        let key = if horizontal { "xErrorStroke" } else { "valueErrorStroke" };
        let value = iterator
            .get(key)
            .and_then(|v| v.as_str().map(OptionValue::from))
            .or_else(|| self.get_option(key));
        paint::stroke(value.as_ref(), 1.0)
    }

    /// Returns `(lower, upper)` error amounts of the current row. Absent amounts are NaN.
    #[must_use]
    pub fn error_values(&self, horizontal: bool, iterator: &dyn DataIterator) -> (f64, f64) {
        let (both, lower, upper, base) = if horizontal {
            ("xError", "xLowerError", "xUpperError", "x")
        } else {
            ("valueError", "valueLowerError", "valueUpperError", "value")
        };
        let base = iterator.get(base).map_or(f64::NAN, |v| v.to_number());
        let amount = |key: &str| -> Option<f64> {
            let value = match iterator.get(key) {
                Some(Value::Number(n)) => OptionValue::Number(n),
                Some(Value::Str(s)) => OptionValue::Str(s),
                _ => self.get_option(key)?,
            };
            resolve_amount(&value, base)
        };
        let both = amount(both);
        (
            amount(lower).or(both).unwrap_or(f64::NAN),
            amount(upper).or(both).unwrap_or(f64::NAN),
        )
    }

    /// Captures the explicitly set options.
    #[must_use]
    pub fn serialize(&self) -> ErrorConfig {
        let own = |k| self.settings.get_own_option(k);
        ErrorConfig {
            mode: own("mode"),
            x_error: own("xError"),
            value_error: own("valueError"),
            x_lower_error: own("xLowerError"),
            x_upper_error: own("xUpperError"),
            value_lower_error: own("valueLowerError"),
            value_upper_error: own("valueUpperError"),
            x_error_width: own("xErrorWidth"),
            value_error_width: own("valueErrorWidth"),
            x_error_stroke: own("xErrorStroke"),
            value_error_stroke: own("valueErrorStroke"),
        }
    }

    /// Applies the present keys, dispatching at most one signal.
    pub fn setup_by_json(&self, config: &ErrorConfig) {
        self.core.suspend_signals_dispatching();
        for (name, value) in config.entries() {
            apply_option(|n, v| self.settings.set_option(n, v), name, value);
        }
        self.core.resume_signals_dispatching(true);
    }

    /// Applies a JSON object.
    pub fn setup_by_json_value(&self, value: &serde_json::Value) -> Result<(), ConfigError> {
        self.setup_by_json(&config::from_json(value)?);
        Ok(())
    }

    /// Releases the bus listeners.
    pub fn dispose(&self) {
        self.core.dispose();
    }
}

fn resolve_amount(value: &OptionValue, base: f64) -> Option<f64> {
    if let Some(percent) = value.as_percent() {
        let magnitude = if base < 0.0 { -base } else { base };
        return Some(magnitude * percent / 100.0);
    }
    match value {
        OptionValue::Number(n) => Some(*n),
        OptionValue::Str(s) => s.trim().parse().ok(),
        OptionValue::Bool(_) => None,
    }
}

/// Whisker geometry: the bar from `from` to `to` plus a cap of `width` at each end.
pub(crate) fn whiskers(horizontal: bool, from: Point, to: Point, width: f64) -> Vec<Line> {
    let h = width * 0.5;
    let cap = |p: Point| {
        if horizontal {
            Line::new(Point::new(p.x, p.y - h), Point::new(p.x, p.y + h))
        } else {
            Line::new(Point::new(p.x - h, p.y), Point::new(p.x + h, p.y))
        }
    };
    alloc::vec![Line::new(from, to), cap(from), cap(to)]
}

/// Serialized [`ErrorSettings`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorConfig {
    /// `none`, `x`, `value` or `both`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<OptionValue>,
    /// Symmetric x error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_error: Option<OptionValue>,
    /// Symmetric value error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_error: Option<OptionValue>,
    /// Lower x error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_lower_error: Option<OptionValue>,
    /// Upper x error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_upper_error: Option<OptionValue>,
    /// Lower value error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_lower_error: Option<OptionValue>,
    /// Upper value error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_upper_error: Option<OptionValue>,
    /// Horizontal whisker width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_error_width: Option<OptionValue>,
    /// Vertical whisker width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_error_width: Option<OptionValue>,
    /// Horizontal bar stroke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_error_stroke: Option<OptionValue>,
    /// Vertical bar stroke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_error_stroke: Option<OptionValue>,
}

impl ErrorConfig {
    fn entries(&self) -> [(&'static str, Option<&OptionValue>); 11] {
        [
            ("mode", self.mode.as_ref()),
            ("xError", self.x_error.as_ref()),
            ("valueError", self.value_error.as_ref()),
            ("xLowerError", self.x_lower_error.as_ref()),
            ("xUpperError", self.x_upper_error.as_ref()),
            ("valueLowerError", self.value_lower_error.as_ref()),
            ("valueUpperError", self.value_upper_error.as_ref()),
            ("xErrorWidth", self.x_error_width.as_ref()),
            ("valueErrorWidth", self.value_error_width.as_ref()),
            ("xErrorStroke", self.x_error_stroke.as_ref()),
            ("valueErrorStroke", self.value_error_stroke.as_ref()),
        ]
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;
    use core::cell::Cell;

    use serde_json::json;

    use super::*;
    use crate::data::{DataSet, Mapping};

    fn iterator() -> crate::data::RowIterator {
        let set = DataSet::new(vec![
            vec![10.0.into(), 200.0.into(), Value::Null],
            vec![20.0.into(), (-50.0).into(), "5".into()],
        ]);
        set.map_as(Mapping::x_value().field("valueLowerError", 2))
            .iterator()
    }

    #[test]
    fn amounts_resolve_from_settings_and_points() {
        let error = ErrorSettings::new(&Theme::default());
        assert!(!error.has_any_error_values());
        error.set_option("valueError", "10%");
        error.set_option("xUpperError", 3.0);
        assert!(error.has_any_error_values());

        let mut it = iterator();
        it.advance();
        assert_eq!(error.error_values(false, &it), (20.0, 20.0));
        let (lo, hi) = error.error_values(true, &it);
        assert!(lo.is_nan());
        assert_eq!(hi, 3.0);

        it.advance();
        assert_eq!(error.error_values(false, &it), (5.0, 5.0), "point override");
    }

    #[test]
    fn changes_signal_the_owner_once_per_setup() {
        let error = ErrorSettings::new(&Theme::default());
        let hits = Rc::new(Cell::new(Signal::NONE));
        let h = Rc::clone(&hits);
        error.bus().listen(move |e| h.set(h.get() | e.signal));
        error.set_option("xErrorWidth", 4.0);
        assert_eq!(hits.get(), Signal::NEEDS_REDRAW);
        error
            .setup_by_json_value(&json!({ "mode": "x", "xError": 2 }))
            .unwrap();
        assert!(hits.get().contains(Signal::NEEDS_RECALCULATION));
        assert_eq!(error.mode(), ErrorMode::X);
        assert_eq!(error.error_width(true), 4.0);
        assert_eq!(error.error_width(false), 10.0);

        let config = error.serialize();
        let fresh = ErrorSettings::new(&Theme::default());
        fresh.setup_by_json(&config);
        assert_eq!(fresh.serialize(), config);
    }

    #[test]
    fn whiskers_have_caps() {
        let lines = whiskers(false, Point::new(5.0, 0.0), Point::new(5.0, 10.0), 4.0);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], Line::new(Point::new(3.0, 0.0), Point::new(7.0, 0.0)));
    }
}
