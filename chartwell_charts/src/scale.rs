// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear and ordinal scales.
//!
//! Both implement [`Scale`]. A chart feeds data into a scale during its `scales` phase
//! ([`LinearScale::start_auto_calc`], [`LinearScale::extend_data_range`],
//! [`LinearScale::finish_auto_calc`] or [`OrdinalScale::set_values`]); series only call
//! [`Scale::transform`].

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use chartwell_core::{ObjectId, Scale, ScaleKind, Signal, SignalBus, Value};

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

const SCALE_SIGNALS: Signal = Signal::NEEDS_RECALCULATION.union(Signal::NEEDS_REAPPLICATION);

/// A continuous numeric scale.
#[derive(Debug)]
pub struct LinearScale {
    bus: Rc<SignalBus>,
    minimum: Cell<Option<f64>>,
    maximum: Cell<Option<f64>>,
    inverted: Cell<bool>,
    tick_count: Cell<usize>,
    data_range: Cell<Option<(f64, f64)>>,
    domain: Cell<(f64, f64)>,
}

impl LinearScale {
    /// Creates a scale with an automatic `[0, 1]` domain.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            bus: Rc::new(SignalBus::new(ObjectId::next(), SCALE_SIGNALS)),
            minimum: Cell::new(None),
            maximum: Cell::new(None),
            inverted: Cell::new(false),
            tick_count: Cell::new(5),
            data_range: Cell::new(None),
            domain: Cell::new((0.0, 1.0)),
        })
    }

    /// Returns the explicit minimum.
    #[must_use]
    pub fn minimum(&self) -> Option<f64> {
        self.minimum.get()
    }

    /// Fixes or releases the domain minimum.
    pub fn set_minimum(&self, minimum: Option<f64>) {
        if self.minimum.replace(minimum) != minimum {
            self.apply_domain();
            self.bus.dispatch(Signal::NEEDS_REAPPLICATION);
        }
    }

    /// Returns the explicit maximum.
    #[must_use]
    pub fn maximum(&self) -> Option<f64> {
        self.maximum.get()
    }

    /// Fixes or releases the domain maximum.
    pub fn set_maximum(&self, maximum: Option<f64>) {
        if self.maximum.replace(maximum) != maximum {
            self.apply_domain();
            self.bus.dispatch(Signal::NEEDS_REAPPLICATION);
        }
    }

    /// Returns `true` if the scale maps high values to low ratios.
    #[must_use]
    pub fn inverted(&self) -> bool {
        self.inverted.get()
    }

    /// Flips the mapping direction.
    pub fn set_inverted(&self, inverted: bool) {
        if self.inverted.replace(inverted) != inverted {
            self.bus.dispatch(Signal::NEEDS_REAPPLICATION);
        }
    }

    /// Sets the desired number of tick intervals used to round the automatic domain.
    pub fn set_tick_count(&self, count: usize) {
        if self.tick_count.replace(count.max(1)) != count.max(1) {
            self.apply_domain();
            self.bus.dispatch(Signal::NEEDS_RECALCULATION);
        }
    }

    /// Forgets the data range before a new round of [`extend_data_range`](Self::extend_data_range).
    pub fn start_auto_calc(&self) {
        self.data_range.set(None);
    }

    /// Widens the data range to include `value`. Non-finite values are ignored.
    pub fn extend_data_range(&self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let range = match self.data_range.get() {
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
            None => (value, value),
        };
        self.data_range.set(Some(range));
    }

    /// Resolves the domain from the collected data range. Returns `true` if it moved.
    pub fn finish_auto_calc(&self) -> bool {
        let before = self.domain.get();
        self.apply_domain();
        self.domain.get() != before
    }

    /// Returns the resolved `(min, max)` domain.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        self.domain.get()
    }

    /// Returns the tick values covering the domain.
    #[must_use]
    pub fn ticks(&self) -> Vec<f64> {
        let (lo, hi) = self.domain.get();
        nice_ticks(lo, hi, self.tick_count.get())
            .into_iter()
            .filter(|t| *t >= lo - 1e-9 && *t <= hi + 1e-9)
            .collect()
    }

    fn apply_domain(&self) {
        let (mut lo, mut hi) = self.data_range.get().unwrap_or((0.0, 1.0));
        if lo == hi {
            lo -= 1.0;
            hi += 1.0;
        }
        let ticks = nice_ticks(lo, hi, self.tick_count.get());
        if let (Some(first), Some(last)) = (ticks.first(), ticks.last()) {
            lo = *first;
            hi = *last;
        }
        let lo = self.minimum.get().unwrap_or(lo);
        let hi = self.maximum.get().unwrap_or(hi);
        self.domain.set((lo, hi));
    }
}

impl Scale for LinearScale {
    fn bus(&self) -> &Rc<SignalBus> {
        &self.bus
    }

    fn kind(&self) -> ScaleKind {
        ScaleKind::Linear
    }

    fn transform(&self, value: &Value) -> f64 {
        let (lo, hi) = self.domain.get();
        let span = hi - lo;
        let ratio = if span == 0.0 {
            0.5
        } else {
            (value.to_number() - lo) / span
        };
        if self.inverted.get() { 1.0 - ratio } else { ratio }
    }

    fn is_missing(&self, value: &Value) -> bool {
        !value.to_number().is_finite()
    }
}

/// A discrete category scale. Each category owns an equal band.
#[derive(Debug)]
pub struct OrdinalScale {
    bus: Rc<SignalBus>,
    values: RefCell<Vec<String>>,
}

impl OrdinalScale {
    /// Creates an empty scale.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            bus: Rc::new(SignalBus::new(ObjectId::next(), SCALE_SIGNALS)),
            values: RefCell::new(Vec::new()),
        })
    }

    /// Returns the categories in order.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        self.values.borrow().clone()
    }

    /// Replaces the categories. Returns `true` and dispatches
    /// [`Signal::NEEDS_RECALCULATION`] if they changed.
    pub fn set_values(&self, values: Vec<String>) -> bool {
        if *self.values.borrow() == values {
            return false;
        }
        *self.values.borrow_mut() = values;
        self.bus.dispatch(Signal::NEEDS_RECALCULATION);
        true
    }

    /// Returns the index of `value`'s category.
    #[must_use]
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        let key = category_key(value)?;
        self.values.borrow().iter().position(|v| *v == key)
    }
}

impl Scale for OrdinalScale {
    fn bus(&self) -> &Rc<SignalBus> {
        &self.bus
    }

    fn kind(&self) -> ScaleKind {
        ScaleKind::Ordinal
    }

    fn transform(&self, value: &Value) -> f64 {
        let n = self.values.borrow().len();
        match self.index_of(value) {
            Some(i) if n > 0 => i as f64 / n as f64,
            _ => f64::NAN,
        }
    }

    fn is_missing(&self, value: &Value) -> bool {
        self.index_of(value).is_none()
    }

    fn point_width_ratio(&self) -> f64 {
        match self.values.borrow().len() {
            0 => 0.0,
            n => 1.0 / n as f64,
        }
    }
}

/// The category key of a value: strings as-is, numbers formatted, booleans as words.
#[must_use]
pub fn category_key(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Number(n) if n.is_finite() => Some(format!("{n}")),
        Value::Bool(b) => Some(format!("{b}")),
        _ => None,
    }
}

fn nice_ticks(mut min: f64, mut max: f64, count: usize) -> Vec<f64> {
    if count == 0 || !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }
    if min == max {
        return alloc::vec![min];
    }
    if min > max {
        core::mem::swap(&mut min, &mut max);
    }
    let step = nice_step((max - min) / count as f64);
    if step == 0.0 {
        return alloc::vec![min, max];
    }

    let start = (min / step).floor() * step;
    let stop = (max / step).ceil() * step;

    let n_f = ((stop - start) / step).round();
    let n = if n_f.is_finite() && n_f >= 0.0 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "guarded by finite/non-negative checks and capped at 10k"
        )]
        {
            n_f.min(10_000.0) as u64
        }
    } else {
        0
    };
    (0..=n).map(|i| start + step * i as f64).collect()
}

fn nice_step(step: f64) -> f64 {
    if !step.is_finite() || step <= 0.0 {
        return 0.0;
    }
    let power = step.log10().floor();
    let base = 10_f64.powf(power);
    let error = step / base;
    let nice = if error >= 7.5 {
        10.0
    } else if error >= 3.5 {
        5.0
    } else if error >= 1.5 {
        2.0
    } else {
        1.0
    };
    nice * base
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::*;

    fn counting(scale: &dyn Scale) -> Rc<Cell<Signal>> {
        let seen = Rc::new(Cell::new(Signal::NONE));
        let s = Rc::clone(&seen);
        scale.bus().listen(move |e| s.set(s.get() | e.signal));
        seen
    }

    #[test]
    fn auto_domain_is_rounded_to_ticks() {
        let scale = LinearScale::new();
        scale.start_auto_calc();
        for v in [0.0, 20.0, f64::NAN] {
            scale.extend_data_range(v);
        }
        assert!(scale.finish_auto_calc());
        assert_eq!(scale.domain(), (0.0, 20.0));
        assert_eq!(scale.ticks(), vec![0.0, 5.0, 10.0, 15.0, 20.0]);
        assert!(!scale.finish_auto_calc(), "same data, same domain");
        assert_eq!(scale.transform(&Value::Number(5.0)), 0.25);
    }

    #[test]
    fn flat_data_still_has_a_span() {
        let scale = LinearScale::new();
        scale.start_auto_calc();
        scale.extend_data_range(4.0);
        scale.finish_auto_calc();
        let (lo, hi) = scale.domain();
        assert!(lo < 4.0 && hi > 4.0);
    }

    #[test]
    fn explicit_bounds_reapply() {
        let scale = LinearScale::new();
        let seen = counting(&*scale);
        scale.set_minimum(Some(10.0));
        scale.set_maximum(Some(20.0));
        scale.set_maximum(Some(20.0));
        assert_eq!(seen.get(), Signal::NEEDS_REAPPLICATION);
        assert_eq!(scale.domain(), (10.0, 20.0));
        assert_eq!(scale.transform(&Value::Number(15.0)), 0.5);
        scale.set_inverted(true);
        assert_eq!(scale.transform(&Value::Number(12.0)), 0.8);
        assert!(scale.is_missing(&Value::Null));
        assert!(scale.is_missing(&"x".into()));
        assert!(!scale.is_missing(&"12".into()));
    }

    #[test]
    fn ordinal_bands() {
        let scale = OrdinalScale::new();
        let seen = counting(&*scale);
        assert!(scale.set_values(vec!["a".into(), "b".into(), "2".into(), "total_9".into()]));
        assert!(!scale.set_values(scale.values()));
        assert_eq!(seen.get(), Signal::NEEDS_RECALCULATION);
        assert_eq!(scale.point_width_ratio(), 0.25);
        assert_eq!(scale.transform(&"b".into()), 0.25);
        assert_eq!(scale.transform(&Value::Number(2.0)), 0.5);
        assert!(scale.is_missing(&"zzz".into()));
        assert!(scale.transform(&"zzz".into()).is_nan());
        assert_eq!(scale.kind(), ScaleKind::Ordinal);
    }
}
