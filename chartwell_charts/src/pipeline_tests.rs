// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end invalidation tests across charts, their children and their collaborators.

extern crate std;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use chartwell_core::{
    ConsistencyState, DrawError, ElementCore, HasScales, OptionValue, Recorder, Signal, Surface,
    Theme, Value, VisualElement,
};
use kurbo::Rect;

use crate::{
    CirclePackingChart, DataSet, LinearScale, Mapping, ScatterChart, ScatterSeries,
    ScatterSeriesType, Total, TotalConfig, WaterfallChart,
};

fn log(core: &ElementCore) -> Rc<RefCell<Vec<Signal>>> {
    let signals = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&signals);
    core.listen_signals(move |e| s.borrow_mut().push(e.signal));
    signals
}

fn rows(points: &[(f64, f64)]) -> Vec<Vec<Value>> {
    points
        .iter()
        .map(|(x, y)| Vec::from([Value::from(*x), Value::from(*y)]))
        .collect()
}

fn place(core: &ElementCore, r: &mut Recorder) {
    core.set_container(Some(r.layer()));
    core.set_parent_bounds(Some(Rect::new(0.0, 0.0, 400.0, 300.0)));
}

fn assert_second_draw_is_free(element: &dyn VisualElement, r: &mut Recorder) {
    element.draw(r).unwrap();
    assert!(element.core().is_consistent());
    let repairs = element.core().repair_count();
    let ops = r.op_count();
    element.draw(r).unwrap();
    assert_eq!(element.core().repair_count(), repairs);
    assert_eq!(r.op_count(), ops);
}

#[test]
fn clean_draws_repair_nothing() {
    let mut r = Recorder::new();

    let scatter = ScatterChart::new(Rc::new(Theme::default()));
    place(scatter.core(), &mut r);
    let series = scatter.add_series(ScatterSeriesType::Line).unwrap();
    series.set_data(DataSet::new(rows(&[(1.0, 2.0), (2.0, 5.0)])).map_as(Mapping::x_value()));
    assert_second_draw_is_free(scatter.as_ref(), &mut r);

    let waterfall = WaterfallChart::new(Rc::new(Theme::default())).unwrap();
    place(waterfall.core(), &mut r);
    waterfall.set_data(
        DataSet::new(Vec::from([
            Vec::from([Value::from("Q1"), Value::from(5.0)]),
            Vec::from([Value::from("Q2"), Value::from(-2.0)]),
        ]))
        .map_as(Mapping::x_value()),
    );
    waterfall
        .totals()
        .add_total(&TotalConfig::at("Q2"))
        .unwrap();
    waterfall.title().set_text("Quarterly");
    assert_second_draw_is_free(waterfall.as_ref(), &mut r);

    let packing = CirclePackingChart::new(&Theme::default());
    place(packing.core(), &mut r);
    packing.set_data(
        DataSet::new(rows(&[(0.0, 4.0), (1.0, 1.0), (1.0, 3.0)]))
            .map_as(Mapping::new().field("depth", 0).field("value", 1)),
    );
    assert_second_draw_is_free(packing.as_ref(), &mut r);
}

#[test]
fn series_data_changes_translate_into_chart_states_only() {
    let mut r = Recorder::new();
    let chart = ScatterChart::new(Rc::new(Theme::default()));
    place(chart.core(), &mut r);
    let series = chart.add_series(ScatterSeriesType::Marker).unwrap();
    let view = DataSet::new(rows(&[(1.0, 1.0)])).map_as(Mapping::x_value());
    series.set_data(view.clone());
    chart.draw(&mut r).unwrap();

    let signals = log(chart.core());
    view.append(Vec::from([Value::from(2.0), Value::from(2.0)]));
    assert_eq!(
        chart.core().dirty_states(),
        ConsistencyState::RECALCULATION | ConsistencyState::SCALES | ConsistencyState::CHART_SERIES
    );
    assert_eq!(*signals.borrow(), [Signal::NEEDS_REDRAW]);
    // The child's raw signal does not leak through the chart.
    assert!(!signals.borrow()[0].intersects(Signal::DATA_CHANGED));
}

#[test]
fn hovered_and_normal_groups_resolve_independently() {
    let total = Total::new(&Theme::default());
    total.core().mark_consistent(ConsistencyState::ALL);
    total.hovered().set_fill("orange");
    assert_eq!(total.normal().get_option("fill"), Some(OptionValue::from("#64b5f6")));
    assert_eq!(total.normal().settings().get_own_option("fill"), None);

    let series = ScatterSeries::new(&Theme::default(), ScatterSeriesType::Marker, 0);
    series.core().mark_consistent(ConsistencyState::ALL);
    series.hovered().set_option("hatchFill", "diagonal");
    assert_eq!(
        series.core().dirty_states(),
        ConsistencyState::SERIES_HATCH_FILL
    );
    assert_eq!(series.normal().get_own_option("hatchFill"), None);
}

#[test]
fn total_round_trips_through_its_config() {
    let total = Total::new(&Theme::default());
    total.set_x("total_1");
    total.set_name("Total");
    total.set_fill("red");

    let copy = Total::new(&Theme::default());
    copy.setup_by_json(&total.serialize());
    assert_eq!(copy.get_option("x"), Some(OptionValue::from("total_1")));
    assert_eq!(copy.get_option("name"), Some(OptionValue::from("Total")));
    assert_eq!(copy.normal().get_option("fill"), Some(OptionValue::from("red")));

    let json = total.to_json().unwrap();
    let from_json = Total::new(&Theme::default());
    from_json.setup_by_json_value(&json).unwrap();
    assert_eq!(from_json.x().as_deref(), Some("total_1"));
}

#[test]
fn failed_phase_keeps_later_work_dirty() {
    let mut r = Recorder::new();
    let series = ScatterSeries::new(&Theme::default(), ScatterSeriesType::Line, 0);
    series.set_data(DataSet::new(rows(&[(1.0, 1.0)])).map_as(Mapping::x_value()));
    series.set_y_scale(LinearScale::new());
    place(series.core(), &mut r);

    let err = series.draw(&mut r).unwrap_err();
    assert!(matches!(err, DrawError::Phase { phase: "appearance", .. }));
    assert!(!series.core().has_invalidation_state(ConsistencyState::BOUNDS));
    assert!(series.core().has_invalidation_state(ConsistencyState::APPEARANCE));
    assert!(series.core().has_invalidation_state(ConsistencyState::SERIES_LABELS));

    series.set_x_scale(LinearScale::new());
    series.draw(&mut r).unwrap();
    assert!(series.core().is_consistent());
}

#[test]
fn removing_a_total_shrinks_the_storage_and_the_categories() {
    let mut r = Recorder::new();
    let chart = WaterfallChart::new(Rc::new(Theme::default())).unwrap();
    place(chart.core(), &mut r);
    chart.set_data(
        DataSet::new(Vec::from([
            Vec::from([Value::from("A"), Value::from(1.0)]),
            Vec::from([Value::from("B"), Value::from(2.0)]),
        ]))
        .map_as(Mapping::x_value()),
    );
    chart.totals().add_total(&TotalConfig::at("A")).unwrap();
    let last = chart.totals().add_total(&TotalConfig::at("B")).unwrap();
    chart.draw(&mut r).unwrap();
    assert_eq!(chart.x_scale().values().len(), 4);

    let removed = chart.totals().remove_total_at(1).unwrap();
    assert!(Rc::ptr_eq(&removed, &last));
    assert_eq!(chart.totals().all_totals().len(), 1);
    assert!(chart.core().has_invalidation_state(ConsistencyState::RECALCULATION));

    chart.draw(&mut r).unwrap();
    assert_eq!(chart.x_scale().values().len(), 3);
    assert!(removed.core().is_disposed());
    assert!(chart.totals().remove_total_at(7).is_none());
}

#[test]
fn disabled_chart_removes_its_layer_once() {
    let mut r = Recorder::new();
    let chart = ScatterChart::new(Rc::new(Theme::default()));
    place(chart.core(), &mut r);
    chart.draw(&mut r).unwrap();
    let layer = chart.core().container().unwrap();
    assert_eq!(r.children(layer).len(), 1);

    chart.core().set_enabled(false);
    chart.draw(&mut r).unwrap();
    assert!(r.children(layer).is_empty());
    let ops = r.op_count();
    chart.draw(&mut r).unwrap();
    assert_eq!(r.op_count(), ops);
}

#[test]
fn total_setters_reach_the_chart() {
    let mut r = Recorder::new();
    let chart = WaterfallChart::new(Rc::new(Theme::default())).unwrap();
    place(chart.core(), &mut r);
    chart.set_data(
        DataSet::new(Vec::from([
            Vec::from([Value::from("A"), Value::from(1.0)]),
            Vec::from([Value::from("B"), Value::from(2.0)]),
        ]))
        .map_as(Mapping::x_value()),
    );
    let total = chart.totals().add_total(&TotalConfig::at("A")).unwrap();
    chart.draw(&mut r).unwrap();
    assert!(total.core().is_consistent());

    total.set_value(99.0);
    assert!(!chart.core().is_consistent());
    chart.draw(&mut r).unwrap();
    assert!(total.core().is_consistent());
    assert!(chart.core().is_consistent());

    // Querying the running sum leaves the total untouched.
    assert_eq!(chart.total_value(&total.total_x()), Some(1.0));
    assert_eq!(total.value(), 99.0);
    assert!(total.core().is_consistent());
}
