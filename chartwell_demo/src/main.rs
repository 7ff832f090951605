// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chart demos for `chartwell_charts`.
//!
//! Each demo draws into a [`Recorder`], touches one option, redraws, and writes the final node
//! tree to an SVG file in the working directory.

mod svg;

use std::error::Error;
use std::rc::Rc;

use chartwell_charts::{
    CirclePackingChart, DataSet, Mapping, ScatterChart, ScatterSeriesType, TotalConfig,
    WaterfallChart,
};
use chartwell_core::{ElementCore, NodeId, Recorder, Surface, Theme, Value, VisualElement};
use kurbo::Rect;

const VIEW: Rect = Rect::new(0.0, 0.0, 480.0, 320.0);

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let theme = Rc::new(Theme::default());
    let demos = [
        ("scatter", scatter_demo(&theme)?),
        ("waterfall", waterfall_demo(&theme)?),
        ("circle_packing", circle_packing_demo(&theme)?),
    ];

    for (name, svg) in demos {
        let path = format!("chartwell_demo_{name}.svg");
        std::fs::write(&path, svg)?;
        println!("wrote {path}");
    }
    Ok(())
}

fn mount(core: &ElementCore, recorder: &mut Recorder) -> NodeId {
    let root = recorder.layer();
    core.set_container(Some(root));
    core.set_parent_bounds(Some(VIEW));
    root
}

fn report(name: &str, element: &dyn VisualElement, recorder: &Recorder) {
    tracing::info!(
        demo = name,
        repairs = element.core().repair_count(),
        ops = recorder.op_count(),
        nodes = recorder.live_count(),
        "drawn"
    );
}

fn numbers(points: &[(f64, f64)]) -> Vec<Vec<Value>> {
    points
        .iter()
        .map(|(x, y)| vec![Value::from(*x), Value::from(*y)])
        .collect()
}

fn scatter_demo(theme: &Rc<Theme>) -> Result<String, Box<dyn Error>> {
    let mut recorder = Recorder::new();
    let chart = ScatterChart::new(Rc::clone(theme));
    let root = mount(chart.core(), &mut recorder);

    let line = chart.add_series(ScatterSeriesType::Line)?;
    line.set_name("Trend");
    let trend = DataSet::new(numbers(&[(1.0, 3.0), (2.0, 4.5), (3.0, 4.0), (4.0, 6.5)]))
        .map_as(Mapping::x_value());
    line.set_data(Rc::clone(&trend));

    let markers = chart.add_series(ScatterSeriesType::Marker)?;
    markers.set_name("Samples");
    markers.set_data(
        DataSet::new(numbers(&[(1.5, 2.0), (2.5, 5.5), (3.5, 3.0), (4.5, 7.0)]))
            .map_as(Mapping::x_value()),
    );
    chart.draw(&mut recorder)?;

    // A new point widens the y domain; the next draw repairs scales and series only.
    trend.append(vec![Value::from(5.0), Value::from(9.0)]);
    chart.draw(&mut recorder)?;
    report("scatter", chart.as_ref(), &recorder);

    Ok(svg::to_svg_string(&recorder, root))
}

fn waterfall_demo(theme: &Rc<Theme>) -> Result<String, Box<dyn Error>> {
    let mut recorder = Recorder::new();
    let chart = WaterfallChart::new(Rc::clone(theme))?;
    let root = mount(chart.core(), &mut recorder);

    chart.title().set_text("Quarterly result");
    chart.set_data(
        DataSet::new(vec![
            vec![Value::from("Q1"), Value::from(12.0)],
            vec![Value::from("Q2"), Value::from(-4.0)],
            vec![Value::from("Q3"), Value::from(7.0)],
            vec![Value::from("Q4"), Value::from(-2.5)],
        ])
        .map_as(Mapping::x_value()),
    );
    chart
        .totals()
        .add_total(&TotalConfig::at("Q2").with_name("H1"))?;
    let year = chart
        .totals()
        .add_total(&TotalConfig::at("Q4").with_name("Year"))?;
    chart.draw(&mut recorder)?;

    // Repainting a total leaves the computed columns alone.
    year.normal().set_fill("#2e7d32");
    chart.draw(&mut recorder)?;

    // Hover the yearly total so the exported tree shows its hovered paint.
    year.hovered().set_fill("#fbc02d");
    if let Some(coords) = year.drawing_coordinates() {
        let hit = chart.pointer_move(&mut recorder, coords.rect().center())?;
        tracing::info!(hit, "hovered the yearly total");
    }
    report("waterfall", chart.as_ref(), &recorder);

    Ok(svg::to_svg_string(&recorder, root))
}

fn circle_packing_demo(theme: &Theme) -> Result<String, Box<dyn Error>> {
    let mut recorder = Recorder::new();
    let chart = CirclePackingChart::new(theme);
    let root = mount(chart.core(), &mut recorder);

    let node = |depth: f64, value: f64, name: &str| {
        vec![Value::from(depth), Value::from(value), Value::from(name)]
    };
    chart.set_data(
        DataSet::new(vec![
            node(0.0, 20.0, "All"),
            node(1.0, 12.0, "Services"),
            node(2.0, 7.0, "Support"),
            node(2.0, 5.0, "Training"),
            node(1.0, 8.0, "Products"),
            node(2.0, 8.0, "Hardware"),
        ])
        .map_as(
            Mapping::new()
                .field("depth", 0)
                .field("value", 1)
                .field("name", 2),
        ),
    );
    chart.set_hint_depth(1);
    chart.draw(&mut recorder)?;

    chart.set_hint_opacity(0.25);
    chart.draw(&mut recorder)?;
    report("circle_packing", chart.as_ref(), &recorder);

    Ok(svg::to_svg_string(&recorder, root))
}
