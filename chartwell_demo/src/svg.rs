// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal SVG export of a [`Recorder`] node tree.

use std::fmt::Write as _;

use chartwell_core::{Node, NodeId, NodeKind, Recorder, Stroke, Surface};
use kurbo::Rect;
use peniko::Brush;

/// Writes every attached node under `root` as SVG, children in z-order.
pub(crate) fn to_svg_string(recorder: &Recorder, root: NodeId) -> String {
    let view_box = recorder
        .bounds(root)
        .map(|r| {
            // Add a small padding margin.
            let pad = 10.0;
            Rect::new(r.x0 - pad, r.y0 - pad, r.x1 + pad, r.y1 + pad)
        })
        .unwrap_or_else(|| Rect::new(0.0, 0.0, 100.0, 100.0));

    let mut out = String::new();
    out.push_str(r#"<svg xmlns="http://www.w3.org/2000/svg" "#);
    let _ = writeln!(
        out,
        r#"viewBox="{} {} {} {}" width="{}" height="{}" preserveAspectRatio="xMinYMin meet">"#,
        view_box.x0,
        view_box.y0,
        view_box.width(),
        view_box.height(),
        view_box.width(),
        view_box.height()
    );
    write_node(&mut out, recorder, root);
    out.push_str("</svg>\n");
    out
}

fn write_node(out: &mut String, recorder: &Recorder, id: NodeId) {
    let Some(node) = recorder.node(id) else {
        return;
    };
    match &node.kind {
        NodeKind::Layer => {
            if let Some(clip) = node.clip {
                let _ = writeln!(
                    out,
                    r#"<clipPath id="clip{}"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath>"#,
                    id.0,
                    clip.x0,
                    clip.y0,
                    clip.width(),
                    clip.height()
                );
                let _ = writeln!(out, r#"<g clip-path="url(#clip{})">"#, id.0);
            } else {
                out.push_str("<g>\n");
            }
            for child in recorder.children(id) {
                write_node(out, recorder, child);
            }
            out.push_str("</g>\n");
        }
        NodeKind::Path(path) => {
            if path.elements().is_empty() {
                return;
            }
            let _ = write!(out, r#"<path d="{}""#, path.to_svg());
            write_paint(out, node);
            out.push_str("/>\n");
        }
        NodeKind::Text(run) => {
            if run.content.is_empty() {
                return;
            }
            // Runs are positioned by their top-left corner.
            let _ = write!(
                out,
                r#"<text x="{}" y="{}" font-size="{}" font-family="{}" dominant-baseline="hanging""#,
                run.origin.x,
                run.origin.y,
                run.font_size,
                escape_xml(&run.font_family)
            );
            write_paint(out, node);
            out.push('>');
            out.push_str(&escape_xml(&run.content));
            out.push_str("</text>\n");
        }
    }
}

fn write_paint(out: &mut String, node: &Node) {
    match &node.fill {
        Some(brush) => write_paint_attr(out, "fill", brush),
        None => out.push_str(r#" fill="none""#),
    }
    if let Some(Stroke { brush, width }) = &node.stroke
        && *width > 0.0
    {
        write_paint_attr(out, "stroke", brush);
        let _ = write!(out, r#" stroke-width="{width}""#);
    }
}

fn svg_paint(brush: &Brush) -> (String, Option<f64>) {
    match brush {
        Brush::Solid(color) => {
            let rgba = color.to_rgba8();
            let paint = format!("#{:02x}{:02x}{:02x}", rgba.r, rgba.g, rgba.b);
            let opacity = if rgba.a == 255 {
                None
            } else {
                Some(f64::from(rgba.a) / 255.0)
            };
            (paint, opacity)
        }
        _ => ("none".to_string(), None),
    }
}

fn write_paint_attr(out: &mut String, name: &str, brush: &Brush) {
    let (value, opacity) = svg_paint(brush);
    let _ = write!(out, r#" {name}="{value}""#);
    if let Some(o) = opacity {
        let _ = write!(out, r#" {name}-opacity="{o}""#);
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chartwell_core::TextRun;
    use kurbo::{Point, Size};
    use peniko::color::palette::css;

    use super::*;

    #[test]
    fn layers_nest_and_paths_carry_paint() {
        let mut r = Recorder::new();
        let root = r.layer();
        let p = r.path();
        r.move_to(p, Point::new(0.0, 0.0));
        r.line_to(p, Point::new(10.0, 10.0));
        r.set_fill(p, Some(Brush::Solid(css::RED)));
        r.append(p, root);

        let svg = to_svg_string(&r, root);
        assert!(svg.starts_with("<svg"), "{svg}");
        assert!(svg.contains(r##"fill="#ff0000""##), "{svg}");
        assert!(svg.contains(r#"viewBox="-10 -10 30 30""#), "{svg}");
    }

    #[test]
    fn text_is_escaped() {
        let mut r = Recorder::new();
        let root = r.layer();
        let t = r.text();
        r.set_text(
            t,
            TextRun {
                content: "A & B".into(),
                origin: Point::new(0.0, 0.0),
                size: Size::new(30.0, 12.0),
                font_size: 12.0,
                font_family: "sans-serif".into(),
            },
        );
        r.append(t, root);
        let svg = to_svg_string(&r, root);
        assert!(svg.contains("A &amp; B"), "{svg}");
        assert!(svg.contains(r#"fill="none""#), "{svg}");
    }

    #[test]
    fn clipped_layers_get_a_clip_path() {
        let mut r = Recorder::new();
        let root = r.layer();
        r.set_clip(root, Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
        let svg = to_svg_string(&r, root);
        assert!(svg.contains(&format!(r#"clip-path="url(#clip{})""#, root.0)), "{svg}");
    }
}
