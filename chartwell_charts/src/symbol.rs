// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marker outlines and path emission onto a [`Surface`].

use chartwell_core::{NodeId, Surface};
use kurbo::{BezPath, Circle, Line, PathEl, Point, Shape};

/// Flattening tolerance for curved outlines, in pixels.
const TOLERANCE: f64 = 0.1;

/// Marker shapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// A circle.
    #[default]
    Circle,
    /// An axis-aligned square.
    Square,
    /// A square rotated by 45 degrees.
    Diamond,
    /// A triangle pointing up.
    TriangleUp,
    /// A triangle pointing down.
    TriangleDown,
    /// An X made of two thin bars.
    Cross,
}

impl Symbol {
    /// Parses a marker type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "circle" => Some(Self::Circle),
            "square" => Some(Self::Square),
            "diamond" => Some(Self::Diamond),
            "triangleUp" => Some(Self::TriangleUp),
            "triangleDown" => Some(Self::TriangleDown),
            "cross" => Some(Self::Cross),
            _ => None,
        }
    }

    /// Returns the marker type name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Square => "square",
            Self::Diamond => "diamond",
            Self::TriangleUp => "triangleUp",
            Self::TriangleDown => "triangleDown",
            Self::Cross => "cross",
        }
    }

    /// Returns the outline centered at `center`, using `size` as the diameter or side.
    #[must_use]
    pub fn path(self, center: Point, size: f64) -> BezPath {
        let h = size * 0.5;
        let (cx, cy) = (center.x, center.y);
        match self {
            Self::Circle => Circle::new(center, h).path_elements(TOLERANCE).collect(),
            Self::Square => polygon(&[
                (cx - h, cy - h),
                (cx + h, cy - h),
                (cx + h, cy + h),
                (cx - h, cy + h),
            ]),
            Self::Diamond => polygon(&[(cx, cy - h), (cx + h, cy), (cx, cy + h), (cx - h, cy)]),
            Self::TriangleUp => polygon(&[(cx, cy - h), (cx + h, cy + h), (cx - h, cy + h)]),
            Self::TriangleDown => polygon(&[(cx - h, cy - h), (cx + h, cy - h), (cx, cy + h)]),
            Self::Cross => {
                let t = size * 0.15;
                polygon(&[
                    (cx - h, cy - h + t),
                    (cx - h + t, cy - h),
                    (cx, cy - t),
                    (cx + h - t, cy - h),
                    (cx + h, cy - h + t),
                    (cx + t, cy),
                    (cx + h, cy + h - t),
                    (cx + h - t, cy + h),
                    (cx, cy + t),
                    (cx - h + t, cy + h),
                    (cx - h, cy + h - t),
                    (cx - t, cy),
                ])
            }
        }
    }
}

fn polygon(points: &[(f64, f64)]) -> BezPath {
    let mut p = BezPath::new();
    for (i, pt) in points.iter().enumerate() {
        if i == 0 {
            p.move_to(*pt);
        } else {
            p.line_to(*pt);
        }
    }
    p.close_path();
    p
}

/// Feeds `path` into the surface path `node`, flattening curves.
pub(crate) fn emit_path(surface: &mut dyn Surface, node: NodeId, path: &BezPath) {
    kurbo::flatten(path.iter(), TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => surface.move_to(node, p),
        PathEl::LineTo(p) => surface.line_to(node, p),
        PathEl::ClosePath => surface.close(node),
        _ => {}
    });
}

/// Feeds a closed rectangle into `node`.
pub(crate) fn emit_rect(surface: &mut dyn Surface, node: NodeId, corners: [Point; 4]) {
    surface.move_to(node, corners[0]);
    for p in &corners[1..] {
        surface.line_to(node, *p);
    }
    surface.close(node);
}

/// Feeds open line segments into `node`.
pub(crate) fn emit_lines(surface: &mut dyn Surface, node: NodeId, lines: &[Line]) {
    for line in lines {
        surface.move_to(node, line.p0);
        surface.line_to(node, line.p1);
    }
}
