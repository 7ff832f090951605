// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering surface boundary.
//!
//! Elements never touch pixels. They create layers and paths on a [`Surface`], feed them path
//! commands and paint, and attach or detach them. [`Recorder`] is a retained in-memory surface
//! that keeps the resulting node tree for inspection and export.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{BezPath, Point, Rect, Shape, Size};
use peniko::Brush;

/// Handle to a node created by a [`Surface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Stroke paint and width.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    /// Stroke paint.
    pub brush: Brush,
    /// Stroke width in pixels.
    pub width: f64,
}

impl Stroke {
    /// Creates a stroke.
    pub fn new(brush: impl Into<Brush>, width: f64) -> Self {
        Self {
            brush: brush.into(),
            width,
        }
    }
}

/// A positioned, already measured run of text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextRun {
    /// The text.
    pub content: String,
    /// Top-left corner of the run.
    pub origin: Point,
    /// Measured extent.
    pub size: Size,
    /// Font size in pixels.
    pub font_size: f64,
    /// CSS font family.
    pub font_family: String,
}

/// The operations elements need from a vector graphics backend.
///
/// Nodes are layers (which hold other nodes), paths or text. A freshly created node is
/// detached; [`append`](Self::append) attaches it under a layer.
pub trait Surface {
    /// Creates a detached layer.
    fn layer(&mut self) -> NodeId;
    /// Creates a detached, empty path.
    fn path(&mut self) -> NodeId;
    /// Creates a detached, empty text node.
    fn text(&mut self) -> NodeId;
    /// Replaces the content of a text node.
    fn set_text(&mut self, node: NodeId, run: TextRun);
    /// Starts a new subpath.
    fn move_to(&mut self, path: NodeId, p: Point);
    /// Adds a line segment.
    fn line_to(&mut self, path: NodeId, p: Point);
    /// Closes the current subpath.
    fn close(&mut self, path: NodeId);
    /// Sets or clears the fill.
    fn set_fill(&mut self, node: NodeId, fill: Option<Brush>);
    /// Sets or clears the stroke.
    fn set_stroke(&mut self, node: NodeId, stroke: Option<Stroke>);
    /// Clears path geometry, or detaches every child of a layer.
    fn clear(&mut self, node: NodeId);
    /// Detaches the node from its parent without destroying it.
    fn remove(&mut self, node: NodeId);
    /// Attaches `node` as the last child of `parent`, detaching it from any previous parent.
    fn append(&mut self, node: NodeId, parent: NodeId);
    /// Sets the stacking order within the parent.
    fn set_z_index(&mut self, node: NodeId, z_index: i32);
    /// Sets or clears the clip rectangle.
    fn set_clip(&mut self, node: NodeId, clip: Option<Rect>);
    /// Returns the bounding box of the node's geometry, if it has any.
    fn bounds(&self, node: NodeId) -> Option<Rect>;
    /// Destroys the node and its descendants.
    fn release(&mut self, node: NodeId);
}

/// Node payload.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// A group of nodes.
    Layer,
    /// Path geometry.
    Path(BezPath),
    /// A text run.
    Text(TextRun),
}

/// A retained node.
#[derive(Clone, Debug)]
pub struct Node {
    /// Layer or path.
    pub kind: NodeKind,
    /// Parent layer, if attached.
    pub parent: Option<NodeId>,
    /// Attached children in insertion order (layers only).
    pub children: Vec<NodeId>,
    /// Fill paint.
    pub fill: Option<Brush>,
    /// Stroke paint.
    pub stroke: Option<Stroke>,
    /// Stacking order within the parent.
    pub z_index: i32,
    /// Clip rectangle.
    pub clip: Option<Rect>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            fill: None,
            stroke: None,
            z_index: 0,
            clip: None,
        }
    }
}

/// A retained in-memory [`Surface`].
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    nodes: Vec<Option<Node>>,
    ops: u64,
}

impl Recorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node, if it is alive.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Returns the attached children of a node, sorted by z-index (stable for ties).
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut out = node.children.clone();
        out.sort_by_key(|c| self.node(*c).map_or(0, |n| n.z_index));
        out
    }

    /// Returns `true` if the node is alive and has a parent.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.parent.is_some())
    }

    /// Returns the number of mutating calls made so far.
    #[must_use]
    pub fn op_count(&self) -> u64 {
        self.ops
    }

    /// Returns the number of nodes that have not been released.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    fn create(&mut self, kind: NodeKind) -> NodeId {
        self.ops += 1;
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Some(Node::new(kind)));
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.ops += 1;
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    fn path_mut(&mut self, id: NodeId) -> Option<&mut BezPath> {
        match self.node_mut(id) {
            Some(Node {
                kind: NodeKind::Path(path),
                ..
            }) => Some(path),
            _ => None,
        }
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self
            .nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .and_then(|n| n.parent.take());
        if let Some(parent) = parent
            && let Some(Some(p)) = self.nodes.get_mut(parent.0 as usize)
        {
            p.children.retain(|c| *c != id);
        }
    }
}

impl Surface for Recorder {
    fn layer(&mut self) -> NodeId {
        self.create(NodeKind::Layer)
    }

    fn path(&mut self) -> NodeId {
        self.create(NodeKind::Path(BezPath::new()))
    }

    fn text(&mut self) -> NodeId {
        self.create(NodeKind::Text(TextRun::default()))
    }

    fn set_text(&mut self, node: NodeId, run: TextRun) {
        if let Some(Node {
            kind: NodeKind::Text(text),
            ..
        }) = self.node_mut(node)
        {
            *text = run;
        }
    }

    fn move_to(&mut self, path: NodeId, p: Point) {
        if let Some(path) = self.path_mut(path) {
            path.move_to(p);
        }
    }

    fn line_to(&mut self, path: NodeId, p: Point) {
        if let Some(path) = self.path_mut(path) {
            path.line_to(p);
        }
    }

    fn close(&mut self, path: NodeId) {
        if let Some(path) = self.path_mut(path) {
            path.close_path();
        }
    }

    fn set_fill(&mut self, node: NodeId, fill: Option<Brush>) {
        if let Some(n) = self.node_mut(node) {
            n.fill = fill;
        }
    }

    fn set_stroke(&mut self, node: NodeId, stroke: Option<Stroke>) {
        if let Some(n) = self.node_mut(node) {
            n.stroke = stroke;
        }
    }

    fn clear(&mut self, node: NodeId) {
        let children = match self.node_mut(node) {
            Some(Node {
                kind: NodeKind::Path(path),
                ..
            }) => {
                *path = BezPath::new();
                return;
            }
            Some(Node {
                kind: NodeKind::Text(text),
                ..
            }) => {
                text.content.clear();
                text.size = Size::ZERO;
                return;
            }
            Some(n) => core::mem::take(&mut n.children),
            None => return,
        };
        for child in children {
            if let Some(Some(c)) = self.nodes.get_mut(child.0 as usize) {
                c.parent = None;
            }
        }
    }

    fn remove(&mut self, node: NodeId) {
        self.ops += 1;
        self.detach(node);
    }

    fn append(&mut self, node: NodeId, parent: NodeId) {
        self.ops += 1;
        if node == parent || self.node(node).is_none() {
            return;
        }
        if !matches!(self.node(parent).map(|p| &p.kind), Some(NodeKind::Layer)) {
            return;
        }
        self.detach(node);
        if let Some(Some(n)) = self.nodes.get_mut(node.0 as usize) {
            n.parent = Some(parent);
        }
        if let Some(Some(p)) = self.nodes.get_mut(parent.0 as usize) {
            p.children.push(node);
        }
    }

    fn set_z_index(&mut self, node: NodeId, z_index: i32) {
        if let Some(n) = self.node_mut(node) {
            n.z_index = z_index;
        }
    }

    fn set_clip(&mut self, node: NodeId, clip: Option<Rect>) {
        if let Some(n) = self.node_mut(node) {
            n.clip = clip;
        }
    }

    fn bounds(&self, node: NodeId) -> Option<Rect> {
        let n = self.node(node)?;
        match &n.kind {
            NodeKind::Path(path) => {
                if path.elements().is_empty() {
                    None
                } else {
                    Some(path.bounding_box())
                }
            }
            NodeKind::Text(run) => {
                (!run.content.is_empty()).then(|| Rect::from_origin_size(run.origin, run.size))
            }
            NodeKind::Layer => n
                .children
                .iter()
                .filter_map(|c| self.bounds(*c))
                .reduce(|a, b| a.union(b)),
        }
    }

    fn release(&mut self, node: NodeId) {
        self.ops += 1;
        self.detach(node);
        let mut stack = alloc::vec![node];
        while let Some(id) = stack.pop() {
            if let Some(slot) = self.nodes.get_mut(id.0 as usize)
                && let Some(n) = slot.take()
            {
                stack.extend(n.children);
            }
        }
    }
}
