// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tooltip boundary and token formatting.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use chartwell_core::Value;
use kurbo::Point;

/// Named values substituted into `{%token}` placeholders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormatContext {
    tokens: Vec<(String, Value)>,
}

impl FormatContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a token.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.tokens.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.tokens.push((name.into(), value)),
        }
        self
    }

    /// Returns a token value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.tokens.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Replaces every `{%token}` in `template`. Unknown tokens render empty.
    #[must_use]
    pub fn format(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{%") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            if let Some(value) = self.get(&after[..end]) {
                out.push_str(&display(value));
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Str(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
    }
}

/// Shows formatted information next to the pointer.
pub trait Tooltip: fmt::Debug {
    /// Shows the tooltip at `(x, y)` with content built from `context`.
    fn show_float(&self, x: f64, y: f64, context: &FormatContext);
    /// Hides the tooltip.
    fn hide(&self);
}

/// A tooltip that keeps its formatted text and position for the host to render.
#[derive(Debug)]
pub struct TextTooltip {
    format: RefCell<String>,
    content: RefCell<String>,
    position: Cell<Point>,
    visible: Cell<bool>,
}

impl TextTooltip {
    /// Creates a hidden tooltip with the `"{%name}: {%value}"` format.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            format: RefCell::new("{%name}: {%value}".into()),
            content: RefCell::new(String::new()),
            position: Cell::new(Point::ZERO),
            visible: Cell::new(false),
        })
    }

    /// Sets the content template.
    pub fn set_format(&self, format: &str) {
        *self.format.borrow_mut() = format.into();
    }

    /// Returns `true` while shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Returns the last formatted content.
    #[must_use]
    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }

    /// Returns the last anchor position.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position.get()
    }
}

impl Tooltip for TextTooltip {
    fn show_float(&self, x: f64, y: f64, context: &FormatContext) {
        let content = context.format(&self.format.borrow());
        *self.content.borrow_mut() = content;
        self.position.set(Point::new(x, y));
        self.visible.set(true);
    }

    fn hide(&self) {
        self.visible.set(false);
    }
}
