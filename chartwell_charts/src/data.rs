// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tabular data.
//!
//! A [`DataSet`] owns rows of [`Value`]s. [`DataSet::map_as`] creates a [`View`] that names
//! columns through a [`Mapping`]; series iterate a view with a [`RowIterator`]. Row storage is
//! shared copy-on-write, so an iterator keeps reading the snapshot it was created from.

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use chartwell_core::{
    ConfigError, DataIterator, ListenerKey, MetaValue, ObjectId, Signal, SignalBus, Value,
};
use hashbrown::HashMap;

type Rows = Rc<Vec<Vec<Value>>>;

/// Raw rows with a change bus.
pub struct DataSet {
    bus: Rc<SignalBus>,
    rows: RefCell<Rows>,
}

impl fmt::Debug for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSet")
            .field("id", &self.bus.source())
            .field("rows", &self.rows.borrow().len())
            .finish()
    }
}

impl DataSet {
    /// Creates a set from rows.
    #[must_use]
    pub fn new(rows: Vec<Vec<Value>>) -> Rc<Self> {
        Rc::new(Self {
            bus: Rc::new(SignalBus::new(
                ObjectId::next(),
                Signal::DATA_CHANGED | Signal::META_CHANGED,
            )),
            rows: RefCell::new(Rc::new(rows)),
        })
    }

    /// Creates a set from a JSON array of row arrays.
    pub fn from_json(value: &serde_json::Value) -> Result<Rc<Self>, ConfigError> {
        let rows: Vec<Vec<Value>> = crate::config::from_json(value)?;
        Ok(Self::new(rows))
    }

    /// The change bus.
    #[must_use]
    pub fn bus(&self) -> &Rc<SignalBus> {
        &self.bus
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.borrow().len()
    }

    /// Returns a cell, or `None` if the row or column does not exist.
    #[must_use]
    pub fn value(&self, row: usize, column: usize) -> Option<Value> {
        self.rows.borrow().get(row)?.get(column).cloned()
    }

    /// Writes a cell, padding the row with nulls if needed. Returns `false` for a missing row or
    /// an unchanged value.
    pub fn set_value(&self, row: usize, column: usize, value: Value) -> bool {
        {
            let mut rows = self.rows.borrow_mut();
            let Some(cells) = Rc::make_mut(&mut rows).get_mut(row) else {
                return false;
            };
            if cells.get(column) == Some(&value) {
                return false;
            }
            if cells.len() <= column {
                cells.resize(column + 1, Value::Null);
            }
            cells[column] = value;
        }
        self.bus.dispatch(Signal::DATA_CHANGED);
        true
    }

    /// Appends a row.
    pub fn append(&self, row: Vec<Value>) {
        Rc::make_mut(&mut self.rows.borrow_mut()).push(row);
        self.bus.dispatch(Signal::DATA_CHANGED);
    }

    /// Removes and returns a row.
    pub fn remove_row(&self, row: usize) -> Option<Vec<Value>> {
        let removed = {
            let mut rows = self.rows.borrow_mut();
            if row >= rows.len() {
                return None;
            }
            Rc::make_mut(&mut rows).remove(row)
        };
        self.bus.dispatch(Signal::DATA_CHANGED);
        Some(removed)
    }

    /// Creates a mapped view. The view re-dispatches this set's changes on its own bus.
    #[must_use]
    pub fn map_as(self: &Rc<Self>, mapping: Mapping) -> Rc<View> {
        let bus = Rc::new(SignalBus::new(
            ObjectId::next(),
            Signal::DATA_CHANGED | Signal::META_CHANGED,
        ));
        let weak: Weak<SignalBus> = Rc::downgrade(&bus);
        let key = self.bus.listen(move |event| {
            if let Some(bus) = weak.upgrade() {
                bus.dispatch(event.signal);
            }
        });
        Rc::new(View {
            bus,
            set: Rc::clone(self),
            mapping,
            key,
        })
    }

    fn snapshot(&self) -> Rows {
        Rc::clone(&self.rows.borrow())
    }
}

/// Field name to column index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mapping {
    fields: Vec<(String, usize)>,
}

impl Mapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual two-column layout: `x` in column 0, `value` in column 1.
    #[must_use]
    pub fn x_value() -> Self {
        Self::new().field("x", 0).field("value", 1)
    }

    /// Maps `name` to `column`, replacing an earlier entry.
    #[must_use]
    pub fn field(mut self, name: &str, column: usize) -> Self {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = column,
            None => self.fields.push((name.into(), column)),
        }
        self
    }

    /// Returns the column of `name`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, c)| *c)
    }
}

/// A mapped view over a [`DataSet`].
pub struct View {
    bus: Rc<SignalBus>,
    set: Rc<DataSet>,
    mapping: Mapping,
    key: ListenerKey,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.bus.source())
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

impl Drop for View {
    fn drop(&mut self) {
        self.set.bus.unlisten(self.key);
    }
}

impl View {
    /// The view's bus, dispatching [`Signal::DATA_CHANGED`] when the rows change.
    #[must_use]
    pub fn bus(&self) -> &Rc<SignalBus> {
        &self.bus
    }

    /// The underlying set.
    #[must_use]
    pub fn set(&self) -> &Rc<DataSet> {
        &self.set
    }

    /// The field mapping.
    #[must_use]
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.set.row_count()
    }

    /// Reads a mapped field.
    #[must_use]
    pub fn get(&self, row: usize, field: &str) -> Option<Value> {
        self.set.value(row, self.mapping.column(field)?)
    }

    /// Writes a mapped field. Unmapped fields are ignored.
    pub fn set_value(&self, row: usize, field: &str, value: impl Into<Value>) -> bool {
        match self.mapping.column(field) {
            Some(column) => self.set.set_value(row, column, value.into()),
            None => false,
        }
    }

    /// Appends a raw row to the underlying set.
    pub fn append(&self, row: Vec<Value>) {
        self.set.append(row);
    }

    /// Removes a row from the underlying set.
    pub fn remove_row(&self, row: usize) -> Option<Vec<Value>> {
        self.set.remove_row(row)
    }

    /// Returns a fresh cursor over the current rows.
    #[must_use]
    pub fn iterator(&self) -> RowIterator {
        RowIterator {
            rows: self.set.snapshot(),
            mapping: self.mapping.clone(),
            cursor: None,
            meta: HashMap::new(),
        }
    }
}

/// A cursor over a snapshot of a view's rows.
#[derive(Debug)]
pub struct RowIterator {
    rows: Rows,
    mapping: Mapping,
    cursor: Option<usize>,
    meta: HashMap<(usize, String), MetaValue>,
}

impl DataIterator for RowIterator {
    fn advance(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1).min(self.rows.len());
        self.cursor = Some(next);
        next < self.rows.len()
    }

    fn reset(&mut self) {
        self.cursor = None;
    }

    fn index(&self) -> Option<usize> {
        self.cursor.filter(|c| *c < self.rows.len())
    }

    fn get(&self, field: &str) -> Option<Value> {
        let row = self.rows.get(self.index()?)?;
        row.get(self.mapping.column(field)?).cloned()
    }

    fn meta(&self, field: &str) -> Option<MetaValue> {
        let index = self.index()?;
        self.meta.get(&(index, String::from(field))).cloned()
    }

    fn set_meta(&mut self, field: &str, value: MetaValue) {
        if let Some(index) = self.index() {
            self.meta.insert((index, field.into()), value);
        }
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}
