// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property bundles with invalidation metadata.
//!
//! A [`Settings`] bundle belongs to an element and a [`DescriptorsMeta`] table. The table names
//! every recognized property together with the consistency states and signals a change
//! triggers. A bundle has no tracker of its own: a changed value calls the owner's
//! [`invalidate`](ElementCore::invalidate).
//!
//! [`StateSettings`] scopes a bundle to one interaction state. Groups for different states are
//! independent, and [`resolve_state_option`] picks the value that applies while drawing.

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::consistency::ConsistencyState;
use crate::element::ElementCore;
use crate::reporting::{self, WarningCode};
use crate::signal::Signal;

/// A property value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// A flag.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string: colors, names, modes and percent sizes such as `"50%"`.
    Str(String),
}

impl OptionValue {
    /// Returns the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric payload. Numeric strings are not converted.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the flag payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Parses a percent string (`"50%"` yields `50.0`).
    #[must_use]
    pub fn as_percent(&self) -> Option<f64> {
        self.as_str()?.trim().strip_suffix('%')?.trim().parse().ok()
    }

    /// Resolves a number-or-percent size against `total`.
    #[must_use]
    pub fn normalize_size(&self, total: f64) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Str(s) => match self.as_percent() {
                Some(p) => Some(total * p / 100.0),
                None => s.trim().parse().ok(),
            },
            Self::Bool(_) => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.into())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// What a property change triggers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyMeta {
    /// States to dirty. Empty means signal-only.
    pub state: ConsistencyState,
    /// Signal to dispatch.
    pub signal: Signal,
}

impl PropertyMeta {
    /// Creates a meta entry.
    #[must_use]
    pub const fn new(state: ConsistencyState, signal: Signal) -> Self {
        Self { state, signal }
    }
}

/// An ordered, static table of recognized properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorsMeta {
    entries: &'static [(&'static str, PropertyMeta)],
}

impl DescriptorsMeta {
    /// Wraps a static table.
    #[must_use]
    pub const fn new(entries: &'static [(&'static str, PropertyMeta)]) -> Self {
        Self { entries }
    }

    /// Returns the canonical name and meta of a property.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<(&'static str, PropertyMeta)> {
        self.entries.iter().find(|(n, _)| *n == name).copied()
    }

    /// Returns the property names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }
}

/// Interaction states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsState {
    /// No interaction.
    #[default]
    Normal,
    /// Pointer over the element.
    Hovered,
    /// Element selected.
    Selected,
}

impl fmt::Display for SettingsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Hovered => "hovered",
            Self::Selected => "selected",
        })
    }
}

/// A property bundle bound to an owner element.
pub struct Settings {
    owner: Weak<ElementCore>,
    meta: DescriptorsMeta,
    values: RefCell<HashMap<&'static str, OptionValue>>,
    theme: HashMap<&'static str, OptionValue>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("values", &self.values.borrow())
            .field("theme", &self.theme)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new(owner: &Rc<ElementCore>, meta: DescriptorsMeta) -> Self {
        Self {
            owner: Rc::downgrade(owner),
            meta,
            values: RefCell::new(HashMap::new()),
            theme: HashMap::new(),
        }
    }

    /// Adds a theme default. Unknown names are ignored.
    #[must_use]
    pub fn with_theme_option(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        if let Some((name, _)) = self.meta.lookup(name) {
            self.theme.insert(name, value.into());
        }
        self
    }

    /// Returns the metadata table.
    #[must_use]
    pub fn meta(&self) -> DescriptorsMeta {
        self.meta
    }

    /// Sets a property and invalidates the owner if the value changed.
    ///
    /// Returns `false` for unknown names, unchanged values and disposed owners.
    pub fn set_option(&self, name: &str, value: impl Into<OptionValue>) -> bool {
        let Some((name, meta)) = self.meta.lookup(name) else {
            reporting::warning(WarningCode::UnknownOption, name);
            return false;
        };
        let owner = self.owner.upgrade();
        if owner.as_ref().is_some_and(|o| !o.ensure_alive(name)) {
            return false;
        }
        let value = value.into();
        if self.values.borrow().get(name) == Some(&value) {
            return false;
        }
        self.values.borrow_mut().insert(name, value);
        if let Some(owner) = owner {
            owner.invalidate(meta.state, meta.signal);
        }
        true
    }

    /// Returns the own value, falling back to the theme default.
    #[must_use]
    pub fn get_option(&self, name: &str) -> Option<OptionValue> {
        self.get_own_option(name)
            .or_else(|| self.get_theme_option(name))
    }

    /// Returns the explicitly set value.
    #[must_use]
    pub fn get_own_option(&self, name: &str) -> Option<OptionValue> {
        self.values.borrow().get(name).cloned()
    }

    /// Returns the theme default.
    #[must_use]
    pub fn get_theme_option(&self, name: &str) -> Option<OptionValue> {
        self.theme.get(name).cloned()
    }

    /// Returns `true` if the property was explicitly set.
    #[must_use]
    pub fn has_own_option(&self, name: &str) -> bool {
        self.values.borrow().contains_key(name)
    }

    /// Drops an explicit value and invalidates the owner. Returns `false` if nothing was set.
    pub fn remove_option(&self, name: &str) -> bool {
        let Some((name, meta)) = self.meta.lookup(name) else {
            return false;
        };
        if self.values.borrow_mut().remove(name).is_none() {
            return false;
        }
        if let Some(owner) = self.owner.upgrade() {
            owner.invalidate(meta.state, meta.signal);
        }
        true
    }

    /// Returns the explicitly set property names in declaration order.
    #[must_use]
    pub fn option_names(&self) -> Vec<&'static str> {
        let values = self.values.borrow();
        self.meta.names().filter(|n| values.contains_key(n)).collect()
    }
}

/// A property bundle scoped to one interaction state.
#[derive(Debug)]
pub struct StateSettings {
    state: SettingsState,
    inner: Settings,
}

impl StateSettings {
    /// Creates an empty group.
    #[must_use]
    pub fn new(owner: &Rc<ElementCore>, state: SettingsState, meta: DescriptorsMeta) -> Self {
        Self {
            state,
            inner: Settings::new(owner, meta),
        }
    }

    /// Adds a theme default.
    #[must_use]
    pub fn with_theme_option(self, name: &str, value: impl Into<OptionValue>) -> Self {
        Self {
            state: self.state,
            inner: self.inner.with_theme_option(name, value),
        }
    }

    /// Returns the interaction state this group applies to.
    #[must_use]
    pub fn state(&self) -> SettingsState {
        self.state
    }

    /// See [`Settings::set_option`].
    pub fn set_option(&self, name: &str, value: impl Into<OptionValue>) -> bool {
        self.inner.set_option(name, value)
    }

    /// See [`Settings::get_option`].
    #[must_use]
    pub fn get_option(&self, name: &str) -> Option<OptionValue> {
        self.inner.get_option(name)
    }

    /// See [`Settings::get_own_option`].
    #[must_use]
    pub fn get_own_option(&self, name: &str) -> Option<OptionValue> {
        self.inner.get_own_option(name)
    }

    /// See [`Settings::get_theme_option`].
    #[must_use]
    pub fn get_theme_option(&self, name: &str) -> Option<OptionValue> {
        self.inner.get_theme_option(name)
    }

    /// See [`Settings::has_own_option`].
    #[must_use]
    pub fn has_own_option(&self, name: &str) -> bool {
        self.inner.has_own_option(name)
    }

    /// See [`Settings::remove_option`].
    pub fn remove_option(&self, name: &str) -> bool {
        self.inner.remove_option(name)
    }

    /// See [`Settings::option_names`].
    #[must_use]
    pub fn option_names(&self) -> Vec<&'static str> {
        self.inner.option_names()
    }
}

/// The state groups of one element.
#[derive(Clone, Copy, Debug)]
pub struct StateGroups<'a> {
    /// Normal group.
    pub normal: &'a StateSettings,
    /// Hovered group, if the element has one.
    pub hovered: Option<&'a StateSettings>,
    /// Selected group, if the element has one.
    pub selected: Option<&'a StateSettings>,
}

impl<'a> StateGroups<'a> {
    /// Returns the group for `state`, if present.
    #[must_use]
    pub fn group(&self, state: SettingsState) -> Option<&'a StateSettings> {
        match state {
            SettingsState::Normal => Some(self.normal),
            SettingsState::Hovered => self.hovered,
            SettingsState::Selected => self.selected,
        }
    }
}

/// Resolves the value of `name` for drawing in the `active` state.
///
/// Order: point override, active group's own value, active group's theme default, then the
/// normal group's value (own, then theme).
#[must_use]
pub fn resolve_state_option(
    name: &str,
    point_override: Option<&OptionValue>,
    active: SettingsState,
    groups: StateGroups<'_>,
) -> Option<OptionValue> {
    if let Some(v) = point_override {
        return Some(v.clone());
    }
    if let Some(group) = groups.group(active)
        && let Some(v) = group
            .get_own_option(name)
            .or_else(|| group.get_theme_option(name))
    {
        return Some(v);
    }
    groups.normal.get_option(name)
}
