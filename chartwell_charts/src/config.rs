// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared configuration pieces.
//!
//! Every entity has a typed configuration struct. `serialize` captures explicitly set options
//! only, and `setup_by_json` applies only the keys that are present, so applying the output of
//! `serialize` to a fresh entity reproduces the original's observable options.

use chartwell_core::{ConfigError, OptionValue, StateSettings};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Paint options of one interaction state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateConfig {
    /// Fill color, or `"none"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<OptionValue>,
    /// Stroke as `"<color> [<width>]"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<OptionValue>,
    /// Hatch pattern name, or a flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hatch_fill: Option<OptionValue>,
}

impl StateConfig {
    /// Captures the explicitly set paint options of `group`.
    #[must_use]
    pub fn capture(group: &StateSettings) -> Self {
        Self {
            fill: group.get_own_option("fill"),
            stroke: group.get_own_option("stroke"),
            hatch_fill: group.get_own_option("hatchFill"),
        }
    }

    /// Applies the present keys to `group`.
    pub fn apply(&self, group: &StateSettings) {
        apply_option(|n, v| group.set_option(n, v), "fill", self.fill.as_ref());
        apply_option(|n, v| group.set_option(n, v), "stroke", self.stroke.as_ref());
        apply_option(
            |n, v| group.set_option(n, v),
            "hatchFill",
            self.hatch_fill.as_ref(),
        );
    }

    /// Returns `true` if no key is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fill.is_none() && self.stroke.is_none() && self.hatch_fill.is_none()
    }
}

/// Writes `value` through `set` when present.
pub(crate) fn apply_option(
    set: impl FnOnce(&str, OptionValue) -> bool,
    name: &str,
    value: Option<&OptionValue>,
) {
    if let Some(value) = value {
        set(name, value.clone());
    }
}

pub(crate) fn to_json<T: Serialize>(config: &T) -> Result<serde_json::Value, ConfigError> {
    Ok(serde_json::to_value(config)?)
}

pub(crate) fn from_json<T: DeserializeOwned>(value: &serde_json::Value) -> Result<T, ConfigError> {
    Ok(T::deserialize(value)?)
}
