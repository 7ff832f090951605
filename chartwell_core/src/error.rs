// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for fallible lifecycle operations.

use alloc::string::String;

use thiserror::Error;

/// Errors returned by [`VisualElement::draw`](crate::VisualElement::draw).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DrawError {
    /// The element was disposed.
    #[error("element is already disposed")]
    Disposed,
    /// The element has no container to draw into.
    #[error("element has no container")]
    NoContainer,
    /// A repair phase failed. Earlier phases stay repaired; this and later phases stay dirty.
    #[error("repair phase `{phase}` failed: {reason}")]
    Phase {
        /// Name of the failing phase.
        phase: &'static str,
        /// Human-readable failure description.
        reason: String,
    },
}

impl DrawError {
    /// Convenience constructor for [`DrawError::Phase`].
    pub fn phase(phase: &'static str, reason: impl Into<String>) -> Self {
        Self::Phase {
            phase,
            reason: reason.into(),
        }
    }
}

/// Errors returned when attaching or detaching composite children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AttachError {
    /// The child already belongs to a composite.
    #[error("element already belongs to a composite")]
    AlreadyAttached,
    /// The child or the composite owner was disposed.
    #[error("element is already disposed")]
    Disposed,
    /// The element is not a child of this composite.
    #[error("element is not a child of this composite")]
    NotAChild,
}

/// Errors raised while applying a JSON configuration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid configuration: {message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    /// Creates an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        use alloc::string::ToString;
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::string::ToString;

    use super::*;

    #[test]
    fn phase_error_names_the_phase() {
        let err = DrawError::phase("appearance", "brush missing");
        assert_eq!(
            err.to_string(),
            "repair phase `appearance` failed: brush missing"
        );
    }

    #[test]
    fn config_error_wraps_json_message() {
        let json_err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = ConfigError::from(json_err);
        assert!(err.to_string().starts_with("invalid configuration: "));
        assert!(!err.message().is_empty());
    }
}
