// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Non-throwing reporting channel.
//!
//! Configuration errors and unsupported-capability warnings are logged through `tracing` with a
//! stable numeric `code`; the operation that triggered them is aborted and leaves prior state
//! untouched.

/// Configuration error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// A scale of the wrong kind was assigned.
    IncorrectScaleType = 2,
    /// An element was drawn without a container.
    NoContainer = 4,
    /// A configuration value could not be applied.
    InvalidConfig = 5,
}

impl ErrorCode {
    /// Returns the stable numeric code.
    #[must_use]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Returns the default message.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::IncorrectScaleType => "Incorrect scale type",
            Self::NoContainer => "Container is not set for drawing",
            Self::InvalidConfig => "Invalid configuration",
        }
    }
}

/// Warning codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum WarningCode {
    /// Error bars were requested on a series that cannot show them.
    SeriesDoesntSupportError = 401,
    /// A mutator was called on a disposed element.
    DisposedElementUsed = 402,
    /// An option name is not in the metadata table.
    UnknownOption = 403,
}

impl WarningCode {
    /// Returns the stable numeric code.
    #[must_use]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Returns the default message.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::SeriesDoesntSupportError => "Series does not support error bars",
            Self::DisposedElementUsed => "Element is already disposed",
            Self::UnknownOption => "Unknown option",
        }
    }
}

/// Reports a configuration error.
pub fn error(code: ErrorCode, detail: &str) {
    tracing::error!(code = code.code(), detail, "{}", code.message());
}

/// Reports a warning.
pub fn warning(code: WarningCode, detail: &str) {
    tracing::warn!(code = code.code(), detail, "{}", code.message());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::IncorrectScaleType.code(), 2);
        assert_eq!(ErrorCode::NoContainer.code(), 4);
        assert_eq!(WarningCode::SeriesDoesntSupportError.code(), 401);
        assert_eq!(WarningCode::DisposedElementUsed.code(), 402);
    }

    #[test]
    fn reporting_without_subscriber_is_silent() {
        error(ErrorCode::NoContainer, "test");
        warning(WarningCode::UnknownOption, "test");
    }
}
