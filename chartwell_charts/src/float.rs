// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Float helpers for `no_std` builds.
//!
//! `f64::floor`, `f64::log10` and friends live in `std`. This trait dispatches to `libm` when
//! `std` is off.

pub(crate) trait FloatExt {
    fn floor(self) -> Self;
    fn ceil(self) -> Self;
    fn round(self) -> Self;
    fn log10(self) -> Self;
    fn powf(self, n: Self) -> Self;
    fn sqrt(self) -> Self;
}

#[cfg(all(not(feature = "std"), feature = "libm"))]
impl FloatExt for f64 {
    fn floor(self) -> Self {
        libm::floor(self)
    }

    fn ceil(self) -> Self {
        libm::ceil(self)
    }

    fn round(self) -> Self {
        libm::round(self)
    }

    fn log10(self) -> Self {
        libm::log10(self)
    }

    fn powf(self, n: Self) -> Self {
        libm::pow(self, n)
    }

    fn sqrt(self) -> Self {
        libm::sqrt(self)
    }
}

#[cfg(all(not(feature = "std"), not(feature = "libm")))]
compile_error!("chartwell_charts requires either the `std` or `libm` feature");
