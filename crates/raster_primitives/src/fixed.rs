// Copyright 2025 the Raster Primitives Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 26.6 and 16.16 signed fixed-point arithmetic.
//!
//! All conversions saturate; none of them panic. Out-of-range inputs clamp to
//! `i32::MIN`/`i32::MAX`, and float-to-fixed conversion truncates toward zero.

/// A 26.6 fixed-point value.
pub type FDot6 = i32;

/// A 16.16 fixed-point value.
pub type FDot16 = i32;

/// Shift that ignores the sign bit, so that shifting a negative value does not
/// overflow in debug builds.
pub const fn left_shift(value: i32, shift: i32) -> i32 {
    ((value as u32) << shift) as i32
}

pub const fn left_shift64(value: i64, shift: i32) -> i64 {
    ((value as u64) << shift) as i64
}

pub mod fdot6 {
    use super::{left_shift, left_shift64, FDot16, FDot6};

    pub const ONE: FDot6 = 64;

    pub fn from_f32(n: f32) -> FDot6 {
        // `as` saturates and maps NaN to 0.
        (n * 64.0) as i32
    }

    pub fn to_f32(n: FDot6) -> f32 {
        n as f32 / 64.0
    }

    pub const fn floor(n: FDot6) -> i32 {
        n >> 6
    }

    pub const fn ceil(n: FDot6) -> i32 {
        (n + 63) >> 6
    }

    pub const fn round(n: FDot6) -> i32 {
        (n + 32) >> 6
    }

    pub const fn to_fdot16(n: FDot6) -> FDot16 {
        left_shift(n, 10)
    }

    /// Converts to 16.16 at half value.
    ///
    /// The quadratic stepper stores its second-order coefficients at half
    /// scale to keep them inside 32 bits, and re-applies the factor of two
    /// while stepping.
    pub const fn to_fdot16_half(n: FDot6) -> FDot16 {
        left_shift(n, 9)
    }

    /// `(a << 16) / b`, saturated to 32 bits.
    ///
    /// A zero denominator yields `i32::MAX` with the sign of the numerator.
    pub fn div(a: FDot6, b: FDot6) -> FDot16 {
        if b == 0 {
            return if a >= 0 { i32::MAX } else { -i32::MAX };
        }

        let v = left_shift64(a as i64, 16) / b as i64;
        v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }
}

pub mod fdot16 {
    use super::FDot16;

    pub const ONE: FDot16 = 1 << 16;

    pub fn from_f32(n: f32) -> FDot16 {
        (n * 65536.0) as i32
    }

    pub fn to_f32(n: FDot16) -> f32 {
        n as f32 / 65536.0
    }

    /// Fixed-point multiply through a 64 bit intermediate.
    pub fn mul(a: FDot16, b: FDot16) -> FDot16 {
        ((a as i64 * b as i64) >> 16).clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }
}
