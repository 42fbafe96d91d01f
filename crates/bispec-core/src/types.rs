//! Core types for bispectral analysis
//!
//! This module defines the numeric vocabulary shared by every other module:
//! the precision family of a spectrum, the scalar kinds that may live inside
//! a labeled array, and the error type returned by all fallible operations.
//!
//! ## Precision
//!
//! A spectrum is complex-valued, `Complex<F>`. Every real quantity derived
//! from it (powers, norms, bicoherence) is computed in the same precision `F`,
//! and the default noise threshold is `F::epsilon()`:
//!
//! ```text
//!   Complex<f64> spectrum ──► f64 powers ──► noise level 2.22e-16
//!   Complex<f32> spectrum ──► f32 powers ──► noise level 1.19e-7
//! ```

use num_complex::Complex;
use num_traits::{Float, FromPrimitive, Zero};
use std::fmt::{Debug, Display};
use std::ops::{Add, Div};

/// Double precision complex spectrum value
pub type Complex64 = Complex<f64>;

/// Single precision complex spectrum value
pub type Complex32 = Complex<f32>;

/// Result type for bispectral operations
pub type BispecResult<T> = Result<T, BispecError>;

/// Floating point precision family of a spectrum (`f32` or `f64`).
pub trait Real: Float + FromPrimitive + Default + Debug + Display + Element {}

impl Real for f32 {}

impl Real for f64 {}

/// Scalar that can be stored, averaged, and marked undefined inside a
/// labeled array.
///
/// The null value is NaN (both parts NaN for complex scalars); it stands for
/// "undefined" wherever a reduction window does not fit or a denominator is
/// masked.
pub trait Element:
    Copy
    + Zero
    + FromPrimitive
    + Add<Output = Self>
    + Div<Output = Self>
    + Debug
    + Send
    + Sync
    + 'static
{
    /// The undefined value.
    fn null() -> Self;

    /// Whether this value is undefined.
    fn is_null(&self) -> bool;
}

impl Element for f32 {
    #[inline]
    fn null() -> Self {
        f32::NAN
    }

    #[inline]
    fn is_null(&self) -> bool {
        self.is_nan()
    }
}

impl Element for f64 {
    #[inline]
    fn null() -> Self {
        f64::NAN
    }

    #[inline]
    fn is_null(&self) -> bool {
        self.is_nan()
    }
}

impl<F: Real> Element for Complex<F> {
    #[inline]
    fn null() -> Self {
        Complex::new(F::nan(), F::nan())
    }

    #[inline]
    fn is_null(&self) -> bool {
        self.re.is_nan() || self.im.is_nan()
    }
}

/// Errors that can occur while building or evaluating a bispectral graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BispecError {
    #[error("Axis `{0}` not found")]
    MissingAxis(String),

    #[error("No strictly positive coordinate on axis `{0}`")]
    NoPositiveFrequency(String),

    #[error("Coordinates of axis `{dim}` do not match: {detail}")]
    CoordinateMismatch { dim: String, detail: String },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Axis `{0}` appears more than once")]
    DuplicateAxis(String),

    #[error("Coordinate {value} not found on axis `{dim}`")]
    CoordinateNotFound { dim: String, value: f64 },

    #[error("Axis `{0}` is empty")]
    EmptyAxis(String),

    #[error("Axis `{0}` is the chunk axis and cannot be processed chunk-wise")]
    ChunkedAxis(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_null_values() {
        assert!(f64::null().is_null());
        assert!(f32::null().is_null());
        assert!(!1.0f64.is_null());
        assert!(!f64::INFINITY.is_null());
    }

    #[test]
    fn test_complex_null_values() {
        assert!(Complex64::null().is_null());
        assert!(Complex::new(f64::NAN, 0.0).is_null());
        assert!(Complex::new(0.0, f32::NAN).is_null());
        assert!(!Complex64::new(1.0, -2.0).is_null());
    }

    #[test]
    fn test_error_messages() {
        let err = BispecError::MissingAxis("time".into());
        assert_eq!(err.to_string(), "Axis `time` not found");

        let err = BispecError::CoordinateNotFound {
            dim: "f".into(),
            value: 0.25,
        };
        assert_eq!(err.to_string(), "Coordinate 0.25 not found on axis `f`");
    }
}
