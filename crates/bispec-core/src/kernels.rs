//! Squared-magnitude kernel
//!
//! `|z|² = re² + im²`, computed without the square root that `norm()` takes.
//! NaN and infinite parts propagate per IEEE rules.

use num_complex::Complex;

use crate::deferred::MapElements;
use crate::types::Real;

/// Squared magnitude of a complex scalar.
#[inline]
pub fn abs_sq<F: Real>(z: Complex<F>) -> F {
    z.re * z.re + z.im * z.im
}

/// Squared magnitude of every sample.
pub fn abs_sq_slice<F: Real>(samples: &[Complex<F>]) -> Vec<F> {
    samples.iter().map(|&z| abs_sq(z)).collect()
}

/// Squared magnitude of every element of an eager or deferred array.
///
/// On a deferred array this only extends the graph.
pub fn apply_abs_sq<F, A>(x: &A) -> A::Output<F>
where
    F: Real,
    A: MapElements<Complex<F>>,
{
    x.map_elements(|&z| abs_sq(z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeled::{Dim, LabeledArray};
    use crate::types::{Complex32, Complex64};
    use approx::assert_relative_eq;

    #[test]
    fn test_abs_sq_matches_norm() {
        for &(re, im) in &[(3.0, 4.0), (-1.5, 0.25), (0.0, 0.0), (1e-3, -7.0)] {
            let z = Complex64::new(re, im);
            assert_relative_eq!(abs_sq(z), re * re + im * im);
            assert_relative_eq!(abs_sq(z), z.norm().powi(2), max_relative = 1e-12);
        }
        assert_eq!(abs_sq(Complex32::new(3.0, 4.0)), 25.0f32);
    }

    #[test]
    fn test_abs_sq_non_finite() {
        assert!(abs_sq(Complex64::new(f64::NAN, 1.0)).is_nan());
        assert_eq!(abs_sq(Complex64::new(f64::INFINITY, 0.0)), f64::INFINITY);
    }

    #[test]
    fn test_abs_sq_slice() {
        let samples = [Complex64::new(1.0, 1.0), Complex64::new(0.0, -2.0)];
        assert_eq!(abs_sq_slice(&samples), vec![2.0, 4.0]);
        assert!(abs_sq_slice::<f64>(&[]).is_empty());
    }

    #[test]
    fn test_deferred_application_matches_eager() {
        let values: Vec<Complex64> = (0..6)
            .map(|k| Complex64::new(k as f64 * 0.5, 1.0 - k as f64))
            .collect();
        let a = LabeledArray::from_vec(vec![Dim::range("f", 3), Dim::range("time", 2)], values)
            .unwrap();

        let eager = apply_abs_sq(&a);
        let lazy = apply_abs_sq(&a.chunk()).compute().unwrap();
        assert_eq!(lazy.dim_names(), eager.dim_names());
        for (x, y) in eager.to_vec().iter().zip(lazy.to_vec()) {
            assert_relative_eq!(*x, y);
        }
    }
}
