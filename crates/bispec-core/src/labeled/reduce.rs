//! Reductions along a named axis.
//!
//! ## Centered rolling mean
//!
//! A window of `w` samples is labeled by its center. For output position `i`
//! the window covers `[i - w/2, i - w/2 + w - 1]`; positions whose window
//! runs past either end of the axis are null, so the axis keeps its length:
//!
//! ```text
//!   w = 3      x0   x1   x2   x3   x4
//!   out       NaN   m1   m2   m3  NaN      m2 = (x1 + x2 + x3) / 3
//!
//!   w = 4      x0   x1   x2   x3   x4
//!   out       NaN  NaN   m2   m3  NaN      m2 = (x0 + x1 + x2 + x3) / 4
//! ```

use ndarray::{s, ArrayD, Axis, Zip};

use super::LabeledArray;
use crate::types::{BispecError, BispecResult, Element};

impl<T: Element> LabeledArray<T> {
    /// Arithmetic mean over the named axis, which is removed.
    ///
    /// Null elements propagate into the mean.
    pub fn mean(&self, dim: &str) -> BispecResult<Self> {
        let axis = self.axis_of(dim)?;
        let data = self
            .data
            .mean_axis(Axis(axis))
            .ok_or_else(|| BispecError::EmptyAxis(dim.to_string()))?;
        let mut dims = self.dims.clone();
        dims.remove(axis);
        Ok(Self::from_parts(data, dims))
    }

    /// Centered moving average of `window` samples along the named axis.
    ///
    /// A value is only produced where the full window fits; the axis and its
    /// coordinates are kept.
    pub fn rolling_mean(&self, dim: &str, window: usize) -> BispecResult<Self> {
        if window == 0 {
            return Err(BispecError::InvalidParameter(
                "rolling window must be at least 1".into(),
            ));
        }
        let axis = self.axis_of(dim)?;
        let n = self.dims[axis].len();
        let scale = T::from_usize(window).ok_or_else(|| {
            BispecError::InvalidParameter(format!("window {} not representable", window))
        })?;
        let lead = window / 2;

        let mut out = ArrayD::from_elem(self.data.raw_dim(), T::null());
        Zip::from(out.lanes_mut(Axis(axis)))
            .and(self.data.lanes(Axis(axis)))
            .for_each(|mut dst, src| {
                for i in lead..n {
                    let start = i - lead;
                    if start + window > n {
                        break;
                    }
                    let sum = src
                        .slice(s![start..start + window])
                        .iter()
                        .fold(T::zero(), |acc, &x| acc + x);
                    dst[i] = sum / scale;
                }
            });

        Ok(Self::from_parts(out, self.dims.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeled::Dim;
    use crate::types::Complex64;
    use approx::assert_relative_eq;

    fn series(values: Vec<f64>) -> LabeledArray<f64> {
        let n = values.len();
        LabeledArray::from_vec(vec![Dim::range("time", n)], values).unwrap()
    }

    #[test]
    fn test_mean_removes_axis() {
        let a = LabeledArray::from_vec(
            vec![Dim::range("frequency", 2), Dim::range("time", 3)],
            vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0],
        )
        .unwrap();
        let m = a.mean("time").unwrap();
        assert_eq!(m.dim_names(), vec!["frequency"]);
        assert_relative_eq!(m.to_vec()[0], 2.0);
        assert_relative_eq!(m.to_vec()[1], 20.0);
    }

    #[test]
    fn test_mean_of_empty_axis() {
        let a = series(vec![]);
        assert_eq!(
            a.mean("time").unwrap_err(),
            BispecError::EmptyAxis("time".into())
        );
    }

    #[test]
    fn test_mean_propagates_nan() {
        let m = series(vec![1.0, f64::NAN, 3.0]).mean("time").unwrap();
        assert!(m.to_vec()[0].is_nan());
    }

    #[test]
    fn test_rolling_odd_window() {
        let r = series(vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .rolling_mean("time", 3)
            .unwrap();
        let v = r.to_vec();
        assert_eq!(r.len_of("time").unwrap(), 5);
        assert!(v[0].is_nan());
        assert_relative_eq!(v[1], 2.0);
        assert_relative_eq!(v[2], 3.0);
        assert_relative_eq!(v[3], 4.0);
        assert!(v[4].is_nan());
    }

    #[test]
    fn test_rolling_even_window() {
        let r = series(vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .rolling_mean("time", 4)
            .unwrap();
        let v = r.to_vec();
        assert!(v[0].is_nan());
        assert!(v[1].is_nan());
        assert_relative_eq!(v[2], 2.5);
        assert_relative_eq!(v[3], 3.5);
        assert!(v[4].is_nan());
    }

    #[test]
    fn test_rolling_window_edges() {
        let a = series(vec![1.0, 2.0, 3.0]);
        assert_eq!(a.rolling_mean("time", 1).unwrap().to_vec(), a.to_vec());
        assert!(a.rolling_mean("time", 4).unwrap().all_null());
        assert!(matches!(
            a.rolling_mean("time", 0),
            Err(BispecError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rolling_along_inner_axis_of_complex() {
        let values: Vec<Complex64> = (0..8)
            .map(|k| Complex64::new(k as f64, -(k as f64)))
            .collect();
        let a = LabeledArray::from_vec(vec![Dim::range("f", 2), Dim::range("time", 4)], values)
            .unwrap();
        let r = a.rolling_mean("time", 2).unwrap();
        assert_eq!(r.dim_names(), vec!["f", "time"]);
        let v = r.to_vec();
        assert!(v[0].is_null());
        assert_relative_eq!(v[1].re, 0.5);
        assert_relative_eq!(v[3].im, -2.5);
        assert!(v[4].is_null());
        assert_relative_eq!(v[7].re, 6.5);
    }
}
