//! Coordinate lookup, selection, rolling and stacking.

use ndarray::{Axis, IxDyn, Slice};
use std::ops::Range;

use super::{Dim, LabeledArray};
use crate::types::{BispecError, BispecResult};

/// Coordinates are compared with a few ulps of slack so that values computed
/// as sums of other coordinates still match.
fn coord_eq(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= 4.0 * f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}

impl<T: Clone> LabeledArray<T> {
    /// Position of `value` on the named axis.
    pub fn index_of(&self, dim: &str, value: f64) -> BispecResult<usize> {
        self.coords(dim)?
            .iter()
            .position(|&c| coord_eq(c, value))
            .ok_or_else(|| BispecError::CoordinateNotFound {
                dim: dim.to_string(),
                value,
            })
    }

    /// Keep the positions `range` of the named axis.
    ///
    /// Selecting the whole axis returns a view of the same buffer.
    pub fn islice(&self, dim: &str, range: Range<usize>) -> BispecResult<Self> {
        let axis = self.axis_of(dim)?;
        let len = self.dims[axis].len();
        if range.start > range.end || range.end > len {
            return Err(BispecError::ShapeMismatch(format!(
                "range {:?} out of bounds for axis `{}` of length {}",
                range, dim, len
            )));
        }
        if range.start == 0 && range.end == len {
            return Ok(self.clone());
        }
        let data = self
            .data
            .slice_axis(Axis(axis), Slice::from(range.clone()))
            .to_owned();
        let mut dims = self.dims.clone();
        dims[axis] = Dim::new(dim, &self.dims[axis].coords()[range]);
        Ok(Self::from_parts(data, dims))
    }

    /// Keep every coordinate `>= start` along an ascending axis.
    ///
    /// This is the half-open slice `[start, +inf)`: the kept positions are
    /// the contiguous tail found by binary search, so the axis must be
    /// sorted.
    pub fn sel_from(&self, dim: &str, start: f64) -> BispecResult<Self> {
        let coords = self.coords(dim)?;
        let first = coords.partition_point(|&c| c < start);
        self.islice(dim, first..coords.len())
    }

    /// Index a single position, dropping the axis.
    pub fn isel(&self, dim: &str, index: usize) -> BispecResult<Self> {
        let axis = self.axis_of(dim)?;
        if index >= self.dims[axis].len() {
            return Err(BispecError::ShapeMismatch(format!(
                "index {} out of bounds for axis `{}` of length {}",
                index,
                dim,
                self.dims[axis].len()
            )));
        }
        let data = self.data.index_axis(Axis(axis), index).to_owned();
        let mut dims = self.dims.clone();
        dims.remove(axis);
        Ok(Self::from_parts(data, dims))
    }

    /// Select a single coordinate value, dropping the axis.
    pub fn sel_value(&self, dim: &str, value: f64) -> BispecResult<Self> {
        self.isel(dim, self.index_of(dim, value)?)
    }

    /// Element at the given coordinate of every axis.
    pub fn value_at(&self, point: &[(&str, f64)]) -> BispecResult<T> {
        if point.len() != self.ndim() {
            return Err(BispecError::ShapeMismatch(format!(
                "point names {} axes, array has {}",
                point.len(),
                self.ndim()
            )));
        }
        let mut index = vec![0usize; self.ndim()];
        for &(dim, value) in point {
            index[self.axis_of(dim)?] = self.index_of(dim, value)?;
        }
        Ok(self.data[IxDyn(&index)].clone())
    }

    /// Pointwise selection of coordinate pairs on two axes.
    ///
    /// Entry `k` of the new axis `new_dim` holds the slice at
    /// `(dims.0 = pairs[k].0, dims.1 = pairs[k].1)`.
    pub fn sel_pairs(
        &self,
        dims: (&str, &str),
        pairs: &[(f64, f64)],
        new_dim: &str,
    ) -> BispecResult<Self> {
        let parts = pairs
            .iter()
            .map(|&(a, b)| self.sel_value(dims.0, a)?.sel_value(dims.1, b))
            .collect::<BispecResult<Vec<_>>>()?;
        Self::stack(&parts, Dim::range(new_dim, pairs.len()))
    }

    /// Rotate values along an axis by `shift` positions, leaving the
    /// coordinates where they are.
    ///
    /// Position `k` of the result holds the value from position
    /// `(k - shift) mod len`.
    pub fn roll(&self, dim: &str, shift: isize) -> BispecResult<Self> {
        let axis = self.axis_of(dim)?;
        let len = self.dims[axis].len();
        if len == 0 {
            return Ok(self.clone());
        }
        let s = shift.rem_euclid(len as isize) as usize;
        if s == 0 {
            return Ok(self.clone());
        }
        let view = self.data.view();
        let tail = view.slice_axis(Axis(axis), Slice::from(len - s..));
        let head = view.slice_axis(Axis(axis), Slice::from(..len - s));
        let data = ndarray::concatenate(Axis(axis), &[tail, head])
            .map_err(|e| BispecError::ShapeMismatch(e.to_string()))?;
        Ok(Self::from_parts(data, self.dims.clone()))
    }

    /// Add a leading length-one axis.
    pub fn expand_dim(&self, dim: Dim) -> BispecResult<Self> {
        if dim.len() != 1 {
            return Err(BispecError::ShapeMismatch(format!(
                "new axis `{}` must have exactly one coordinate",
                dim.name()
            )));
        }
        if self.has_dim(dim.name()) {
            return Err(BispecError::DuplicateAxis(dim.name().to_string()));
        }
        let data = self.data.view().insert_axis(Axis(0)).to_owned();
        let mut dims = Vec::with_capacity(self.ndim() + 1);
        dims.push(dim);
        dims.extend(self.dims.iter().cloned());
        Ok(Self::from_parts(data, dims))
    }

    /// Stack equally labeled arrays along a new leading axis.
    pub fn stack(parts: &[Self], dim: Dim) -> BispecResult<Self> {
        let first = parts
            .first()
            .ok_or_else(|| BispecError::EmptyAxis(dim.name().to_string()))?;
        if dim.len() != parts.len() {
            return Err(BispecError::ShapeMismatch(format!(
                "{} arrays stacked on axis `{}` with {} coordinates",
                parts.len(),
                dim.name(),
                dim.len()
            )));
        }
        if first.has_dim(dim.name()) {
            return Err(BispecError::DuplicateAxis(dim.name().to_string()));
        }
        for part in &parts[1..] {
            ensure_same_dims(first, part, None)?;
        }
        let views: Vec<_> = parts.iter().map(|p| p.data.view()).collect();
        let data = ndarray::stack(Axis(0), &views)
            .map_err(|e| BispecError::ShapeMismatch(e.to_string()))?;
        let mut dims = Vec::with_capacity(first.ndim() + 1);
        dims.push(dim);
        dims.extend(first.dims.iter().cloned());
        Ok(Self::from_parts(data, dims))
    }

    /// Join arrays along an existing axis; all other axes must agree.
    pub fn concat(parts: &[Self], dim: &str) -> BispecResult<Self> {
        let first = parts
            .first()
            .ok_or_else(|| BispecError::EmptyAxis(dim.to_string()))?;
        if parts.len() == 1 {
            return Ok(first.clone());
        }
        let axis = first.axis_of(dim)?;
        for part in &parts[1..] {
            ensure_same_dims(first, part, Some(dim))?;
        }
        let views: Vec<_> = parts.iter().map(|p| p.data.view()).collect();
        let data = ndarray::concatenate(Axis(axis), &views)
            .map_err(|e| BispecError::ShapeMismatch(e.to_string()))?;
        let coords: Vec<f64> = parts
            .iter()
            .flat_map(|p| p.dims[axis].coords().iter().copied())
            .collect();
        let mut dims = first.dims.clone();
        dims[axis] = Dim::new(dim, coords);
        Ok(Self::from_parts(data, dims))
    }
}

/// Same axis names in the same order with the same coordinates, except on
/// `skip` where only the name is compared.
fn ensure_same_dims<T>(
    a: &LabeledArray<T>,
    b: &LabeledArray<T>,
    skip: Option<&str>,
) -> BispecResult<()> {
    if a.dim_names() != b.dim_names() {
        return Err(BispecError::ShapeMismatch(format!(
            "axes {:?} and {:?} differ",
            a.dim_names(),
            b.dim_names()
        )));
    }
    for (da, db) in a.dims.iter().zip(&b.dims) {
        if Some(da.name()) != skip && !da.same_coords(db) {
            return Err(BispecError::CoordinateMismatch {
                dim: da.name().to_string(),
                detail: "coordinates differ between joined arrays".into(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum() -> LabeledArray<f64> {
        // value = 10 * frequency position + time position
        let values = (0..5)
            .flat_map(|f| (0..2).map(move |t| (10 * f + t) as f64))
            .collect();
        LabeledArray::from_vec(
            vec![
                Dim::new("frequency", vec![-2.0, -1.0, 0.0, 1.0, 2.0]),
                Dim::new("time", vec![0.0, 1.0]),
            ],
            values,
        )
        .unwrap()
    }

    #[test]
    fn test_sel_from_keeps_tail() {
        let pos = spectrum().sel_from("frequency", 1.0).unwrap();
        assert_eq!(pos.coords("frequency").unwrap(), &[1.0, 2.0]);
        assert_eq!(pos.to_vec(), vec![30.0, 31.0, 40.0, 41.0]);

        let a = spectrum();
        let all = a.sel_from("frequency", -10.0).unwrap();
        assert!(all.shares_buffer(&a));

        let none = spectrum().sel_from("frequency", 5.0).unwrap();
        assert_eq!(none.len_of("frequency").unwrap(), 0);
    }

    #[test]
    fn test_roll_moves_values_not_coordinates() {
        let rolled = spectrum().roll("frequency", 2).unwrap();
        assert_eq!(
            rolled.coords("frequency").unwrap(),
            &[-2.0, -1.0, 0.0, 1.0, 2.0]
        );
        let column: Vec<f64> = rolled.isel("time", 0).unwrap().to_vec();
        assert_eq!(column, vec![30.0, 40.0, 0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_roll_wraps_shift() {
        let a = spectrum();
        assert_eq!(a.roll("frequency", 5).unwrap().to_vec(), a.to_vec());
        assert_eq!(
            a.roll("frequency", -1).unwrap().to_vec(),
            a.roll("frequency", 4).unwrap().to_vec()
        );
    }

    #[test]
    fn test_isel_and_sel_value() {
        let a = spectrum();
        let at_one = a.sel_value("frequency", 1.0).unwrap();
        assert_eq!(at_one.dim_names(), vec!["time"]);
        assert_eq!(at_one.to_vec(), vec![30.0, 31.0]);
        assert!(matches!(
            a.sel_value("frequency", 0.5),
            Err(BispecError::CoordinateNotFound { .. })
        ));
    }

    #[test]
    fn test_value_at() {
        let a = spectrum();
        let v = a.value_at(&[("time", 1.0), ("frequency", -1.0)]).unwrap();
        assert_eq!(v, 11.0);
        assert!(a.value_at(&[("time", 1.0)]).is_err());
    }

    #[test]
    fn test_sel_pairs() {
        let a = spectrum();
        let picked = a
            .sel_pairs(("frequency", "time"), &[(2.0, 0.0), (-2.0, 1.0)], "p")
            .unwrap();
        assert_eq!(picked.dim_names(), vec!["p"]);
        assert_eq!(picked.to_vec(), vec![40.0, 1.0]);
    }

    #[test]
    fn test_stack_adds_leading_axis() {
        let a = spectrum();
        let stacked = LabeledArray::stack(
            &[a.clone(), a.map(|x| -x)],
            Dim::new("run", vec![0.5, 1.5]),
        )
        .unwrap();
        assert_eq!(stacked.dim_names(), vec!["run", "frequency", "time"]);
        assert_eq!(stacked.shape(), &[2, 5, 2]);
        assert_eq!(
            stacked.value_at(&[("run", 1.5), ("frequency", 2.0), ("time", 1.0)]).unwrap(),
            -41.0
        );
    }

    #[test]
    fn test_stack_rejects_mismatched_parts() {
        let a = spectrum();
        let b = a.sel_from("frequency", 0.0).unwrap();
        assert!(LabeledArray::stack(&[a, b], Dim::range("run", 2)).is_err());
    }

    #[test]
    fn test_concat_along_axis() {
        let a = spectrum();
        let low = a.islice("frequency", 0..2).unwrap();
        let high = a.islice("frequency", 2..5).unwrap();
        let joined = LabeledArray::concat(&[low, high], "frequency").unwrap();
        assert_eq!(joined.to_vec(), a.to_vec());
        assert_eq!(joined.coords("frequency").unwrap(), a.coords("frequency").unwrap());
    }

    #[test]
    fn test_expand_dim() {
        let a = spectrum().expand_dim(Dim::new("f1", vec![0.25])).unwrap();
        assert_eq!(a.dim_names(), vec!["f1", "frequency", "time"]);
        assert_eq!(a.shape(), &[1, 5, 2]);
        assert!(spectrum().expand_dim(Dim::range("f1", 2)).is_err());
    }
}
