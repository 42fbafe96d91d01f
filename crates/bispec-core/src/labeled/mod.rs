//! # Labeled Arrays
//!
//! N-dimensional arrays whose axes are addressed by name and carry a
//! coordinate vector, the way spectra are usually handled in analysis code:
//!
//! ```text
//!                 time ──►
//!              0.0   1.0   2.0   3.0
//!   frequency ┌─────┬─────┬─────┬─────┐
//!     -0.25   │ X00 │ X01 │ X02 │ X03 │
//!      0.00   │ X10 │ X11 │ X12 │ X13 │
//!      0.25   │ X20 │ X21 │ X22 │ X23 │
//!             └─────┴─────┴─────┴─────┘
//! ```
//!
//! The element buffer is reference counted. Renaming an axis or cloning an
//! array never copies data, so one spectrum can be viewed under several axis
//! roles (`f1`, `f`) at the same time.
//!
//! ## Example
//!
//! ```rust
//! use bispec_core::labeled::{Dim, LabeledArray};
//!
//! let spectrum = LabeledArray::from_vec(
//!     vec![
//!         Dim::new("frequency", vec![-0.25, 0.0, 0.25]),
//!         Dim::new("time", vec![0.0, 1.0]),
//!     ],
//!     vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
//! )
//! .unwrap();
//!
//! let positive = spectrum.sel_from("frequency", 0.1).unwrap();
//! assert_eq!(positive.coords("frequency").unwrap(), &[0.25]);
//!
//! let renamed = spectrum.rename("frequency", "f1").unwrap();
//! assert!(renamed.shares_buffer(&spectrum));
//! ```

mod ops;
mod reduce;
mod select;

use ndarray::{Array2, ArrayD, ArrayViewD, IxDyn};
use std::fmt;
use std::sync::Arc;

use crate::types::{BispecError, BispecResult};

/// A named axis with its coordinate values.
#[derive(Debug, Clone, PartialEq)]
pub struct Dim {
    name: String,
    coords: Arc<[f64]>,
}

impl Dim {
    /// Create an axis from a name and its coordinates.
    pub fn new(name: impl Into<String>, coords: impl Into<Arc<[f64]>>) -> Self {
        Self {
            name: name.into(),
            coords: coords.into(),
        }
    }

    /// Create an axis whose coordinates are the positions `0, 1, .., len - 1`.
    pub fn range(name: impl Into<String>, len: usize) -> Self {
        Self::new(name, (0..len).map(|i| i as f64).collect::<Vec<_>>())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Same coordinates under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coords: Arc::clone(&self.coords),
        }
    }

    pub(crate) fn same_coords(&self, other: &Dim) -> bool {
        Arc::ptr_eq(&self.coords, &other.coords) || self.coords == other.coords
    }
}

/// N-dimensional array with named, coordinate-bearing axes.
#[derive(Clone)]
pub struct LabeledArray<T> {
    data: Arc<ArrayD<T>>,
    dims: Vec<Dim>,
}

impl<T> fmt::Debug for LabeledArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<(&str, usize)> = self.dims.iter().map(|d| (d.name(), d.len())).collect();
        f.debug_struct("LabeledArray").field("dims", &dims).finish()
    }
}

impl<T> LabeledArray<T> {
    /// Wrap an array, checking that every axis has a uniquely named
    /// coordinate vector of matching length.
    pub fn new(data: ArrayD<T>, dims: Vec<Dim>) -> BispecResult<Self> {
        if data.ndim() != dims.len() {
            return Err(BispecError::ShapeMismatch(format!(
                "array has {} axes but {} dims were given",
                data.ndim(),
                dims.len()
            )));
        }
        for (dim, &len) in dims.iter().zip(data.shape()) {
            if dim.len() != len {
                return Err(BispecError::ShapeMismatch(format!(
                    "axis `{}` has {} coordinates for length {}",
                    dim.name(),
                    dim.len(),
                    len
                )));
            }
        }
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].iter().any(|d| d.name == dim.name) {
                return Err(BispecError::DuplicateAxis(dim.name.clone()));
            }
        }
        Ok(Self::from_parts(data, dims))
    }

    /// Build from row-major values laid out along `dims`.
    pub fn from_vec(dims: Vec<Dim>, values: Vec<T>) -> BispecResult<Self> {
        let shape: Vec<usize> = dims.iter().map(Dim::len).collect();
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| BispecError::ShapeMismatch(e.to_string()))?;
        Self::new(data, dims)
    }

    /// Build a two-axis array, e.g. a `frequency × time` spectrogram.
    pub fn from_array2(data: Array2<T>, rows: Dim, cols: Dim) -> BispecResult<Self> {
        Self::new(data.into_dyn(), vec![rows, cols])
    }

    pub(crate) fn from_parts(data: ArrayD<T>, dims: Vec<Dim>) -> Self {
        debug_assert_eq!(data.ndim(), dims.len());
        Self {
            data: Arc::new(data),
            dims,
        }
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    pub fn dim_names(&self) -> Vec<&str> {
        self.dims.iter().map(Dim::name).collect()
    }

    pub fn has_dim(&self, name: &str) -> bool {
        self.dims.iter().any(|d| d.name == name)
    }

    /// Position of the named axis.
    pub fn axis_of(&self, name: &str) -> BispecResult<usize> {
        self.dims
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| BispecError::MissingAxis(name.to_string()))
    }

    pub fn dim(&self, name: &str) -> BispecResult<&Dim> {
        Ok(&self.dims[self.axis_of(name)?])
    }

    pub fn coords(&self, name: &str) -> BispecResult<&[f64]> {
        Ok(self.dim(name)?.coords())
    }

    pub fn len_of(&self, name: &str) -> BispecResult<usize> {
        Ok(self.dim(name)?.len())
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    pub fn view(&self) -> ArrayViewD<'_, T> {
        self.data.view()
    }

    /// Whether both arrays are views of the same element buffer.
    pub fn shares_buffer(&self, other: &LabeledArray<T>) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Give axis `from` the name `to`; the element buffer is shared.
    pub fn rename(&self, from: &str, to: &str) -> BispecResult<Self> {
        let axis = self.axis_of(from)?;
        if from != to && self.has_dim(to) {
            return Err(BispecError::DuplicateAxis(to.to_string()));
        }
        let mut dims = self.dims.clone();
        dims[axis] = dims[axis].renamed(to);
        Ok(Self {
            data: Arc::clone(&self.data),
            dims,
        })
    }
}

impl<T: Clone> LabeledArray<T> {
    /// Apply `f` to every element, keeping the axes.
    pub fn map<U, G>(&self, f: G) -> LabeledArray<U>
    where
        G: Fn(&T) -> U,
    {
        LabeledArray::from_parts(self.data.map(f), self.dims.clone())
    }

    /// Reorder axes to `order`, which must name every axis exactly once.
    pub fn transpose_to(&self, order: &[&str]) -> BispecResult<Self> {
        if order.len() != self.ndim() {
            return Err(BispecError::ShapeMismatch(format!(
                "cannot transpose {:?} to {:?}",
                self.dim_names(),
                order
            )));
        }
        let perm = order
            .iter()
            .map(|name| self.axis_of(name))
            .collect::<BispecResult<Vec<_>>>()?;
        if perm.iter().enumerate().all(|(i, &p)| i == p) {
            return Ok(self.clone());
        }
        let dims = perm.iter().map(|&p| self.dims[p].clone()).collect();
        let data = self
            .data
            .view()
            .permuted_axes(IxDyn(&perm))
            .as_standard_layout()
            .into_owned();
        Ok(Self::from_parts(data, dims))
    }

    /// Elements in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }

    /// Take the element buffer, copying only if it is shared.
    pub fn into_array(self) -> ArrayD<T> {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| (*shared).clone())
    }
}
