//! Elementwise operations with broadcasting by axis name.
//!
//! Two operands are aligned by their axis names rather than their positions.
//! The result carries the left operand's axes followed by any axes only the
//! right operand has:
//!
//! ```text
//!   (f1, time) ⊗ (f1, f, time) ──► (f1, time, f)
//! ```
//!
//! Shared axes must carry identical coordinates.

use ndarray::{ArrayViewD, Axis, IxDyn, Zip};
use num_complex::Complex;

use super::{Dim, LabeledArray};
use crate::types::{BispecError, BispecResult, Element, Real};

/// Permute `array`'s axes into the order of `out` and insert length-one axes
/// for the names it lacks, ready to be broadcast.
fn aligned_view<'a, T>(array: &'a LabeledArray<T>, out: &[Dim]) -> ArrayViewD<'a, T> {
    let perm: Vec<usize> = out
        .iter()
        .filter_map(|d| array.dims.iter().position(|a| a.name == d.name))
        .collect();
    let mut view = array.data.view().permuted_axes(IxDyn(&perm));
    for (pos, dim) in out.iter().enumerate() {
        if !array.has_dim(dim.name()) {
            view = view.insert_axis(Axis(pos));
        }
    }
    view
}

fn union_dims<T, U>(a: &LabeledArray<T>, b: &LabeledArray<U>) -> BispecResult<Vec<Dim>> {
    let mut out = a.dims.clone();
    for dim in &b.dims {
        match out.iter().find(|d| d.name == dim.name) {
            Some(existing) if !existing.same_coords(dim) => {
                return Err(BispecError::CoordinateMismatch {
                    dim: dim.name.clone(),
                    detail: format!(
                        "{} coordinates against {} (or differing values)",
                        existing.len(),
                        dim.len()
                    ),
                });
            }
            Some(_) => {}
            None => out.push(dim.clone()),
        }
    }
    Ok(out)
}

impl<T> LabeledArray<T> {
    /// Combine two arrays elementwise, broadcasting over axes by name.
    pub fn zip_with<U, V, G>(&self, other: &LabeledArray<U>, f: G) -> BispecResult<LabeledArray<V>>
    where
        G: Fn(&T, &U) -> V,
    {
        let dims = union_dims(self, other)?;
        let shape: Vec<usize> = dims.iter().map(Dim::len).collect();

        let lhs = aligned_view(self, &dims);
        let rhs = aligned_view(other, &dims);
        let lhs = lhs
            .broadcast(IxDyn(&shape))
            .ok_or_else(|| BispecError::ShapeMismatch(format!("cannot broadcast to {:?}", shape)))?;
        let rhs = rhs
            .broadcast(IxDyn(&shape))
            .ok_or_else(|| BispecError::ShapeMismatch(format!("cannot broadcast to {:?}", shape)))?;

        let data = Zip::from(lhs).and(rhs).map_collect(|a, b| f(a, b));
        Ok(LabeledArray::from_parts(data, dims))
    }
}

impl<F: Real> LabeledArray<Complex<F>> {
    /// Complex conjugate of every element.
    pub fn conj(&self) -> Self {
        self.map(|z| z.conj())
    }
}

impl<T: Element> LabeledArray<T> {
    /// `true` wherever the element is undefined (NaN).
    pub fn is_null(&self) -> LabeledArray<bool> {
        self.map(Element::is_null)
    }

    /// Keep elements where `mask` is `true`, null elsewhere.
    pub fn where_mask(&self, mask: &LabeledArray<bool>) -> BispecResult<Self> {
        self.zip_with(mask, |&x, &keep| if keep { x } else { T::null() })
    }

    /// Whether every element is undefined.
    pub fn all_null(&self) -> bool {
        self.data.iter().all(Element::is_null)
    }
}
