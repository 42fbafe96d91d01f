//! Bispectral output dataset
//!
//! Six arrays computed together and sharing the frequency-pair axes
//! `f1` × `f`, plus whatever non-frequency axes survived the reduction:
//!
//! | Field         | Type         | Axes                 |
//! |---------------|--------------|----------------------|
//! | `bispectrum`  | `Complex<F>` | `f1, f, others...`   |
//! | `n1_norm`     | `F`          | `f1, others...`      |
//! | `n_norm`      | `F`          | `f, others...`       |
//! | `v_norm`      | `F`          | `f1, f, others...`   |
//! | `norm`        | `F`          | `f1, f, others...`   |
//! | `bicoherence` | `F`          | `f1, f, others...`   |
//!
//! `bicoherence` is null (NaN) wherever the normalization was too small to
//! be trusted.

use ndarray::Dimension;
use num_complex::Complex;
use std::cmp::Ordering;

use crate::deferred::Block;
use crate::labeled::LabeledArray;
use crate::types::{BispecError, BispecResult, Real};

/// Name of the first frequency axis of the output.
pub const F1_DIM: &str = "f1";

/// Name of the second frequency axis of the output.
pub const F_DIM: &str = "f";

/// Field names in their canonical order.
pub const FIELD_NAMES: [&str; 6] = [
    "bispectrum",
    "n1_norm",
    "n_norm",
    "v_norm",
    "norm",
    "bicoherence",
];

/// Bispectrum, its normalization powers and the squared bicoherence.
#[derive(Debug, Clone)]
pub struct BispectralDataset<F> {
    /// Averaged triple product `n1 · v · conj(n)`.
    pub bispectrum: LabeledArray<Complex<F>>,
    /// Averaged power at `f1`.
    pub n1_norm: LabeledArray<F>,
    /// Averaged power at `f`.
    pub n_norm: LabeledArray<F>,
    /// Averaged power of the shifted second spectrum.
    pub v_norm: LabeledArray<F>,
    /// `n1_norm · n_norm · v_norm`.
    pub norm: LabeledArray<F>,
    /// `|bispectrum|² / norm`, null where `norm` is below the noise level.
    pub bicoherence: LabeledArray<F>,
}

/// A frequency pair whose bicoherence exceeds a detection threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseCoupling<F> {
    /// Coordinate on `f1`.
    pub f1: f64,
    /// Coordinate on `f`.
    pub f: f64,
    /// Squared bicoherence at the pair.
    pub bicoherence: F,
    /// Bispectrum phase (radians) at the pair.
    pub biphase: F,
    /// Coordinates on the remaining axes, in dataset order.
    pub position: Vec<f64>,
}

impl<F: Real> BispectralDataset<F> {
    pub fn field_names() -> &'static [&'static str] {
        &FIELD_NAMES
    }

    /// A real-valued field by name.
    pub fn real_field(&self, name: &str) -> BispecResult<&LabeledArray<F>> {
        match name {
            "n1_norm" => Ok(&self.n1_norm),
            "n_norm" => Ok(&self.n_norm),
            "v_norm" => Ok(&self.v_norm),
            "norm" => Ok(&self.norm),
            "bicoherence" => Ok(&self.bicoherence),
            "bispectrum" => Err(BispecError::InvalidParameter(
                "`bispectrum` is complex-valued".into(),
            )),
            other => Err(BispecError::InvalidParameter(format!(
                "unknown field `{}`",
                other
            ))),
        }
    }

    /// Argument of the bispectrum, in radians.
    pub fn biphase(&self) -> LabeledArray<F> {
        self.bispectrum.map(|z| z.arg())
    }

    /// `true` where the bicoherence is undefined.
    pub fn null_mask(&self) -> LabeledArray<bool> {
        self.bicoherence.is_null()
    }

    /// Values of a real field at the given `(f1, f)` pairs, along a new
    /// `pair` axis.
    pub fn select_pairs(&self, name: &str, pairs: &[(f64, f64)]) -> BispecResult<LabeledArray<F>> {
        self.real_field(name)?.sel_pairs((F1_DIM, F_DIM), pairs, "pair")
    }

    /// All defined bicoherence values above `threshold`, strongest first.
    pub fn phase_couplings(&self, threshold: F) -> BispecResult<Vec<PhaseCoupling<F>>> {
        let bic = &self.bicoherence;
        if bic.dim_names() != self.bispectrum.dim_names() {
            return Err(BispecError::ShapeMismatch(format!(
                "bicoherence axes {:?} differ from bispectrum axes {:?}",
                bic.dim_names(),
                self.bispectrum.dim_names()
            )));
        }
        let a1 = bic.axis_of(F1_DIM)?;
        let a = bic.axis_of(F_DIM)?;

        let mut couplings = Vec::new();
        for (index, &value) in bic.data().indexed_iter() {
            if !value.is_finite() || value <= threshold {
                continue;
            }
            let idx = index.slice();
            let position = bic
                .dims()
                .iter()
                .enumerate()
                .filter(|&(axis, _)| axis != a1 && axis != a)
                .map(|(axis, dim)| dim.coords()[idx[axis]])
                .collect();
            couplings.push(PhaseCoupling {
                f1: bic.dims()[a1].coords()[idx[a1]],
                f: bic.dims()[a].coords()[idx[a]],
                bicoherence: value,
                biphase: self.bispectrum.data()[idx].arg(),
                position,
            });
        }

        couplings.sort_by(|x, y| {
            y.bicoherence
                .partial_cmp(&x.bicoherence)
                .unwrap_or(Ordering::Equal)
        });
        Ok(couplings)
    }
}

/// Join a field along `dim`, or keep the first block when the field does
/// not vary along it.
fn join_field<T: Clone + Send + Sync + 'static>(
    parts: Vec<LabeledArray<T>>,
    dim: &str,
) -> BispecResult<LabeledArray<T>> {
    match parts.first() {
        Some(first) if !first.has_dim(dim) => Ok(first.clone()),
        _ => LabeledArray::concat(&parts, dim),
    }
}

impl<F: Real> Block for BispectralDataset<F> {
    fn concat_blocks(parts: Vec<Self>, dim: &str) -> BispecResult<Self> {
        let n = parts.len();
        let mut bispectrum = Vec::with_capacity(n);
        let mut n1_norm = Vec::with_capacity(n);
        let mut n_norm = Vec::with_capacity(n);
        let mut v_norm = Vec::with_capacity(n);
        let mut norm = Vec::with_capacity(n);
        let mut bicoherence = Vec::with_capacity(n);
        for part in parts {
            bispectrum.push(part.bispectrum);
            n1_norm.push(part.n1_norm);
            n_norm.push(part.n_norm);
            v_norm.push(part.v_norm);
            norm.push(part.norm);
            bicoherence.push(part.bicoherence);
        }
        Ok(Self {
            bispectrum: join_field(bispectrum, dim)?,
            n1_norm: join_field(n1_norm, dim)?,
            n_norm: join_field(n_norm, dim)?,
            v_norm: join_field(v_norm, dim)?,
            norm: join_field(norm, dim)?,
            bicoherence: join_field(bicoherence, dim)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeled::Dim;
    use crate::types::Complex64;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn pair_dims() -> Vec<Dim> {
        vec![Dim::new(F1_DIM, vec![0.25, 0.5]), Dim::new(F_DIM, vec![0.25, 0.5])]
    }

    fn real(values: Vec<f64>) -> LabeledArray<f64> {
        LabeledArray::from_vec(pair_dims(), values).unwrap()
    }

    fn dataset() -> BispectralDataset<f64> {
        BispectralDataset {
            bispectrum: LabeledArray::from_vec(
                pair_dims(),
                vec![
                    Complex64::new(1.0, 0.0),
                    Complex64::new(0.0, 2.0),
                    Complex64::new(-1.0, 0.0),
                    Complex64::new(0.0, 0.0),
                ],
            )
            .unwrap(),
            n1_norm: LabeledArray::from_vec(vec![Dim::new(F1_DIM, vec![0.25, 0.5])], vec![1.0, 2.0])
                .unwrap(),
            n_norm: LabeledArray::from_vec(vec![Dim::new(F_DIM, vec![0.25, 0.5])], vec![1.0, 2.0])
                .unwrap(),
            v_norm: real(vec![1.0, 1.0, 1.0, 0.0]),
            norm: real(vec![1.0, 2.0, 2.0, 0.0]),
            bicoherence: real(vec![0.3, 0.9, 0.5, f64::NAN]),
        }
    }

    #[test]
    fn test_real_field_lookup() {
        let ds = dataset();
        assert_eq!(BispectralDataset::<f64>::field_names().len(), 6);
        for &name in &FIELD_NAMES[1..] {
            assert!(ds.real_field(name).is_ok(), "{}", name);
        }
        assert!(ds.real_field("bispectrum").is_err());
        assert!(ds.real_field("phase").is_err());
    }

    #[test]
    fn test_biphase() {
        let phase = dataset().biphase().to_vec();
        assert_relative_eq!(phase[0], 0.0);
        assert_relative_eq!(phase[1], FRAC_PI_2);
        assert_relative_eq!(phase[2], std::f64::consts::PI);
    }

    #[test]
    fn test_null_mask() {
        assert_eq!(
            dataset().null_mask().to_vec(),
            vec![false, false, false, true]
        );
    }

    #[test]
    fn test_select_pairs() {
        let ds = dataset();
        let picked = ds
            .select_pairs("bicoherence", &[(0.5, 0.25), (0.25, 0.5)])
            .unwrap();
        assert_eq!(picked.dim_names(), vec!["pair"]);
        assert_eq!(picked.to_vec(), vec![0.5, 0.9]);
        assert_eq!(
            ds.select_pairs("n_norm", &[(0.25, 0.25)]).unwrap_err(),
            BispecError::MissingAxis(F1_DIM.into())
        );
    }

    #[test]
    fn test_phase_couplings_sorted_and_skip_null() {
        let couplings = dataset().phase_couplings(0.4).unwrap();
        assert_eq!(couplings.len(), 2);
        assert_eq!((couplings[0].f1, couplings[0].f), (0.25, 0.5));
        assert_relative_eq!(couplings[0].bicoherence, 0.9);
        assert_relative_eq!(couplings[0].biphase, FRAC_PI_2);
        assert_eq!((couplings[1].f1, couplings[1].f), (0.5, 0.25));
        assert!(couplings[1].position.is_empty());
    }

    #[test]
    fn test_concat_blocks_joins_f1_fields_only() {
        let ds = dataset();
        let low = BispectralDataset {
            bispectrum: ds.bispectrum.islice(F1_DIM, 0..1).unwrap(),
            n1_norm: ds.n1_norm.islice(F1_DIM, 0..1).unwrap(),
            n_norm: ds.n_norm.clone(),
            v_norm: ds.v_norm.islice(F1_DIM, 0..1).unwrap(),
            norm: ds.norm.islice(F1_DIM, 0..1).unwrap(),
            bicoherence: ds.bicoherence.islice(F1_DIM, 0..1).unwrap(),
        };
        let high = BispectralDataset {
            bispectrum: ds.bispectrum.islice(F1_DIM, 1..2).unwrap(),
            n1_norm: ds.n1_norm.islice(F1_DIM, 1..2).unwrap(),
            n_norm: ds.n_norm.clone(),
            v_norm: ds.v_norm.islice(F1_DIM, 1..2).unwrap(),
            norm: ds.norm.islice(F1_DIM, 1..2).unwrap(),
            bicoherence: ds.bicoherence.islice(F1_DIM, 1..2).unwrap(),
        };
        let joined = BispectralDataset::concat_blocks(vec![low, high], F1_DIM).unwrap();
        assert_eq!(joined.n_norm.to_vec(), vec![1.0, 2.0]);
        assert_eq!(joined.n1_norm.to_vec(), vec![1.0, 2.0]);
        assert_eq!(joined.norm.to_vec(), ds.norm.to_vec());
        assert_eq!(joined.bicoherence.coords(F1_DIM).unwrap(), &[0.25, 0.5]);
    }
}
