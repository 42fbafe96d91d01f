//! # Bispectral Analysis
//!
//! Computes the bispectrum and the squared bicoherence of complex spectra
//! following Cziegler et al., Phys. Plasmas 20, 055904 (2013):
//!
//! ```text
//!   B(f1, f)   = < n(f1) · v(f - f1) · n*(f) >
//!
//!   b²(f1, f)  =            |B(f1, f)|²
//!                ──────────────────────────────────────
//!                < |n(f1)|² > · < |n(f)|² > · < |v(f - f1)|² >
//! ```
//!
//! where `< >` averages over the averaging axis (plain mean, or a centered
//! rolling mean that keeps the axis). With a single spectrum `v = n` and this
//! is the auto-bispectrum; with two it is the cross-bispectrum.
//!
//! ## Frequency Shifting
//!
//! `f1` and `f` both run over the strictly positive frequencies. For the k-th
//! positive frequency, the second spectrum is rotated by `k + 1` positions
//! along its full signed frequency axis while its coordinates stay put, so
//! that position `f` then holds `v(f - f1)`:
//!
//! ```text
//!   frequency     -2   -1    0    1    2    3
//!   v              a    b    c    d    e    g
//!   roll 1         g    a    b    c    d    e     f1 = 1  ─► keep f >= 1
//!   roll 2         e    g    a    b    c    d     f1 = 2  ─► keep f >= 1
//!   ...
//! ```
//!
//! Each rotation becomes one chunk of a deferred graph stacked along `f1`,
//! so nothing is evaluated until [`Deferred::compute`] is called.
//!
//! ## Example
//!
//! ```rust
//! use bispec_core::prelude::*;
//!
//! let freqs = vec![-0.25, 0.0, 0.25, 0.5];
//! let spectrum = LabeledArray::from_vec(
//!     vec![Dim::new("frequency", freqs), Dim::range("time", 2)],
//!     vec![Complex64::new(1.0, 0.5); 8],
//! )
//! .unwrap();
//!
//! let analyzer = BispectralAnalyzer::new(AnalysisConfig::default()).unwrap();
//! let dataset = analyzer.compute(&spectrum, None).unwrap().compute().unwrap();
//! assert_eq!(dataset.bicoherence.dim_names(), vec!["f1", "f"]);
//! ```

use num_complex::Complex;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::dataset::{BispectralDataset, F1_DIM, F_DIM};
use crate::deferred::Deferred;
use crate::kernels::{abs_sq, apply_abs_sq};
use crate::labeled::LabeledArray;
use crate::types::{BispecError, BispecResult, Element, Real};

/// Reduction over the averaging axis.
#[derive(Debug, Clone)]
struct Averaging {
    dim: String,
    window: Option<usize>,
}

impl Averaging {
    fn new(config: &AnalysisConfig) -> Self {
        Self {
            dim: config.avg_dim.clone(),
            window: config.avg_rolling,
        }
    }

    fn eager<T: Element>(&self, a: &LabeledArray<T>) -> BispecResult<LabeledArray<T>> {
        match self.window {
            Some(window) => a.rolling_mean(&self.dim, window),
            None => a.mean(&self.dim),
        }
    }

    fn deferred<T: Element>(
        &self,
        a: &Deferred<LabeledArray<T>>,
    ) -> BispecResult<Deferred<LabeledArray<T>>> {
        match self.window {
            Some(window) => a.rolling_mean(&self.dim, window),
            None => a.mean(&self.dim),
        }
    }
}

/// Bispectral analyzer bound to one configuration.
#[derive(Debug, Clone)]
pub struct BispectralAnalyzer {
    config: AnalysisConfig,
}

impl Default for BispectralAnalyzer {
    fn default() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }
}

impl BispectralAnalyzer {
    /// Create an analyzer, rejecting invalid parameters up front.
    pub fn new(config: AnalysisConfig) -> BispecResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Build the deferred bispectral dataset of `n_spectrum`, or the cross
    /// dataset with `v_spectrum` when given.
    pub fn compute<F: Real>(
        &self,
        n_spectrum: &LabeledArray<Complex<F>>,
        v_spectrum: Option<&LabeledArray<Complex<F>>>,
    ) -> BispecResult<Deferred<BispectralDataset<F>>> {
        compute_bispectral(n_spectrum, v_spectrum, &self.config)
    }
}

/// Smallest strictly positive coordinate on `dim`.
fn smallest_positive<T>(a: &LabeledArray<T>, dim: &str) -> BispecResult<f64> {
    a.coords(dim)?
        .iter()
        .copied()
        .filter(|&c| c > 0.0)
        .fold(None, |min: Option<f64>, c| Some(min.map_or(c, |m| m.min(c))))
        .ok_or_else(|| BispecError::NoPositiveFrequency(dim.to_string()))
}

/// Output axis order: `f1`, `f`, then the surviving axes of `n` followed by
/// those only `v` has.
fn output_order<T>(n: &LabeledArray<T>, v: &LabeledArray<T>, config: &AnalysisConfig) -> Vec<String> {
    let mut order = vec![F1_DIM.to_string(), F_DIM.to_string()];
    for dim in n.dims().iter().chain(v.dims()) {
        let name = dim.name();
        let reduced = name == config.avg_dim && config.avg_rolling.is_none();
        if name == config.freq_dim || reduced || order.iter().any(|o| o == name) {
            continue;
        }
        order.push(name.to_string());
    }
    order
}

/// Transpose `a` to the axes of `order` it has.
fn in_order<T: Clone>(a: &LabeledArray<T>, order: &[String]) -> BispecResult<LabeledArray<T>> {
    let names: Vec<&str> = order
        .iter()
        .map(String::as_str)
        .filter(|name| a.has_dim(name))
        .collect();
    a.transpose_to(&names)
}

/// Build the deferred bispectral dataset.
///
/// `n_spectrum` must have `config.freq_dim` (ascending, with at least one
/// strictly positive coordinate) and `config.avg_dim`. `v_spectrum` defaults
/// to `n_spectrum` and must share its frequency coordinates.
///
/// The self-powers at `f1` and `f` are averaged immediately; everything that
/// depends on the shifted spectrum is evaluated chunk by chunk along `f1`
/// when the result is computed.
pub fn compute_bispectral<F: Real>(
    n_spectrum: &LabeledArray<Complex<F>>,
    v_spectrum: Option<&LabeledArray<Complex<F>>>,
    config: &AnalysisConfig,
) -> BispecResult<Deferred<BispectralDataset<F>>> {
    config.validate()?;
    let freq = config.freq_dim.as_str();
    let v_spectrum = v_spectrum.unwrap_or(n_spectrum);
    for spectrum in [n_spectrum, v_spectrum] {
        spectrum.axis_of(freq)?;
        spectrum.axis_of(&config.avg_dim)?;
    }
    let n_freqs = n_spectrum.dim(freq)?;
    let v_freqs = v_spectrum.dim(freq)?;
    if !n_freqs.same_coords(v_freqs) {
        return Err(BispecError::CoordinateMismatch {
            dim: freq.to_string(),
            detail: format!(
                "second spectrum has {} frequencies, first has {} (or the values differ)",
                v_freqs.len(),
                n_freqs.len()
            ),
        });
    }
    let noise = config.resolve_noise_level::<F>()?;
    let averaging = Averaging::new(config);
    let order = output_order(n_spectrum, v_spectrum, config);

    let f_min = smallest_positive(n_spectrum, freq)?;
    let n_pos = n_spectrum.sel_from(freq, f_min)?;
    let n1 = n_pos.rename(freq, F1_DIM)?;
    let n = n_pos.rename(freq, F_DIM)?;

    let dv = v_spectrum.rename(freq, F_DIM)?.chunk();
    let f1_dim = n1.dim(F1_DIM)?.clone();
    let shifted = (0..f1_dim.len())
        .map(|i| dv.roll(F_DIM, i as isize + 1)?.sel_from(F_DIM, f_min))
        .collect::<BispecResult<Vec<_>>>()?;
    let v = Deferred::stack(shifted, f1_dim.clone())?;

    let bispectrum_t = v
        .zip_eager(&n1, |v, n1| *n1 * *v)
        .zip_eager(&n, |p, n| *p * n.conj());
    let bispectrum = averaging.deferred(&bispectrum_t)?;
    let v_norm = averaging.deferred(&apply_abs_sq(&v))?;

    let n1_norm = in_order(&averaging.eager(&apply_abs_sq(&n1))?, &order)?;
    let n_norm = in_order(&averaging.eager(&apply_abs_sq(&n))?, &order)?;

    let f_len = n.len_of(F_DIM)?;
    debug!(
        f1 = f1_dim.len(),
        f = f_len,
        f_min,
        chunks = v.num_chunks(),
        rolling = ?config.avg_rolling,
        noise_level = ?noise,
        cross = !std::ptr::eq(n_spectrum, v_spectrum),
        "bispectral graph built"
    );

    bispectrum.zip_blocks(&v_norm, move |bispectrum, v_norm, chunk| {
        let n1_block = match &chunk.dim {
            Some(dim) if n1_norm.has_dim(dim) => n1_norm.islice(dim, chunk.range.clone())?,
            _ => n1_norm.clone(),
        };
        let norm = n1_block
            .zip_with(&n_norm, |a, b| *a * *b)?
            .zip_with(&v_norm, |a, b| *a * *b)?;
        let bicoherence = bispectrum.zip_with(&norm, |z, &d| {
            if d > noise {
                abs_sq(*z) / d
            } else {
                F::null()
            }
        })?;

        Ok(BispectralDataset {
            bispectrum: in_order(&bispectrum, &order)?,
            n1_norm: n1_block,
            n_norm: n_norm.clone(),
            v_norm: in_order(&v_norm, &order)?,
            norm: in_order(&norm, &order)?,
            bicoherence: in_order(&bicoherence, &order)?,
        })
    })
}
