//! # Bispectral Analysis Core
//!
//! This crate computes bispectral quantities of complex spectra: the
//! bispectrum, its normalization powers, and the squared bicoherence used to
//! detect quadratic phase coupling between frequency components.
//!
//! ## Overview
//!
//! Spectra are labeled arrays: every axis has a name and a coordinate
//! vector. A spectrum needs a signed, ascending frequency axis and an axis to
//! average over (typically time); any other axes are carried along.
//!
//! - **Labeled arrays**: named-axis selection, rolling, stacking and
//!   broadcasting on top of `ndarray`
//! - **Deferred evaluation**: chunked task graphs evaluated in parallel with
//!   `rayon`
//! - **Bispectral computation**: frequency-shifted triple products, temporal
//!   averaging and masked normalization
//! - **Configuration and logging**: YAML configuration, `tracing` events
//!
//! ## Data Flow
//!
//! ```text
//! spectrum(frequency, time) ─► positive f ─► n1(f1), n(f)      ─► eager powers
//!                           └─► roll + stack along f1 ─► v(f1, f) ─► deferred chunks
//!                                                                  │
//!              BispectralDataset ◄── compute() ◄── mean / rolling mean
//! ```
//!
//! ## Example
//!
//! ```rust
//! use bispec_core::prelude::*;
//!
//! // Two segments of a 4-point spectrum
//! let spectrum = LabeledArray::from_vec(
//!     vec![
//!         Dim::new("frequency", vec![-0.25, 0.0, 0.25, 0.5]),
//!         Dim::new("time", vec![2.0, 6.0]),
//!     ],
//!     vec![
//!         Complex64::new(0.1, 0.0), Complex64::new(0.1, 0.0),
//!         Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0),
//!         Complex64::new(0.0, -0.5), Complex64::new(0.0, 0.5),
//!         Complex64::new(0.5, 0.0), Complex64::new(-0.5, 0.0),
//!     ],
//! )
//! .unwrap();
//!
//! let graph = compute_bispectral(&spectrum, None, &AnalysisConfig::default()).unwrap();
//! let dataset = graph.compute().unwrap();
//!
//! assert_eq!(dataset.bicoherence.shape(), &[2, 2]);
//! for coupling in dataset.phase_couplings(0.5).unwrap() {
//!     println!("f1 = {}, f = {}, b² = {}", coupling.f1, coupling.f, coupling.bicoherence);
//! }
//! ```

pub mod bispectral;
pub mod config;
pub mod dataset;
pub mod deferred;
pub mod kernels;
pub mod labeled;
pub mod observe;
pub mod types;

pub use bispectral::{compute_bispectral, BispectralAnalyzer};
pub use config::{AnalysisConfig, BispecConfig, ConfigError};
pub use dataset::{BispectralDataset, PhaseCoupling, F1_DIM, FIELD_NAMES, F_DIM};
pub use deferred::{Block, ChunkInfo, Deferred, MapElements};
pub use kernels::{abs_sq, abs_sq_slice, apply_abs_sq};
pub use labeled::{Dim, LabeledArray};
pub use types::{BispecError, BispecResult, Complex32, Complex64, Element, Real};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bispectral::{compute_bispectral, BispectralAnalyzer};
    pub use crate::config::{AnalysisConfig, BispecConfig};
    pub use crate::dataset::{BispectralDataset, PhaseCoupling};
    pub use crate::deferred::{Deferred, MapElements};
    pub use crate::kernels::{abs_sq, apply_abs_sq};
    pub use crate::labeled::{Dim, LabeledArray};
    pub use crate::types::{BispecError, BispecResult, Complex32, Complex64};
}
