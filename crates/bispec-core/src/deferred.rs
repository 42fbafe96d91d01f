//! # Deferred Evaluation
//!
//! A [`Deferred`] value is a task graph that has not been run yet. It is
//! partitioned into chunks along one named axis; every chunk is a thunk that
//! produces its block of the final value on demand:
//!
//! ```text
//!   Deferred<LabeledArray>, chunked along f1
//!
//!   chunk 0 ── roll(1) ─ sel ─ ×n1 ─ mean ──┐
//!   chunk 1 ── roll(2) ─ sel ─ ×n1 ─ mean ──┼──► concat(f1) ──► value
//!   chunk 2 ── roll(3) ─ sel ─ ×n1 ─ mean ──┘
//! ```
//!
//! Building the graph (`map`, `map_blocks`, `zip_eager`, ...) only composes
//! closures. [`Deferred::compute`] evaluates the chunks in parallel on the
//! rayon pool and joins the blocks with [`Block::concat_blocks`]. The first
//! error raised by any chunk is returned unchanged.

use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

use crate::labeled::{Dim, LabeledArray};
use crate::types::{BispecError, BispecResult};

/// A value that can be split into chunks and joined back along an axis.
pub trait Block: Sized + Send + 'static {
    /// Join the blocks of consecutive chunks along `dim`.
    fn concat_blocks(parts: Vec<Self>, dim: &str) -> BispecResult<Self>;
}

impl<T: Clone + Send + Sync + 'static> Block for LabeledArray<T> {
    fn concat_blocks(parts: Vec<Self>, dim: &str) -> BispecResult<Self> {
        LabeledArray::concat(&parts, dim)
    }
}

/// Where a chunk sits in the partitioned value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkInfo {
    /// Chunk number, counted from zero.
    pub index: usize,
    /// The axis the value is partitioned along, if any.
    pub dim: Option<String>,
    /// Positions of the chunk on that axis.
    pub range: Range<usize>,
}

type Thunk<P> = Arc<dyn Fn() -> BispecResult<P> + Send + Sync>;

struct Chunk<P> {
    info: ChunkInfo,
    thunk: Thunk<P>,
}

impl<P> Clone for Chunk<P> {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            thunk: Arc::clone(&self.thunk),
        }
    }
}

/// A lazily evaluated value partitioned into chunks.
pub struct Deferred<P> {
    chunk_dim: Option<Dim>,
    chunks: Vec<Chunk<P>>,
}

impl<P> Clone for Deferred<P> {
    fn clone(&self) -> Self {
        Self {
            chunk_dim: self.chunk_dim.clone(),
            chunks: self.chunks.clone(),
        }
    }
}

impl<P> std::fmt::Debug for Deferred<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("chunk_dim", &self.chunk_dim.as_ref().map(Dim::name))
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl<P: Send + 'static> Deferred<P> {
    /// Wrap an already known value as a single chunk.
    pub fn from_value(value: P) -> Self
    where
        P: Clone + Sync,
    {
        Self {
            chunk_dim: None,
            chunks: vec![Chunk {
                info: ChunkInfo {
                    index: 0,
                    dim: None,
                    range: 0..1,
                },
                thunk: Arc::new(move || Ok(value.clone())),
            }],
        }
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// The axis the chunks partition, `None` for a single unpartitioned chunk.
    pub fn chunk_dim(&self) -> Option<&Dim> {
        self.chunk_dim.as_ref()
    }

    /// Layout of every chunk.
    pub fn chunk_infos(&self) -> Vec<ChunkInfo> {
        self.chunks.iter().map(|c| c.info.clone()).collect()
    }

    /// Transform every block.
    pub fn map<Q, G>(&self, f: G) -> Deferred<Q>
    where
        Q: 'static,
        G: Fn(P) -> Q + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.map_blocks(move |block, _| Ok(f(block)))
    }

    /// Transform every block with a fallible function that also sees the
    /// chunk's position.
    pub fn map_blocks<Q, G>(&self, f: G) -> Deferred<Q>
    where
        Q: 'static,
        G: Fn(P, &ChunkInfo) -> BispecResult<Q> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let chunks = self
            .chunks
            .iter()
            .map(|chunk| {
                let f = Arc::clone(&f);
                let info = chunk.info.clone();
                let upstream = Arc::clone(&chunk.thunk);
                let thunk: Thunk<Q> = Arc::new(move || f(upstream()?, &info));
                Chunk {
                    info: chunk.info.clone(),
                    thunk,
                }
            })
            .collect();
        Deferred {
            chunk_dim: self.chunk_dim.clone(),
            chunks,
        }
    }

    /// Combine two values chunked the same way, block by block.
    pub fn zip_blocks<Q, R, G>(&self, other: &Deferred<Q>, f: G) -> BispecResult<Deferred<R>>
    where
        Q: Send + 'static,
        R: 'static,
        G: Fn(P, Q, &ChunkInfo) -> BispecResult<R> + Send + Sync + 'static,
    {
        let same_layout = self.chunks.len() == other.chunks.len()
            && self.chunk_dim.as_ref().map(Dim::name) == other.chunk_dim.as_ref().map(Dim::name)
            && self
                .chunks
                .iter()
                .zip(&other.chunks)
                .all(|(a, b)| a.info.range == b.info.range);
        if !same_layout {
            return Err(BispecError::ShapeMismatch(format!(
                "cannot combine {} chunks with {} chunks",
                self.chunks.len(),
                other.chunks.len()
            )));
        }

        let f = Arc::new(f);
        let chunks = self
            .chunks
            .iter()
            .zip(&other.chunks)
            .map(|(a, b)| {
                let f = Arc::clone(&f);
                let info = a.info.clone();
                let left = Arc::clone(&a.thunk);
                let right = Arc::clone(&b.thunk);
                let thunk: Thunk<R> = Arc::new(move || f(left()?, right()?, &info));
                Chunk {
                    info: a.info.clone(),
                    thunk,
                }
            })
            .collect();
        Ok(Deferred {
            chunk_dim: self.chunk_dim.clone(),
            chunks,
        })
    }

    /// Evaluate every chunk in parallel and join the blocks.
    pub fn compute(&self) -> BispecResult<P>
    where
        P: Block,
    {
        let start = Instant::now();
        let mut parts = self
            .chunks
            .par_iter()
            .map(|chunk| {
                trace!(chunk = chunk.info.index, range = ?chunk.info.range, "evaluating chunk");
                (chunk.thunk)()
            })
            .collect::<BispecResult<Vec<P>>>()?;

        debug!(
            chunks = parts.len(),
            dim = ?self.chunk_dim.as_ref().map(Dim::name),
            elapsed_us = start.elapsed().as_micros() as u64,
            "deferred value computed"
        );

        match (&self.chunk_dim, parts.len()) {
            (_, 1) => parts
                .pop()
                .ok_or_else(|| BispecError::EmptyAxis("chunks".into())),
            (Some(dim), _) => P::concat_blocks(parts, dim.name()),
            (None, n) => Err(BispecError::ShapeMismatch(format!(
                "{} unpartitioned chunks",
                n
            ))),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> LabeledArray<T> {
    /// Wrap this array as an unevaluated single-chunk value.
    pub fn chunk(&self) -> Deferred<Self> {
        Deferred::from_value(self.clone())
    }
}

impl<T: Clone + Send + Sync + 'static> Deferred<LabeledArray<T>> {
    /// Stack deferred arrays along a new leading axis `dim`, one chunk per
    /// part.
    pub fn stack(parts: Vec<Self>, dim: Dim) -> BispecResult<Self> {
        if parts.is_empty() {
            return Err(BispecError::EmptyAxis(dim.name().to_string()));
        }
        if parts.len() != dim.len() {
            return Err(BispecError::ShapeMismatch(format!(
                "{} parts stacked on axis `{}` with {} coordinates",
                parts.len(),
                dim.name(),
                dim.len()
            )));
        }

        let chunks = parts
            .into_iter()
            .enumerate()
            .map(|(index, part)| {
                let label = Dim::new(dim.name(), vec![dim.coords()[index]]);
                let thunk: Thunk<LabeledArray<T>> =
                    Arc::new(move || part.compute()?.expand_dim(label.clone()));
                Chunk {
                    info: ChunkInfo {
                        index,
                        dim: Some(dim.name().to_string()),
                        range: index..index + 1,
                    },
                    thunk,
                }
            })
            .collect();
        Ok(Self {
            chunk_dim: Some(dim),
            chunks,
        })
    }

    /// Combine every block with an eager array, broadcasting by axis name.
    ///
    /// When `other` also has the chunk axis, each block is paired with the
    /// matching slice of it.
    pub fn zip_eager<U, V, G>(&self, other: &LabeledArray<U>, f: G) -> Deferred<LabeledArray<V>>
    where
        U: Clone + Send + Sync + 'static,
        V: Send + 'static,
        G: Fn(&T, &U) -> V + Send + Sync + 'static,
    {
        let other = other.clone();
        self.map_blocks(move |block, info| {
            let rhs = match &info.dim {
                Some(dim) if other.has_dim(dim) => other.islice(dim, info.range.clone())?,
                _ => other.clone(),
            };
            block.zip_with(&rhs, &f)
        })
    }

    /// Apply a per-block operation along `dim`, which must not be the chunk
    /// axis.
    fn along_unchunked<G>(&self, dim: &str, op: G) -> BispecResult<Self>
    where
        G: Fn(LabeledArray<T>) -> BispecResult<LabeledArray<T>> + Send + Sync + 'static,
    {
        if self.chunk_dim.as_ref().map(Dim::name) == Some(dim) {
            return Err(BispecError::ChunkedAxis(dim.to_string()));
        }
        Ok(self.map_blocks(move |block, _| op(block)))
    }

    /// Deferred [`LabeledArray::roll`].
    pub fn roll(&self, dim: &str, shift: isize) -> BispecResult<Self> {
        let name = dim.to_string();
        self.along_unchunked(dim, move |a| a.roll(&name, shift))
    }

    /// Deferred [`LabeledArray::sel_from`].
    pub fn sel_from(&self, dim: &str, start: f64) -> BispecResult<Self> {
        let name = dim.to_string();
        self.along_unchunked(dim, move |a| a.sel_from(&name, start))
    }
}

impl<T: crate::types::Element> Deferred<LabeledArray<T>> {
    /// Deferred [`LabeledArray::mean`].
    pub fn mean(&self, dim: &str) -> BispecResult<Self> {
        let name = dim.to_string();
        self.along_unchunked(dim, move |a| a.mean(&name))
    }

    /// Deferred [`LabeledArray::rolling_mean`].
    pub fn rolling_mean(&self, dim: &str, window: usize) -> BispecResult<Self> {
        let name = dim.to_string();
        self.along_unchunked(dim, move |a| a.rolling_mean(&name, window))
    }
}

/// Elementwise application over eager and deferred arrays alike.
///
/// On a deferred array the function is only recorded in the graph.
pub trait MapElements<T> {
    type Output<U: Clone + Send + Sync + 'static>;

    fn map_elements<U, G>(&self, f: G) -> Self::Output<U>
    where
        U: Clone + Send + Sync + 'static,
        G: Fn(&T) -> U + Send + Sync + 'static;
}

impl<T: Clone + Send + Sync + 'static> MapElements<T> for LabeledArray<T> {
    type Output<U: Clone + Send + Sync + 'static> = LabeledArray<U>;

    fn map_elements<U, G>(&self, f: G) -> LabeledArray<U>
    where
        U: Clone + Send + Sync + 'static,
        G: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.map(f)
    }
}

impl<T: Clone + Send + Sync + 'static> MapElements<T> for Deferred<LabeledArray<T>> {
    type Output<U: Clone + Send + Sync + 'static> = Deferred<LabeledArray<U>>;

    fn map_elements<U, G>(&self, f: G) -> Deferred<LabeledArray<U>>
    where
        U: Clone + Send + Sync + 'static,
        G: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.map(move |block| block.map(&f))
    }
}
