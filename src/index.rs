//! Exact brute-force vector similarity index
//!
//! Stores unit-norm f32 embeddings in one flat row-major buffer and answers
//! top-k queries by computing the inner product against every stored vector.
//! On normalized vectors, inner product equals cosine similarity, so the
//! highest score is the nearest neighbor.
//!
//! Positions are identities: the vector appended i-th lives at row i forever.
//! The index is append-only — no delete, no update, no reorder — and callers
//! correlate row i with row i of their metadata store. Rebuilding from
//! scratch is the only mutation beyond append.
//!
//! Search cost is O(N·D) per query. That is deliberate: results are exact,
//! with no recall tradeoff.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use thiserror::Error;

use crate::format::{FormatError, VecHeader, VecWriter, HEADER_SIZE};
use crate::norm::{dot, normalize_in_place, normalize_one};

/// Row index returned for padded "no result" slots when k exceeds the
/// number of stored vectors.
pub const NO_RESULT: i64 = -1;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot infer dimension from an empty batch")]
    EmptyBatch,

    #[error("index file not found at {0}")]
    NotFound(PathBuf),

    #[error("alignment error: byte slice not aligned to f32 (4 bytes)")]
    Alignment,

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Flat inner-product index over unit-norm vectors.
pub struct VectorIndex {
    /// Fixed dimension; every stored and queried vector has this length.
    dim: usize,
    /// Row-major storage, `dim` floats per row, insertion order.
    data: Vec<f32>,
}

impl VectorIndex {
    /// Create an empty index fixed to `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dim: dimension,
            data: Vec::new(),
        }
    }

    /// Build an index from a batch, inferring the dimension from the first
    /// vector.
    ///
    /// Fails with [`IndexError::EmptyBatch`] if the batch is empty — there
    /// is nothing to infer the dimension from.
    pub fn from_embeddings(batch: &[Vec<f32>]) -> Result<Self, IndexError> {
        let first = batch.first().ok_or(IndexError::EmptyBatch)?;
        let mut index = Self::new(first.len());
        index.add(batch)?;
        Ok(index)
    }

    /// Fixed dimension of this index.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len() / self.dim.max(1)
    }

    /// True if no vectors are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the stored (normalized) vector at `row`.
    pub fn get(&self, row: usize) -> Option<&[f32]> {
        if row >= self.len() {
            return None;
        }
        let start = row * self.dim;
        Some(&self.data[start..start + self.dim])
    }

    /// Normalize and append a batch of vectors in order.
    ///
    /// Every vector is length-checked before anything is stored, so a
    /// failing call leaves the index untouched. Duplicates are permitted.
    pub fn add(&mut self, batch: &[Vec<f32>]) -> Result<(), IndexError> {
        for v in batch {
            if v.len() != self.dim {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dim,
                    actual: v.len(),
                });
            }
        }

        self.data.reserve(batch.len() * self.dim);
        for v in batch {
            let start = self.data.len();
            self.data.extend_from_slice(v);
            normalize_in_place(&mut self.data[start..]);
        }
        Ok(())
    }

    /// Exact top-k search for a single query vector.
    ///
    /// The query is normalized first, then scored against every stored row.
    /// Results come back sorted by descending score; exactly-equal scores
    /// order by ascending row, so repeated searches are deterministic.
    ///
    /// Always returns exactly `k` pairs: when `k` exceeds the stored count,
    /// the tail is padded with ([`NO_RESULT`], 0.0) slots for callers to
    /// filter uniformly.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(i64, f32)>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let query = normalize_one(query);
        let mut scored: Vec<(i64, f32)> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, stored)| (row as i64, dot(&query, stored)))
            .collect();

        scored.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);
        scored.resize(k, (NO_RESULT, 0.0));
        Ok(scored)
    }

    /// Exact top-k search for a batch of queries.
    ///
    /// Numerically identical to calling [`search`](Self::search) per query.
    pub fn search_batch(
        &self,
        queries: &[Vec<f32>],
        k: usize,
    ) -> Result<Vec<Vec<(i64, f32)>>, IndexError> {
        queries.iter().map(|q| self.search(q, k)).collect()
    }

    /// Persist the index to `path`, creating parent directories as needed.
    ///
    /// The file is written to a temporary sibling first and renamed into
    /// place, so a failed save never leaves a partial file at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), IndexError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut writer = VecWriter::create(&tmp, self.dim)?;
        for row in self.data.chunks_exact(self.dim) {
            writer.write_vector(row)?;
        }
        writer.finish()?;

        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load an index from `path`.
    ///
    /// Fails with [`IndexError::NotFound`] if the file does not exist; no
    /// fallback index is created. The mapped file is validated against its
    /// header before any vector is read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IndexError::NotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let header = VecHeader::from_bytes(&mmap)?;
        let expected = header.file_size();
        if mmap.len() < expected {
            return Err(FormatError::Truncated {
                expected,
                actual: mmap.len(),
            }
            .into());
        }

        // Header is 16 bytes and mmaps are page-aligned, so the data region
        // stays f32-aligned; bytemuck still checks.
        let floats: &[f32] = bytemuck::try_cast_slice(&mmap[HEADER_SIZE..expected])
            .map_err(|_| IndexError::Alignment)?;

        Ok(Self {
            dim: header.dimension as usize,
            data: floats.to_vec(),
        })
    }
}
