//! Vector index traits and core types.
//!
//! This module defines the abstraction the composite index manager relies on:
//! an append-only, position-addressed store of unit vectors.

use crate::error::DbResult;
use serde::{Deserialize, Serialize};

// ============================================================================
// RowIndex
// ============================================================================

/// Zero-based position of a vector in the index.
///
/// Row indexes are dense and assigned at append time. The same value keys the
/// entry's metadata row, which is what keeps the two stores aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowIndex(pub u64);

impl RowIndex {
    /// Create a new row index.
    pub fn new(row: u64) -> Self {
        RowIndex(row)
    }

    /// Get the underlying value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Position as a slice offset.
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl From<u64> for RowIndex {
    fn from(row: u64) -> Self {
        RowIndex(row)
    }
}

impl From<usize> for RowIndex {
    fn from(row: usize) -> Self {
        RowIndex(row as u64)
    }
}

impl std::fmt::Display for RowIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// VectorHit
// ============================================================================

/// A single result from a similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    /// Row of the matched vector.
    pub row: RowIndex,

    /// Inner product with the normalized query (cosine similarity).
    pub score: f32,
}

impl VectorHit {
    /// Create a new hit.
    pub fn new(row: impl Into<RowIndex>, score: f32) -> Self {
        Self {
            row: row.into(),
            score,
        }
    }
}

// ============================================================================
// VectorIndexBackend Trait
// ============================================================================

/// Core trait for vector index backends.
///
/// ## Implementation Notes
///
/// - Backends must be thread-safe (`Send + Sync`).
/// - Stored vectors are unit length; `search` scores by inner product.
/// - Rows are never reassigned while serving. `truncate` exists only so the
///   owner can undo a tail it appended but failed to commit elsewhere, and
///   `replace_all` only for offline compaction.
pub trait VectorIndexBackend: Send + Sync {
    /// Append vectors, normalizing each, and persist before returning.
    ///
    /// Returns the rows assigned, in input order, starting at `len()`.
    fn append(&self, vectors: &[Vec<f32>]) -> DbResult<Vec<RowIndex>>;

    /// Return up to `k` hits sorted by descending score.
    fn search(&self, query: &[f32], k: usize) -> DbResult<Vec<VectorHit>>;

    /// Stored vectors for the given rows, in the given order.
    fn vectors(&self, rows: &[RowIndex]) -> DbResult<Vec<Vec<f32>>>;

    /// Drop every row at or after `len` and persist.
    fn truncate(&self, len: usize) -> DbResult<()>;

    /// Replace the whole contents with `vectors` in one atomic write.
    ///
    /// Rows are reassigned from zero. Used only by offline compaction.
    fn replace_all(&self, vectors: &[Vec<f32>]) -> DbResult<Vec<RowIndex>>;

    /// Number of stored vectors.
    fn len(&self) -> DbResult<usize>;

    /// Check if the index is empty.
    fn is_empty(&self) -> DbResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Dimension of vectors in this index.
    fn dimension(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_index() {
        let row = RowIndex::new(7);
        assert_eq!(row.value(), 7);
        assert_eq!(row.as_usize(), 7);
        assert_eq!(row.to_string(), "7");

        let from_usize: RowIndex = 3usize.into();
        assert_eq!(from_usize, RowIndex(3));
        assert!(RowIndex(1) < RowIndex(2));
    }

    #[test]
    fn test_row_index_serializes_transparently() {
        let json = serde_json::to_string(&RowIndex(42)).unwrap();
        assert_eq!(json, "42");
    }
}
