//! Flat file vector index.
//!
//! Stores unit vectors back to back in a single binary file and answers
//! queries with an exact linear scan. Every mutation rewrites the file through
//! a temporary sibling and an atomic rename, so a crash leaves either the old
//! or the new contents on disk.

use super::config::{IndexHeader, VectorIndexConfig, HEADER_LEN};
use super::math::{dot, l2_normalize};
use super::traits::{RowIndex, VectorHit, VectorIndexBackend};
use crate::error::{DbError, DbResult};
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, trace};

/// Flat file vector index.
///
/// Rows live in one contiguous `Vec<f32>`; row `r` occupies
/// `data[r * dimension..(r + 1) * dimension]`.
pub struct FlatVectorIndex {
    /// Path to the index file.
    path: PathBuf,

    /// Dimension of vectors.
    dimension: usize,

    /// In-memory copy of every stored vector.
    data: RwLock<Vec<f32>>,
}

impl FlatVectorIndex {
    /// Open an existing index file or create an empty one.
    pub fn open(config: &VectorIndexConfig) -> DbResult<Self> {
        debug!("Opening FlatVectorIndex at {:?}", config.path);

        if config.dimension == 0 {
            return Err(DbError::index_incompatible(
                &config.path,
                "dimension must be greater than zero",
            ));
        }

        let index = Self {
            path: config.path.clone(),
            dimension: config.dimension,
            data: RwLock::new(Vec::new()),
        };

        if config.path.exists() {
            index.load_from_file()?;
        } else if config.create_if_missing {
            if let Some(parent) = config.path.parent() {
                fs::create_dir_all(parent)?;
            }
            write_index_file(&index.path, index.dimension, &[])?;
        } else {
            return Err(DbError::IndexNotFound {
                path: config.path.clone(),
            });
        }

        Ok(index)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load vectors from the index file.
    fn load_from_file(&self) -> DbResult<()> {
        debug!("Loading vectors from {:?}", self.path);

        let bytes = fs::read(&self.path)
            .map_err(|e| DbError::vector_io(&self.path, format!("Failed to read index: {}", e)))?;
        let header = IndexHeader::parse(&self.path, &bytes)?;

        if header.dimension != self.dimension {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: header.dimension,
            });
        }
        let Some(expected_len) = header.file_len() else {
            return Err(DbError::vector_parse(
                &self.path,
                format!("header claims {} vectors, more than can be addressed", header.count),
            ));
        };
        if bytes.len() != expected_len {
            return Err(DbError::vector_parse(
                &self.path,
                format!(
                    "expected {} bytes for {} vectors, found {}",
                    expected_len,
                    header.count,
                    bytes.len()
                ),
            ));
        }

        let values: Vec<f32> = bytes[HEADER_LEN..]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        let mut data = self
            .data
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;
        *data = values;

        debug!("Loaded {} vectors", header.count);
        Ok(())
    }

    fn check_dimension(&self, v: &[f32]) -> DbResult<()> {
        if v.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: v.len(),
            });
        }
        Ok(())
    }
}

impl VectorIndexBackend for FlatVectorIndex {
    fn append(&self, vectors: &[Vec<f32>]) -> DbResult<Vec<RowIndex>> {
        debug!("Appending {} vectors", vectors.len());

        for v in vectors {
            self.check_dimension(v)?;
        }

        let mut data = self
            .data
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let start = data.len() / self.dimension;
        let old_len = data.len();
        for v in vectors {
            data.extend(l2_normalize(v));
        }

        // Persist before handing out rows; roll the buffer back if that fails.
        if let Err(e) = write_index_file(&self.path, self.dimension, &data) {
            data.truncate(old_len);
            return Err(e);
        }

        Ok((start..start + vectors.len()).map(RowIndex::from).collect())
    }

    fn search(&self, query: &[f32], k: usize) -> DbResult<Vec<VectorHit>> {
        trace!("Searching FlatVectorIndex, k={}", k);

        self.check_dimension(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let q = l2_normalize(query);
        let data = self
            .data
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut hits: Vec<VectorHit> = data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, v)| VectorHit::new(row, dot(&q, v)))
            .filter(|hit| hit.score.is_finite())
            .collect();

        // Sort by score (descending), ties by row
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.row.cmp(&b.row))
        });
        hits.truncate(k);

        trace!("Found {} hits", hits.len());
        Ok(hits)
    }

    fn vectors(&self, rows: &[RowIndex]) -> DbResult<Vec<Vec<f32>>> {
        let data = self
            .data
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        let count = data.len() / self.dimension;

        rows.iter()
            .map(|row| {
                let r = row.as_usize();
                if r >= count {
                    return Err(DbError::internal(format!(
                        "Row {} out of range ({} vectors)",
                        row, count
                    )));
                }
                Ok(data[r * self.dimension..(r + 1) * self.dimension].to_vec())
            })
            .collect()
    }

    fn truncate(&self, len: usize) -> DbResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let current = data.len() / self.dimension;
        if len >= current {
            return Ok(());
        }
        debug!("Truncating vector index from {} to {} rows", current, len);

        let keep = len * self.dimension;
        write_index_file(&self.path, self.dimension, &data[..keep])?;
        data.truncate(keep);
        Ok(())
    }

    fn replace_all(&self, vectors: &[Vec<f32>]) -> DbResult<Vec<RowIndex>> {
        for v in vectors {
            self.check_dimension(v)?;
        }

        let mut fresh = Vec::with_capacity(vectors.len() * self.dimension);
        for v in vectors {
            fresh.extend(l2_normalize(v));
        }

        let mut data = self
            .data
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;
        debug!(
            "Replacing {} vectors with {}",
            data.len() / self.dimension,
            vectors.len()
        );
        write_index_file(&self.path, self.dimension, &fresh)?;
        *data = fresh;

        Ok((0..vectors.len()).map(RowIndex::from).collect())
    }

    fn len(&self) -> DbResult<usize> {
        let data = self
            .data
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        Ok(data.len() / self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Write a complete index file atomically (temp file + rename).
pub(crate) fn write_index_file(path: &Path, dimension: usize, data: &[f32]) -> DbResult<()> {
    let count = data.len() / dimension;
    let tmp_path = path.with_extension("ssvx.tmp");
    debug!("Saving {} vectors to {:?}", count, path);

    let io_err = |e: std::io::Error| DbError::vector_io(path, format!("Failed to write index: {}", e));

    {
        let file = File::create(&tmp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&IndexHeader::new(dimension, count).to_bytes())
            .map_err(io_err)?;
        for x in data {
            writer.write_all(&x.to_le_bytes()).map_err(io_err)?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| DbError::vector_io(path, format!("Failed to flush index: {}", e)))?;
        file.sync_all().map_err(io_err)?;
    }

    fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::config::INDEX_FILENAME;
    use tempfile::TempDir;

    fn open(dir: &TempDir, dim: usize) -> FlatVectorIndex {
        FlatVectorIndex::open(&VectorIndexConfig::new(dim, dir.path().join(INDEX_FILENAME)))
            .unwrap()
    }

    #[test]
    fn test_append_assigns_consecutive_rows() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, 3);

        let rows = index
            .append(&[vec![1.0, 0.0, 0.0], vec![0.0, 2.0, 0.0]])
            .unwrap();
        assert_eq!(rows, vec![RowIndex(0), RowIndex(1)]);

        let rows = index.append(&[vec![0.0, 0.0, 5.0]]).unwrap();
        assert_eq!(rows, vec![RowIndex(2)]);
        assert_eq!(index.len().unwrap(), 3);
    }

    #[test]
    fn test_append_normalizes() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, 2);
        index.append(&[vec![3.0, 4.0]]).unwrap();

        let stored = index.vectors(&[RowIndex(0)]).unwrap();
        assert!((stored[0][0] - 0.6).abs() < 1e-6);
        assert!((stored[0][1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_append_rejects_wrong_dimension() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, 3);

        let err = index
            .append(&[vec![1.0, 0.0, 0.0], vec![1.0, 0.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        // Nothing from the failed batch was stored
        assert_eq!(index.len().unwrap(), 0);
    }

    #[test]
    fn test_search_orders_by_score() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, 2);
        index
            .append(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]])
            .unwrap();

        let hits = index.search(&[1.0, 0.1], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].row, RowIndex(0));
        assert_eq!(hits[1].row, RowIndex(2));
        assert_eq!(hits[2].row, RowIndex(1));
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[test]
    fn test_search_fewer_than_k() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, 2);
        index.append(&[vec![1.0, 0.0]]).unwrap();

        assert_eq!(index.search(&[1.0, 0.0], 10).unwrap().len(), 1);
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_empty_index() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, 2);
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_rejects_wrong_dimension() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, 2);
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 5),
            Err(DbError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_persist_and_reload_identical_search() {
        let dir = TempDir::new().unwrap();
        let vectors = vec![
            vec![0.3, -0.2, 0.9, 0.1],
            vec![-0.5, 0.5, 0.5, 0.5],
            vec![0.0, 1.0, 0.0, -0.1],
            vec![0.7, 0.7, 0.0, 0.0],
        ];
        let query = [0.2, 0.4, 0.6, -0.1];

        let before = {
            let index = open(&dir, 4);
            index.append(&vectors).unwrap();
            index.search(&query, 4).unwrap()
        };

        let reloaded = open(&dir, 4);
        assert_eq!(reloaded.len().unwrap(), 4);
        let after = reloaded.search(&query, 4).unwrap();

        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.row, b.row);
            assert!((a.score - b.score).abs() < 1e-6);
        }
    }

    #[test]
    fn test_reopen_with_other_dimension_fails() {
        let dir = TempDir::new().unwrap();
        open(&dir, 4).append(&[vec![1.0, 0.0, 0.0, 0.0]]).unwrap();

        let result =
            FlatVectorIndex::open(&VectorIndexConfig::new(8, dir.path().join(INDEX_FILENAME)));
        assert!(matches!(
            result,
            Err(DbError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_truncated_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(INDEX_FILENAME);
        open(&dir, 2).append(&[vec![1.0, 0.0]]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();

        let result = FlatVectorIndex::open(&VectorIndexConfig::new(2, &path));
        assert!(matches!(result, Err(DbError::VectorParse { .. })));
    }

    #[test]
    fn test_garbled_count_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(INDEX_FILENAME);
        let header = IndexHeader::new(512, (u64::MAX / 2) as usize);
        std::fs::write(&path, header.to_bytes()).unwrap();

        let result = FlatVectorIndex::open(&VectorIndexConfig::new(512, &path));
        assert!(matches!(result, Err(DbError::VectorParse { .. })));
    }

    #[test]
    fn test_truncate_drops_tail_and_persists() {
        let dir = TempDir::new().unwrap();
        {
            let index = open(&dir, 2);
            index
                .append(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]])
                .unwrap();
            index.truncate(1).unwrap();
            assert_eq!(index.len().unwrap(), 1);

            let rows = index.append(&[vec![0.0, 1.0]]).unwrap();
            assert_eq!(rows, vec![RowIndex(1)]);
        }
        assert_eq!(open(&dir, 2).len().unwrap(), 2);
    }

    #[test]
    fn test_replace_all_rewrites_rows() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, 2);
        index
            .append(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]])
            .unwrap();

        let rows = index.replace_all(&[vec![0.0, 3.0]]).unwrap();
        assert_eq!(rows, vec![RowIndex(0)]);
        assert_eq!(index.len().unwrap(), 1);

        let reopened = open(&dir, 2);
        assert_eq!(reopened.len().unwrap(), 1);
        let v = reopened.vectors(&[RowIndex(0)]).unwrap();
        assert!((v[0][1] - 1.0).abs() < 1e-6);

        assert!(index.replace_all(&[vec![1.0]]).is_err());
        assert_eq!(index.len().unwrap(), 1);
    }

    #[test]
    fn test_missing_file_without_create() {
        let dir = TempDir::new().unwrap();
        let config =
            VectorIndexConfig::new(2, dir.path().join(INDEX_FILENAME)).with_create_if_missing(false);
        assert!(matches!(
            FlatVectorIndex::open(&config),
            Err(DbError::IndexNotFound { .. })
        ));
    }
}
