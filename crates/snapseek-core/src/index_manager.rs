//! Composite index: one vector index plus one metadata store.
//!
//! Row `r` of the vector index and row `r` of the metadata table describe the
//! same entry, so both stores always hold the same number of rows. Writers
//! hold the gate exclusively for a whole append (vector, then metadata), and
//! readers share it, so a search never sees a vector without its metadata.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use snapseek_db::metadata::{MetadataStore, NewEntry, METADATA_FILENAME};
use snapseek_db::vector::{
    check_index_compatibility, open_vector_index, VectorIndexBackend, VectorIndexCompatibility,
    VectorIndexConfig, INDEX_FILENAME,
};
use tracing::{debug, info, warn};

use crate::config::IndexSettings;
use crate::db_adapter::{from_db_error, IntoSnapResult};
use crate::errors::{SnapError, SnapResult};
use crate::types::{Entry, HealthReport, RowIndex};

/// Owner of the aligned vector index and metadata store.
pub struct IndexManager {
    vectors: Arc<dyn VectorIndexBackend>,
    metadata: MetadataStore,
    dimension: usize,
    data_dir: PathBuf,
    gate: RwLock<()>,
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("data_dir", &self.data_dir)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl IndexManager {
    /// Open `index.ssvx` and `meta.db` under `data_dir`, creating them if missing.
    ///
    /// # Errors
    ///
    /// - [`SnapError::Configuration`] if the persisted index has another dimension
    ///   or cannot be parsed
    /// - [`SnapError::Alignment`] if the stores disagree on row count and the
    ///   discrepancy is not a recoverable dangling tail
    pub fn open(data_dir: &Path, settings: &IndexSettings) -> SnapResult<Self> {
        debug!("Opening index in {:?}", data_dir);
        std::fs::create_dir_all(data_dir)?;

        let config = VectorIndexConfig::new(settings.dimension, data_dir.join(INDEX_FILENAME));
        match check_index_compatibility(&config) {
            VectorIndexCompatibility::Compatible | VectorIndexCompatibility::NotFound => {}
            VectorIndexCompatibility::IncompatibleDimension { expected, actual } => {
                return Err(SnapError::configuration(
                    format!(
                        "vector index at {} has dimension {} but index.dimension is {}",
                        config.path.display(),
                        actual,
                        expected
                    ),
                    "Use the embedding model the index was built with, or start a new data directory",
                ));
            }
            VectorIndexCompatibility::Corrupted(reason) => {
                return Err(SnapError::configuration(
                    format!("vector index at {} is unreadable: {}", config.path.display(), reason),
                    "Restore the index from a backup or start a new data directory",
                ));
            }
        }

        let vectors = open_vector_index(&config).into_snap_result()?;
        let metadata = MetadataStore::open(data_dir.join(METADATA_FILENAME)).into_snap_result()?;

        Self::from_parts(
            vectors,
            metadata,
            data_dir.to_path_buf(),
            settings.recover_dangling_tail,
        )
    }

    /// Assemble a manager from already-open stores and verify their alignment.
    pub fn from_parts(
        vectors: Arc<dyn VectorIndexBackend>,
        metadata: MetadataStore,
        data_dir: PathBuf,
        recover_dangling_tail: bool,
    ) -> SnapResult<Self> {
        let manager = Self {
            dimension: vectors.dimension(),
            vectors,
            metadata,
            data_dir,
            gate: RwLock::new(()),
        };
        manager.verify_startup_alignment(recover_dangling_tail)?;

        info!(
            "Index ready: {} rows, dimension {}",
            manager.vectors.len().into_snap_result()?,
            manager.dimension
        );
        Ok(manager)
    }

    fn verify_startup_alignment(&self, recover_dangling_tail: bool) -> SnapResult<()> {
        let vectors = self.vectors.len().into_snap_result()?;
        let entries = self.metadata.count().into_snap_result()?;

        if vectors == entries {
            return Ok(());
        }

        // Vectors were appended but their metadata never committed.
        if vectors > entries && recover_dangling_tail {
            warn!(
                "Vector index has {} rows but metadata has {}; dropping the uncommitted tail",
                vectors, entries
            );
            self.vectors.truncate(entries).into_snap_result()?;
            return Ok(());
        }

        Err(SnapError::Alignment { vectors, entries })
    }

    fn read_gate(&self) -> SnapResult<RwLockReadGuard<'_, ()>> {
        self.gate
            .read()
            .map_err(|e| SnapError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write_gate(&self) -> SnapResult<RwLockWriteGuard<'_, ()>> {
        self.gate
            .write()
            .map_err(|e| SnapError::internal(format!("Failed to acquire write lock: {}", e)))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Append one entry and its vector as a single unit. Returns the row.
    pub fn add(&self, entry: NewEntry, vector: Vec<f32>) -> SnapResult<RowIndex> {
        let rows = self.add_batch(vec![(entry, vector)])?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SnapError::internal("append returned no row"))
    }

    /// Append several entries under one lock and one metadata transaction.
    ///
    /// Either every entry is stored or none is. If the metadata insert fails
    /// the appended vectors are truncated again; only when that rollback also
    /// fails is [`SnapError::IngestPartialFailure`] returned.
    pub fn add_batch(&self, items: Vec<(NewEntry, Vec<f32>)>) -> SnapResult<Vec<RowIndex>> {
        if items.is_empty() {
            return Ok(vec![]);
        }
        for (_, vector) in &items {
            self.check_dimension(vector.len())?;
        }

        let (entries, vectors): (Vec<NewEntry>, Vec<Vec<f32>>) = items.into_iter().unzip();

        let _guard = self.write_gate()?;
        let before = self.vectors.len().into_snap_result()?;

        let rows = self.vectors.append(&vectors).into_snap_result()?;

        let meta_rows = match self.metadata.insert_many(&entries) {
            Ok(meta_rows) => meta_rows,
            Err(err) => {
                warn!("Metadata insert failed, rolling back {} vectors: {}", rows.len(), err);
                return Err(self.rollback_vectors(before, from_db_error(err)));
            }
        };

        if meta_rows != rows {
            let first = meta_rows.first().copied().unwrap_or(RowIndex::from(before));
            let reason = format!(
                "metadata assigned rows starting at {} but vectors start at {}",
                first, before
            );
            if let Err(e) = self.metadata.delete_rows_from(first) {
                return Err(SnapError::IngestPartialFailure {
                    reason: format!("{}; metadata rollback failed: {}", reason, e),
                });
            }
            return Err(self.rollback_vectors(before, SnapError::internal(reason)));
        }

        self.check_counts()?;
        debug!("Added {} entries at rows {}..{}", rows.len(), before, before + rows.len());
        Ok(rows)
    }

    /// Undo a vector append. Returns the error to report.
    fn rollback_vectors(&self, len: usize, cause: SnapError) -> SnapError {
        match self.vectors.truncate(len) {
            Ok(()) => cause,
            Err(e) => SnapError::IngestPartialFailure {
                reason: format!("{}; vector rollback failed: {}", cause, e),
            },
        }
    }

    fn check_counts(&self) -> SnapResult<()> {
        let vectors = self.vectors.len().into_snap_result()?;
        let entries = self.metadata.count().into_snap_result()?;
        debug_assert_eq!(vectors, entries, "index stores out of alignment");
        if vectors != entries {
            return Err(SnapError::Alignment { vectors, entries });
        }
        Ok(())
    }

    fn check_dimension(&self, actual: usize) -> SnapResult<()> {
        if actual != self.dimension {
            return Err(SnapError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }

    /// Replace or clear the user caption.
    pub fn set_user_caption(&self, external_id: &str, caption: Option<&str>) -> SnapResult<()> {
        let _guard = self.write_gate()?;
        self.metadata
            .set_user_caption(external_id, caption)
            .into_snap_result()
    }

    /// Toggle the soft-delete flag. The row stays in both stores.
    pub fn set_active(&self, external_id: &str, active: bool) -> SnapResult<()> {
        let _guard = self.write_gate()?;
        self.metadata.set_active(external_id, active).into_snap_result()
    }

    /// Rewrite both stores with only the active entries, renumbered from row 0.
    ///
    /// Stored vectors are reused. Vectors are rewritten first; if the metadata
    /// rewrite then fails, the previous vectors are put back. A crash between
    /// the two commits leaves a count mismatch that startup reports as fatal.
    /// Returns `(rows_before, rows_after)`.
    pub(crate) fn compact_active(&self) -> SnapResult<(usize, usize)> {
        let _guard = self.write_gate()?;

        let before = self.vectors.len().into_snap_result()?;
        let all_rows: Vec<RowIndex> = (0..before).map(RowIndex::from).collect();
        let previous = self.vectors.vectors(&all_rows).into_snap_result()?;

        let active = self.metadata.list_all(false).into_snap_result()?;
        let rows: Vec<RowIndex> = active.iter().map(|e| e.row_index).collect();
        let vectors = self.vectors.vectors(&rows).into_snap_result()?;
        let entries: Vec<NewEntry> = active.iter().map(NewEntry::from).collect();

        let vector_rows = self.vectors.replace_all(&vectors).into_snap_result()?;
        let meta_rows = match self.metadata.replace_all(&entries) {
            Ok(meta_rows) => meta_rows,
            Err(err) => {
                warn!("Metadata rewrite failed, restoring {} vectors: {}", before, err);
                return Err(self.restore_vectors(&previous, from_db_error(err)));
            }
        };
        if vector_rows != meta_rows {
            return Err(SnapError::internal(
                "compaction assigned different rows to the two stores",
            ));
        }
        self.check_counts()?;

        info!("Compacted index from {} to {} rows", before, vector_rows.len());
        Ok((before, vector_rows.len()))
    }

    /// Put back the vectors a failed compaction replaced. Returns the error
    /// to report.
    fn restore_vectors(&self, previous: &[Vec<f32>], cause: SnapError) -> SnapError {
        match self.vectors.replace_all(previous) {
            Ok(_) => cause,
            Err(e) => SnapError::IngestPartialFailure {
                reason: format!("{}; vector restore failed: {}", cause, e),
            },
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Nearest entries by raw inner product, inactive ones included.
    pub fn search(&self, query: &[f32], k: usize) -> SnapResult<Vec<(Entry, f32)>> {
        self.check_dimension(query.len())?;

        let _guard = self.read_gate()?;
        self.search_unlocked(query, k)
    }

    /// Like [`search`](Self::search) with `k` widened by the number of
    /// inactive entries, so that `top_k` active candidates survive filtering.
    /// The count and the scan happen under the same read lock.
    pub fn search_for_active(&self, query: &[f32], top_k: usize) -> SnapResult<Vec<(Entry, f32)>> {
        self.check_dimension(query.len())?;

        let _guard = self.read_gate()?;
        let entries = self.metadata.count().into_snap_result()?;
        let active = self.metadata.count_active().into_snap_result()?;
        self.search_unlocked(query, top_k + entries.saturating_sub(active))
    }

    fn search_unlocked(&self, query: &[f32], k: usize) -> SnapResult<Vec<(Entry, f32)>> {
        let hits = self.vectors.search(query, k).into_snap_result()?;
        let rows: Vec<RowIndex> = hits.iter().map(|h| h.row).collect();
        let entries = self.metadata.get_by_rows(&rows).into_snap_result()?;

        Ok(entries
            .into_iter()
            .zip(hits)
            .map(|(entry, hit)| (entry, hit.score))
            .collect())
    }

    /// All entries in row order.
    pub fn list(&self, include_inactive: bool) -> SnapResult<Vec<Entry>> {
        let _guard = self.read_gate()?;
        self.metadata.list_all(include_inactive).into_snap_result()
    }

    /// Look up one entry.
    pub fn get(&self, external_id: &str) -> SnapResult<Option<Entry>> {
        let _guard = self.read_gate()?;
        self.metadata
            .get_by_external_id(external_id)
            .into_snap_result()
    }

    /// Stored (normalized) vectors for the given rows.
    pub fn vectors_for(&self, rows: &[RowIndex]) -> SnapResult<Vec<Vec<f32>>> {
        let _guard = self.read_gate()?;
        self.vectors.vectors(rows).into_snap_result()
    }

    /// Rows in the vector index, inactive included.
    pub fn count(&self) -> SnapResult<usize> {
        let _guard = self.read_gate()?;
        self.vectors.len().into_snap_result()
    }

    /// `(vectors, entries, active)` read under one lock.
    pub fn counts(&self) -> SnapResult<(usize, usize, usize)> {
        let _guard = self.read_gate()?;
        Ok((
            self.vectors.len().into_snap_result()?,
            self.metadata.count().into_snap_result()?,
            self.metadata.count_active().into_snap_result()?,
        ))
    }

    /// Row counts of both stores.
    pub fn health(&self) -> SnapResult<HealthReport> {
        let (vectors, entries, active) = self.counts()?;
        Ok(HealthReport {
            vectors,
            entries,
            active,
            dimension: self.dimension,
            data_dir: self.data_dir.clone(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIM: usize = 3;

    fn settings() -> IndexSettings {
        IndexSettings {
            dimension: DIM,
            recover_dangling_tail: false,
        }
    }

    fn open(dir: &TempDir) -> IndexManager {
        IndexManager::open(dir.path(), &settings()).unwrap()
    }

    fn entry(id: &str) -> NewEntry {
        NewEntry::new(id, format!("images/{}.jpg", id))
    }

    /// Append a vector behind the manager's back, as a crashed ingest would.
    fn append_raw_vector(dir: &TempDir, v: Vec<f32>) {
        let config = VectorIndexConfig::new(DIM, dir.path().join(INDEX_FILENAME));
        let index = open_vector_index(&config).unwrap();
        index.append(&[v]).unwrap();
    }

    #[test]
    fn test_add_assigns_rows_and_stays_aligned() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);

        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let row = manager.add(entry(id), vec![1.0, i as f32, 0.0]).unwrap();
            assert_eq!(row, RowIndex::from(i));
            let (vectors, entries, _) = manager.counts().unwrap();
            assert_eq!(vectors, entries);
        }
        assert_eq!(manager.count().unwrap(), 3);
    }

    #[test]
    fn test_add_batch_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        manager.add(entry("a"), vec![1.0, 0.0, 0.0]).unwrap();

        // Second item duplicates an existing id: nothing of the batch sticks
        let err = manager
            .add_batch(vec![
                (entry("b"), vec![0.0, 1.0, 0.0]),
                (entry("a"), vec![0.0, 0.0, 1.0]),
            ])
            .unwrap_err();
        assert!(matches!(err, SnapError::Validation(_)));
        assert_eq!(manager.counts().unwrap(), (1, 1, 1));

        let rows = manager
            .add_batch(vec![
                (entry("b"), vec![0.0, 1.0, 0.0]),
                (entry("c"), vec![0.0, 0.0, 1.0]),
            ])
            .unwrap();
        assert_eq!(rows, vec![RowIndex::new(1), RowIndex::new(2)]);
    }

    #[test]
    fn test_add_rejects_wrong_dimension() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        let err = manager.add(entry("a"), vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            SnapError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(manager.count().unwrap(), 0);
    }

    #[test]
    fn test_search_joins_metadata_and_keeps_inactive() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        manager.add(entry("x"), vec![1.0, 0.0, 0.0]).unwrap();
        manager.add(entry("y"), vec![0.0, 1.0, 0.0]).unwrap();
        manager.set_active("x", false).unwrap();

        let hits = manager.search(&[1.0, 0.1, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.external_id, "x");
        assert!(!hits[0].0.active);
        assert!(hits[0].1 > hits[1].1);

        assert!(matches!(
            manager.search(&[1.0], 2),
            Err(SnapError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_search_for_active_widens_by_inactive_count() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        manager.add(entry("x"), vec![1.0, 0.0, 0.0]).unwrap();
        manager.add(entry("y"), vec![0.9, 0.1, 0.0]).unwrap();
        manager.add(entry("z"), vec![0.0, 0.0, 1.0]).unwrap();
        manager.set_active("x", false).unwrap();

        let hits = manager.search_for_active(&[1.0, 0.0, 0.0], 1).unwrap();
        let ids: Vec<&str> = hits.iter().map(|(e, _)| e.external_id.as_str()).collect();
        assert_eq!(ids, ["x", "y"]);
    }

    #[test]
    fn test_deactivate_keeps_row_sequence() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        manager.add(entry("a"), vec![1.0, 0.0, 0.0]).unwrap();
        manager.set_active("a", false).unwrap();

        assert_eq!(manager.count().unwrap(), 1);
        assert!(manager.list(false).unwrap().is_empty());
        assert_eq!(manager.list(true).unwrap().len(), 1);

        let row = manager.add(entry("b"), vec![0.0, 1.0, 0.0]).unwrap();
        assert_eq!(row, RowIndex::new(1));
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        assert!(matches!(
            manager.set_active("ghost", false),
            Err(SnapError::NotFound(_))
        ));
        assert!(matches!(
            manager.set_user_caption("ghost", Some("x")),
            Err(SnapError::NotFound(_))
        ));
        assert!(manager.get("ghost").unwrap().is_none());
    }

    #[test]
    fn test_reopen_preserves_state() {
        let dir = TempDir::new().unwrap();
        {
            let manager = open(&dir);
            manager.add(entry("a"), vec![1.0, 0.0, 0.0]).unwrap();
            manager.set_user_caption("a", Some("red door")).unwrap();
        }
        let manager = open(&dir);
        assert_eq!(manager.count().unwrap(), 1);
        let a = manager.get("a").unwrap().unwrap();
        assert_eq!(a.user_caption.as_deref(), Some("red door"));
    }

    #[test]
    fn test_reopen_with_other_dimension_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        open(&dir).add(entry("a"), vec![1.0, 0.0, 0.0]).unwrap();

        let other = IndexSettings {
            dimension: 4,
            ..settings()
        };
        let err = IndexManager::open(dir.path(), &other).unwrap_err();
        assert!(matches!(err, SnapError::Configuration { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_dangling_tail_is_fatal_by_default() {
        let dir = TempDir::new().unwrap();
        open(&dir).add(entry("a"), vec![1.0, 0.0, 0.0]).unwrap();
        append_raw_vector(&dir, vec![0.0, 1.0, 0.0]);

        let err = IndexManager::open(dir.path(), &settings()).unwrap_err();
        assert!(matches!(
            err,
            SnapError::Alignment {
                vectors: 2,
                entries: 1
            }
        ));
    }

    #[test]
    fn test_dangling_tail_recovery() {
        let dir = TempDir::new().unwrap();
        open(&dir).add(entry("a"), vec![1.0, 0.0, 0.0]).unwrap();
        append_raw_vector(&dir, vec![0.0, 1.0, 0.0]);

        let recovering = IndexSettings {
            recover_dangling_tail: true,
            ..settings()
        };
        let manager = IndexManager::open(dir.path(), &recovering).unwrap();
        assert_eq!(manager.counts().unwrap(), (1, 1, 1));

        // The truncation was persisted
        drop(manager);
        assert_eq!(open(&dir).count().unwrap(), 1);
    }

    #[test]
    fn test_missing_vectors_never_recovered() {
        let dir = TempDir::new().unwrap();
        open(&dir).add(entry("a"), vec![1.0, 0.0, 0.0]).unwrap();
        std::fs::remove_file(dir.path().join(INDEX_FILENAME)).unwrap();

        let recovering = IndexSettings {
            recover_dangling_tail: true,
            ..settings()
        };
        let err = IndexManager::open(dir.path(), &recovering).unwrap_err();
        assert!(matches!(
            err,
            SnapError::Alignment {
                vectors: 0,
                entries: 1
            }
        ));
    }

    #[test]
    fn test_failed_compaction_restores_vectors() {
        let dir = TempDir::new().unwrap();
        let manager = open(&dir);
        manager.add(entry("a"), vec![1.0, 0.0, 0.0]).unwrap();
        manager.add(entry("b"), vec![0.0, 1.0, 0.0]).unwrap();
        manager.set_active("a", false).unwrap();

        // Make the metadata rewrite fail after the vectors were rewritten
        let conn = rusqlite::Connection::open(dir.path().join(METADATA_FILENAME)).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER keep_entries BEFORE DELETE ON entries
             BEGIN SELECT RAISE(ABORT, 'entries are read-only'); END;",
        )
        .unwrap();

        let err = manager.compact_active().unwrap_err();
        assert!(matches!(err, SnapError::Storage { .. }));
        assert_eq!(manager.counts().unwrap(), (2, 2, 1));

        let hits = manager.search(&[0.0, 1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].0.external_id, "b");

        // The restored vectors were persisted too
        drop(manager);
        let reopened = open(&dir);
        assert_eq!(reopened.counts().unwrap(), (2, 2, 1));
        let hits = reopened.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].0.external_id, "a");
    }

    #[test]
    fn test_readers_never_see_uncommitted_rows() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;

        let dir = TempDir::new().unwrap();
        let manager = Arc::new(open(&dir));
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let manager = Arc::clone(&manager);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for i in 0..40 {
                    let batch = (0..3)
                        .map(|j| (entry(&format!("w{}-{}", i, j)), vec![1.0, i as f32, j as f32]))
                        .collect();
                    manager.add_batch(batch).unwrap();
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut reads = 0;
                    while !done.load(Ordering::SeqCst) || reads == 0 {
                        let hits = manager.search(&[1.0, 0.5, 0.5], 1_000).unwrap();
                        let (vectors, entries, _) = manager.counts().unwrap();
                        assert_eq!(vectors, entries);
                        assert!(hits.len() <= vectors);
                        assert_eq!(manager.list(true).unwrap().len() % 3, 0);
                        reads += 1;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(manager.counts().unwrap(), (120, 120, 120));
    }

    #[test]
    fn test_corrupt_index_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(INDEX_FILENAME), b"garbage").unwrap();
        let err = IndexManager::open(dir.path(), &settings()).unwrap_err();
        assert!(matches!(err, SnapError::Configuration { .. }));
    }
}
