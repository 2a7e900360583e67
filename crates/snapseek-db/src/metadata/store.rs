//! SQLite-backed metadata store.

use super::schema;
use super::types::{EntryRecord, NewEntry};
use crate::error::{DbError, DbResult};
use crate::vector::RowIndex;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Default filename of the metadata database inside the data directory.
pub const METADATA_FILENAME: &str = "meta.db";

const SELECT_COLUMNS: &str =
    "row_index, external_id, stored_path, auto_caption, user_caption, active, created_at";

/// Durable mapping from row index to entry attributes.
///
/// Every write runs in its own transaction. The store assigns row indexes as
/// `current row count + position in batch`, so callers must append to the
/// vector index in the same order.
pub struct MetadataStore {
    /// Database path (`None` for in-memory stores).
    path: Option<PathBuf>,

    conn: Mutex<Connection>,
}

impl MetadataStore {
    /// Open (or create) the store at `path` and run pending migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        debug!("Opening MetadataStore at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut conn = Connection::open(path)?;
        schema::migrate(&mut conn)?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> DbResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        schema::migrate(&mut conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    /// Database path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::internal(format!("Failed to acquire connection lock: {}", e)))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a batch of entries atomically.
    ///
    /// Returns the assigned rows in input order. A duplicate external id
    /// rejects the whole batch.
    pub fn insert_many(&self, entries: &[NewEntry]) -> DbResult<Vec<RowIndex>> {
        debug!("Inserting {} metadata entries", entries.len());

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let start = count_rows(&tx)?;
        let rows = insert_at(&tx, start, entries)?;
        tx.commit()?;
        Ok(rows)
    }

    /// Replace the user caption. `None` clears it.
    pub fn set_user_caption(&self, external_id: &str, caption: Option<&str>) -> DbResult<()> {
        debug!("Setting user caption for {}", external_id);

        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE entries SET user_caption = ?1 WHERE external_id = ?2",
            params![caption, external_id],
        )?;
        if changed == 0 {
            return Err(DbError::entry_not_found(external_id));
        }
        Ok(())
    }

    /// Toggle the soft-delete flag.
    pub fn set_active(&self, external_id: &str, active: bool) -> DbResult<()> {
        debug!("Setting active={} for {}", active, external_id);

        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE entries SET active = ?1 WHERE external_id = ?2",
            params![active, external_id],
        )?;
        if changed == 0 {
            return Err(DbError::entry_not_found(external_id));
        }
        Ok(())
    }

    /// Remove every row at or after `row`. Returns the number removed.
    ///
    /// Only for undoing a tail that never made it into the vector index.
    pub fn delete_rows_from(&self, row: RowIndex) -> DbResult<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM entries WHERE row_index >= ?1",
            params![row.value() as i64],
        )?;
        debug!("Removed {} metadata rows from row {}", removed, row);
        Ok(removed)
    }

    /// Replace the whole table with `entries`, renumbered from row 0.
    pub fn replace_all(&self, entries: &[NewEntry]) -> DbResult<Vec<RowIndex>> {
        debug!("Replacing metadata with {} entries", entries.len());

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        let rows = insert_at(&tx, 0, entries)?;
        tx.commit()?;
        Ok(rows)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Look up an entry by external id.
    pub fn get_by_external_id(&self, external_id: &str) -> DbResult<Option<EntryRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM entries WHERE external_id = ?1",
            SELECT_COLUMNS
        );
        let record = conn
            .query_row(&sql, params![external_id], decode_row)
            .optional()?;
        record.transpose()
    }

    /// Look up entries by row, preserving the order of `rows`.
    ///
    /// Fails if any row has no metadata.
    pub fn get_by_rows(&self, rows: &[RowIndex]) -> DbResult<Vec<EntryRecord>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM entries WHERE row_index = ?1", SELECT_COLUMNS);
        let mut stmt = conn.prepare_cached(&sql)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let record = stmt
                .query_row(params![row.value() as i64], decode_row)
                .optional()?
                .ok_or_else(|| DbError::internal(format!("No metadata for row {}", row)))??;
            out.push(record);
        }
        Ok(out)
    }

    /// All entries in row order.
    pub fn list_all(&self, include_inactive: bool) -> DbResult<Vec<EntryRecord>> {
        let conn = self.lock()?;
        let sql = if include_inactive {
            format!("SELECT {} FROM entries ORDER BY row_index", SELECT_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM entries WHERE active = 1 ORDER BY row_index",
                SELECT_COLUMNS
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], decode_row)?
            .collect::<Result<Vec<_>, _>>()?;
        records.into_iter().collect()
    }

    /// Number of rows, including inactive ones.
    pub fn count(&self) -> DbResult<usize> {
        let conn = self.lock()?;
        count_rows(&conn)
    }

    /// Number of active rows.
    pub fn count_active(&self) -> DbResult<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn count_rows(conn: &Connection) -> DbResult<usize> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
    Ok(n as usize)
}

fn insert_at(tx: &Transaction<'_>, start: usize, entries: &[NewEntry]) -> DbResult<Vec<RowIndex>> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO entries \
         (row_index, external_id, stored_path, auto_caption, user_caption, active, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    let mut rows = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let row = RowIndex::from(start + i);
        stmt.execute(params![
            row.value() as i64,
            entry.external_id,
            entry.stored_path,
            entry.auto_caption,
            entry.user_caption,
            entry.active,
            entry.created_at.to_rfc3339(),
        ])
        .map_err(|e| map_insert_error(e, &entry.external_id))?;
        rows.push(row);
    }
    Ok(rows)
}

fn map_insert_error(err: rusqlite::Error, external_id: &str) -> DbError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            DbError::DuplicateExternalId {
                external_id: external_id.to_string(),
            }
        }
        _ => DbError::Sqlite(err),
    }
}

/// Row decoder. The outer `Result` is SQLite's, the inner one covers values
/// SQLite accepted but we cannot interpret.
fn decode_row(row: &Row<'_>) -> rusqlite::Result<DbResult<EntryRecord>> {
    let row_index: i64 = row.get(0)?;
    let created_at: Option<String> = row.get(6)?;

    let created_at = match created_at.as_deref().map(parse_timestamp).transpose() {
        Ok(ts) => ts,
        Err(e) => return Ok(Err(e)),
    };
    if row_index < 0 {
        return Ok(Err(DbError::invalid_value(format!(
            "negative row index {}",
            row_index
        ))));
    }

    Ok(Ok(EntryRecord {
        row_index: RowIndex(row_index as u64),
        external_id: row.get(1)?,
        stored_path: row.get(2)?,
        auto_caption: row.get(3)?,
        user_caption: row.get(4)?,
        active: row.get(5)?,
        created_at,
    }))
}

fn parse_timestamp(value: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::invalid_value(format!("bad timestamp '{}': {}", value, e)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str) -> NewEntry {
        NewEntry::new(id, format!("images/{}.png", id))
    }

    #[test]
    fn test_insert_assigns_rows_from_count() {
        let store = MetadataStore::open_in_memory().unwrap();

        let rows = store.insert_many(&[entry("a"), entry("b")]).unwrap();
        assert_eq!(rows, vec![RowIndex(0), RowIndex(1)]);

        let rows = store.insert_many(&[entry("c")]).unwrap();
        assert_eq!(rows, vec![RowIndex(2)]);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_duplicate_external_id_rejects_batch() {
        let store = MetadataStore::open_in_memory().unwrap();
        store.insert_many(&[entry("a")]).unwrap();

        let err = store.insert_many(&[entry("b"), entry("a")]).unwrap_err();
        assert!(matches!(err, DbError::DuplicateExternalId { ref external_id } if external_id == "a"));

        // "b" was rolled back with the batch
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get_by_external_id("b").unwrap().is_none());
    }

    #[test]
    fn test_get_by_external_id_roundtrip() {
        let store = MetadataStore::open_in_memory().unwrap();
        store
            .insert_many(&[entry("a").with_auto_caption(Some("a dog".to_string()))])
            .unwrap();

        let record = store.get_by_external_id("a").unwrap().unwrap();
        assert_eq!(record.row_index, RowIndex(0));
        assert_eq!(record.stored_path, "images/a.png");
        assert_eq!(record.auto_caption.as_deref(), Some("a dog"));
        assert!(record.user_caption.is_none());
        assert!(record.active);
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_get_by_rows_preserves_order() {
        let store = MetadataStore::open_in_memory().unwrap();
        store
            .insert_many(&[entry("a"), entry("b"), entry("c")])
            .unwrap();

        let records = store.get_by_rows(&[RowIndex(2), RowIndex(0)]).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.external_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);

        assert!(store.get_by_rows(&[RowIndex(9)]).is_err());
    }

    #[test]
    fn test_set_active_and_list() {
        let store = MetadataStore::open_in_memory().unwrap();
        store
            .insert_many(&[entry("a"), entry("b"), entry("c")])
            .unwrap();

        store.set_active("b", false).unwrap();

        let active: Vec<_> = store
            .list_all(false)
            .unwrap()
            .into_iter()
            .map(|r| r.external_id)
            .collect();
        assert_eq!(active, vec!["a", "c"]);
        assert_eq!(store.list_all(true).unwrap().len(), 3);
        assert_eq!(store.count().unwrap(), 3);
        assert_eq!(store.count_active().unwrap(), 2);

        // Next insert continues the row sequence
        let rows = store.insert_many(&[entry("d")]).unwrap();
        assert_eq!(rows, vec![RowIndex(3)]);
    }

    #[test]
    fn test_set_user_caption() {
        let store = MetadataStore::open_in_memory().unwrap();
        store.insert_many(&[entry("a")]).unwrap();

        store.set_user_caption("a", Some("sunset")).unwrap();
        assert_eq!(
            store
                .get_by_external_id("a")
                .unwrap()
                .unwrap()
                .user_caption
                .as_deref(),
            Some("sunset")
        );

        store.set_user_caption("a", None).unwrap();
        assert!(store
            .get_by_external_id("a")
            .unwrap()
            .unwrap()
            .user_caption
            .is_none());
    }

    #[test]
    fn test_updates_on_unknown_id() {
        let store = MetadataStore::open_in_memory().unwrap();
        assert!(matches!(
            store.set_active("nope", false),
            Err(DbError::EntryNotFound { .. })
        ));
        assert!(matches!(
            store.set_user_caption("nope", Some("x")),
            Err(DbError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_rows_from() {
        let store = MetadataStore::open_in_memory().unwrap();
        store
            .insert_many(&[entry("a"), entry("b"), entry("c")])
            .unwrap();

        assert_eq!(store.delete_rows_from(RowIndex(1)).unwrap(), 2);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.insert_many(&[entry("d")]).unwrap(), vec![RowIndex(1)]);
    }

    #[test]
    fn test_replace_all_renumbers() {
        let store = MetadataStore::open_in_memory().unwrap();
        store
            .insert_many(&[entry("a"), entry("b"), entry("c")])
            .unwrap();

        let rows = store.replace_all(&[entry("c"), entry("a")]).unwrap();
        assert_eq!(rows, vec![RowIndex(0), RowIndex(1)]);
        assert_eq!(
            store.get_by_external_id("c").unwrap().unwrap().row_index,
            RowIndex(0)
        );
        assert!(store.get_by_external_id("b").unwrap().is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(METADATA_FILENAME);
        {
            let store = MetadataStore::open(&path).unwrap();
            store.insert_many(&[entry("a")]).unwrap();
            store.set_user_caption("a", Some("kept")).unwrap();
        }

        let store = MetadataStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        let record = store.get_by_external_id("a").unwrap().unwrap();
        assert_eq!(record.user_caption.as_deref(), Some("kept"));
    }
}
