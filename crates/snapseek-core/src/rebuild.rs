//! Offline compaction.
//!
//! Soft-deleted entries keep their rows forever while serving. `rebuild`
//! is the explicit way to drop them: both stores are rewritten with only the
//! active entries and a fresh contiguous row space. Stored vectors are reused,
//! nothing is re-embedded.
//!
//! Before touching anything the current files are copied to `*.bak` so a
//! crash between the two rewrites can be undone by hand.

use std::fs;
use std::path::{Path, PathBuf};

use snapseek_db::metadata::METADATA_FILENAME;
use snapseek_db::vector::INDEX_FILENAME;
use tracing::{debug, info};

use crate::errors::{SnapError, SnapResult};
use crate::index_manager::IndexManager;
use crate::types::RebuildReport;

/// Suffix of the copies taken before a rebuild.
pub const BACKUP_SUFFIX: &str = "bak";

/// Compact `index`, keeping only active entries.
pub fn rebuild_index(index: &IndexManager) -> SnapResult<RebuildReport> {
    let backups = backup_data_files(index.data_dir())?;
    debug!("Backed up {} files before rebuild", backups.len());

    let (rows_before, rows_after) = index.compact_active()?;
    info!(
        "Rebuild complete: {} rows -> {} rows ({} removed)",
        rows_before,
        rows_after,
        rows_before - rows_after
    );

    Ok(RebuildReport {
        rows_before,
        rows_after,
    })
}

/// Copy the index and metadata files to `<name>.bak`. Returns the copies made.
pub fn backup_data_files(data_dir: &Path) -> SnapResult<Vec<PathBuf>> {
    let mut copies = Vec::new();
    for name in [INDEX_FILENAME, METADATA_FILENAME] {
        let source = data_dir.join(name);
        if !source.exists() {
            continue;
        }
        let target = data_dir.join(format!("{}.{}", name, BACKUP_SUFFIX));
        fs::copy(&source, &target)
            .map_err(|e| SnapError::storage(&target, format!("backup failed: {}", e)))?;
        copies.push(target);
    }
    Ok(copies)
}
