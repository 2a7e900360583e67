//! Adapter layer for snapseek-db infrastructure.
//!
//! Bridges the storage crate with snapseek-core's error type:
//!
//! - Error conversion from `DbError` to `SnapError`
//! - [`IntoSnapResult`] for `?` on storage results
//!
//! ## Architecture
//!
//! ```text
//! snapseek-core domain code (index_manager, engine, rebuild)
//!        ↓
//!   db_adapter (this module) - conversions
//!        ↓
//!     snapseek-db implementations (flat vector file, SQLite metadata)
//! ```

use std::path::PathBuf;

use crate::errors::SnapError;

// ============================================================================
// Error Conversion
// ============================================================================

/// Convert a snapseek-db error to a snapseek-core error.
pub fn from_db_error(err: snapseek_db::DbError) -> SnapError {
    use snapseek_db::DbError;

    match err {
        DbError::Io(io_err) => SnapError::Io(io_err),

        DbError::VectorIo { path, message } => SnapError::Storage { path, message },

        DbError::VectorParse { path, message } => SnapError::Storage {
            path,
            message: format!("corrupt vector index: {}", message),
        },

        DbError::DimensionMismatch { expected, actual } => {
            SnapError::DimensionMismatch { expected, actual }
        }

        DbError::IndexNotFound { path } => SnapError::Storage {
            path,
            message: "vector index not found".to_string(),
        },

        DbError::IndexIncompatible { path, reason } => SnapError::Configuration {
            message: format!("vector index at {} is incompatible: {}", path.display(), reason),
            hint: "Point dataDir at a fresh directory or run `snapseek rebuild`".to_string(),
        },

        DbError::Sqlite(sql_err) => SnapError::Storage {
            path: PathBuf::new(),
            message: sql_err.to_string(),
        },

        DbError::DuplicateExternalId { external_id } => {
            SnapError::Validation(format!("external id `{}` already exists", external_id))
        }

        DbError::EntryNotFound { external_id } => SnapError::NotFound(external_id),

        DbError::InvalidDbValue { message } => SnapError::Storage {
            path: PathBuf::new(),
            message,
        },

        DbError::Internal { message } => SnapError::Internal(message),
    }
}

/// Extension trait to convert snapseek-db Result to Result<T, SnapError>.
pub trait IntoSnapResult<T> {
    /// Convert a snapseek-db result to a SnapError result.
    fn into_snap_result(self) -> Result<T, SnapError>;
}

impl<T> IntoSnapResult<T> for Result<T, snapseek_db::DbError> {
    fn into_snap_result(self) -> Result<T, SnapError> {
        self.map_err(from_db_error)
    }
}
