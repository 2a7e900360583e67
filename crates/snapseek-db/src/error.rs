//! Storage errors.
//!
//! Vector file failures carry the path of `index.ssvx`; metadata failures
//! come from SQLite or from rows that break the schema's expectations.

use std::path::PathBuf;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// Reading or writing the vector file failed.
    #[error("cannot access vector index {path}: {message}")]
    VectorIo { path: PathBuf, message: String },

    /// The vector file exists but its header or body is malformed.
    #[error("vector index {path} is corrupt: {message}")]
    VectorParse { path: PathBuf, message: String },

    #[error("vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Opening without `create_if_missing` and no file is there.
    #[error("no vector index at {path}")]
    IndexNotFound { path: PathBuf },

    /// The file on disk was written for another dimension or format version.
    #[error("vector index {path} cannot be used: {reason}")]
    IndexIncompatible { path: PathBuf, reason: String },

    #[error("metadata store: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("an entry with external id {external_id} already exists")]
    DuplicateExternalId { external_id: String },

    #[error("no entry with external id {external_id}")]
    EntryNotFound { external_id: String },

    /// A column held something the record types cannot represent.
    #[error("unreadable metadata value: {message}")]
    InvalidDbValue { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("internal storage error: {message}")]
    Internal { message: String },
}

impl DbError {
    pub fn vector_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorIo {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn vector_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorParse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn index_incompatible(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::IndexIncompatible {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn entry_not_found(external_id: impl Into<String>) -> Self {
        Self::EntryNotFound {
            external_id: external_id.into(),
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidDbValue {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
