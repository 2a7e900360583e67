//! The error type shared by every snapseek-core operation.
//!
//! Configuration, alignment and global-config errors are fatal: the CLI
//! exits with status 2 for them and 1 for everything else.

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific errors for snapseek operations.
#[derive(Error, Debug)]
pub enum SnapError {
    // =========================================================================
    // Startup Errors
    // =========================================================================
    /// Global configuration file is invalid.
    #[error("Global config invalid: {0}")]
    InvalidGlobalConfig(String),

    /// A configuration value is invalid.
    ///
    /// Covers invalid weights and a persisted index whose dimension differs
    /// from the configured one.
    #[error("Invalid configuration: {message}. {hint}")]
    Configuration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// The vector index and the metadata store disagree on the number of rows.
    #[error("Index out of alignment: {vectors} vectors but {entries} metadata entries. Run `snapseek rebuild` or restore a backup.")]
    Alignment {
        /// Rows in the vector index.
        vectors: usize,
        /// Rows in the metadata store.
        entries: usize,
    },

    // =========================================================================
    // Request Errors
    // =========================================================================
    /// The request itself is invalid (empty prompt, empty upload, ...).
    #[error("Invalid request: {0}")]
    Validation(String),

    /// No entry exists with this external id.
    #[error("Entry `{0}` not found.")]
    NotFound(String),

    /// A runtime vector does not have the configured dimension.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// The vector was appended, the metadata insert failed, and the vector
    /// could not be rolled back either.
    #[error("Ingest left the index inconsistent: {reason}. Restart with index.recoverDanglingTail enabled.")]
    IngestPartialFailure {
        /// What failed, including the rollback failure.
        reason: String,
    },

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    /// An embedding or caption provider failed.
    #[error("Capability `{provider}` failed: {reason}")]
    Capability {
        /// Provider or model name.
        provider: String,
        /// Description of the failure.
        reason: String,
    },

    /// The vector index or metadata store failed.
    #[error("{}", storage_message(.path, .message))]
    Storage {
        /// File the failure relates to; empty for SQLite errors.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot encode or decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot encode or decode YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Failures surfaced through `anyhow` at the engine construction edge.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn storage_message(path: &std::path::Path, message: &str) -> String {
    if path.as_os_str().is_empty() {
        format!("Storage error: {}", message)
    } else {
        format!("Storage error at {}: {}", path.display(), message)
    }
}

impl SnapError {
    /// `message` says what is wrong, `hint` what to change.
    pub fn configuration(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn capability(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Capability {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Errors that mean the engine cannot start until the operator intervenes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::Alignment { .. } | Self::InvalidGlobalConfig(_)
        )
    }
}

pub type SnapResult<T> = Result<T, SnapError>;
