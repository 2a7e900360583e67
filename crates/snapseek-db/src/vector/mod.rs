//! Vector index module for snapseek-db.
//!
//! An append-only store of unit-norm vectors with exact inner-product search.
//! Rows are addressed by their zero-based position, which doubles as the key
//! of the entry's metadata row.
//!
//! ## Usage
//!
//! ```ignore
//! use snapseek_db::vector::{VectorIndexConfig, open_vector_index};
//!
//! let config = VectorIndexConfig::new(512, "data/index.ssvx");
//! let index = open_vector_index(&config)?;
//!
//! let rows = index.append(&[embedding])?;
//! let hits = index.search(&query, 5)?;
//! ```

mod config;
mod flat;
pub mod math;
mod traits;

pub use config::{
    check_index_compatibility, read_index_header, IndexHeader, VectorIndexCompatibility,
    VectorIndexConfig, FILE_MAGIC, FORMAT_VERSION, HEADER_LEN, INDEX_FILENAME,
};
pub use flat::FlatVectorIndex;
pub use math::{cosine_similarity, dot, l2_normalize, l2_normalize_in_place, NORM_EPSILON};
pub use traits::{RowIndex, VectorHit, VectorIndexBackend};

use crate::error::{DbError, DbResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Open a vector index with the given configuration.
///
/// It will:
/// 1. Check whether an existing index file matches the configured dimension
/// 2. Create a new empty index if none exists (and `create_if_missing` is true)
/// 3. Load the index into memory
///
/// # Errors
///
/// Returns an error if:
/// - The index exists with a different dimension
/// - The index file is corrupted
/// - The index cannot be created or read
pub fn open_vector_index(config: &VectorIndexConfig) -> DbResult<Arc<dyn VectorIndexBackend>> {
    debug!("Opening vector index at {:?}", config.path);

    match check_index_compatibility(config) {
        VectorIndexCompatibility::Compatible => {
            debug!("Index is compatible, opening...");
        }
        VectorIndexCompatibility::NotFound => {
            if !config.create_if_missing {
                return Err(DbError::IndexNotFound {
                    path: config.path.clone(),
                });
            }
            info!("Index not found, creating new index at {:?}", config.path);
        }
        VectorIndexCompatibility::IncompatibleDimension { expected, actual } => {
            return Err(DbError::DimensionMismatch { expected, actual });
        }
        VectorIndexCompatibility::Corrupted(msg) => {
            return Err(DbError::index_incompatible(
                &config.path,
                format!("Index corrupted: {}", msg),
            ));
        }
    }

    let index = FlatVectorIndex::open(config)?;
    Ok(Arc::new(index))
}
