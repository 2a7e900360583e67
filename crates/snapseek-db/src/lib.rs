//! # snapseek-db
//!
//! Infrastructure layer for snapseek - vector storage and entry metadata.
//!
//! This crate holds the two persistent stores that `snapseek-core` composes
//! into a single index. Keeping them here means:
//!
//! - `snapseek-core` only depends on plain Rust types and traits
//! - The on-disk formats are owned and versioned in one place
//! - Each store can be tested in isolation with a temp directory
//!
//! ## Architecture
//!
//! ```text
//! snapseek-cli → snapseek-core → (traits)
//!                    ↑
//!              snapseek-db (flat vector file + SQLite metadata)
//!              snapseek-model (embedders + captioner)
//! ```
//!
//! ## Modules
//!
//! - `vector`: Append-only flat vector index with exact inner-product search
//! - `metadata`: SQLite-backed entry metadata keyed by row index
//!
//! ## Usage
//!
//! ```ignore
//! use snapseek_db::vector::{VectorIndexConfig, open_vector_index};
//! use snapseek_db::metadata::MetadataStore;
//!
//! let index = open_vector_index(&VectorIndexConfig::new(512, "data/index.ssvx"))?;
//! let store = MetadataStore::open("data/meta.db")?;
//!
//! let rows = index.append(&[embedding])?;
//! let hits = index.search(&query, 5)?;
//! ```

pub mod error;
pub mod metadata;
pub mod vector;

pub use error::{DbError, DbResult};
