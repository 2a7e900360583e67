//! Entry metadata persistence.
//!
//! A single SQLite table keyed by row index. Rows are written in the same
//! order as the vector index so that `row_index` addresses both stores.

mod schema;
mod store;
mod types;

pub use schema::{migrate, schema_version, SCHEMA_VERSION};
pub use store::{MetadataStore, METADATA_FILENAME};
pub use types::{EntryRecord, NewEntry};
