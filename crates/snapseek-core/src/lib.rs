//! # snapseek-core
//!
//! **snapseek** – semantic image retrieval core library.
//!
//! Images and text prompts are embedded into one CLIP space. Each ingested
//! image gets a row in a flat vector index and a row with the same number in
//! a metadata store. Queries are ranked by visual similarity blended with how
//! well the prompt matches the image's caption.
//!
//! ## Main Types
//!
//! - [`SnapEngine`] – the main entry point for ingest, query and maintenance
//! - [`IndexManager`] – the aligned vector index and metadata store
//! - [`RelevanceScorer`] – combined scoring and the adaptive threshold
//! - [`VectorBlender`] – image/caption vector blending at ingest
//! - [`SnapError`] – domain-specific error type
//!
//! ## Example
//!
//! ```ignore
//! use snapseek_core::{GlobalConfig, SnapEngine};
//!
//! let engine = SnapEngine::from_global_config(GlobalConfig::load_default()?)?;
//! engine.ingest_folder(std::path::Path::new("./photos"), None)?;
//!
//! if let Some(caption) = engine.describe_best_match("a dog on the beach")? {
//!     println!("{}", caption);
//! }
//! ```

// Modules
pub mod assets;
pub mod blender;
pub mod capabilities;
pub mod config;
pub mod constants;
pub mod db_adapter;
pub mod engine;
pub mod errors;
pub mod index_manager;
pub mod model_adapter;
pub mod rebuild;
pub mod scorer;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use assets::{normalized_extension, AssetStore, StoredAsset};
pub use blender::VectorBlender;
pub use capabilities::Capabilities;
pub use config::{
    BlendConfig, GlobalConfig, IndexSettings, IngestConfig, ScoringConfig, DEFAULT_DIMENSION,
};
pub use constants::{
    is_allowed_image_extension, ALLOWED_IMAGE_EXTENSIONS, AUTO_CAPTION_WEIGHT,
    DEFAULT_TOP_K, DEFAULT_VISUAL_WEIGHT, GLOBAL_CONFIG_FILENAME, MIN_SCORE_FLOOR,
    SNAPSEEK_CONFIG_ENV, SNAPSEEK_HOME_DIR, USER_CAPTION_WEIGHT,
};
pub use engine::{collect_image_files, IngestProgress, SnapEngine};
pub use errors::{SnapError, SnapResult};
pub use index_manager::IndexManager;
pub use rebuild::{backup_data_files, rebuild_index};
pub use scorer::{
    combine, combine_default, dynamic_minimum_score, dynamic_minimum_score_with_floor,
    text_score, RelevanceScorer,
};
pub use types::{
    effective_caption, Entry, FolderIngestReport, HealthReport, IngestResult, IngestSkip,
    RebuildReport, RowIndex, ScoredResult,
};

// snapseek-db adapter - for bridging storage errors
pub use db_adapter::{from_db_error, IntoSnapResult};

// snapseek-model adapter - for bridging inference errors
pub use model_adapter::{from_model_error, IntoSnapModelResult};

// Model configuration is owned by snapseek-model
pub use snapseek_model::{CaptionConfig, DevicePreference, EmbeddingConfig};
