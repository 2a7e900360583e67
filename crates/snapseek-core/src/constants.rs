//! Common constants used throughout snapseek-core.
//!
//! Paths, scoring defaults and ingest limits live here so the engine, the
//! config layer and the CLI agree on them.

// ============================================================================
// Directory Names
// ============================================================================

/// The name of the global snapseek directory (`~/.snapseek`).
pub const SNAPSEEK_HOME_DIR: &str = ".snapseek";

/// Data directory under the home directory when none is configured.
pub const DEFAULT_DATA_DIR_NAME: &str = "data";

/// Subdirectory of the data directory holding ingested image files.
pub const IMAGES_DIR: &str = "images";

/// Global configuration filename.
pub const GLOBAL_CONFIG_FILENAME: &str = "config.yaml";

/// Environment variable pointing at an alternative config file.
pub const SNAPSEEK_CONFIG_ENV: &str = "SNAPSEEK_CONFIG";

// ============================================================================
// Scoring Defaults
// ============================================================================

/// Weight of the visual score in the combined ranking score.
pub const DEFAULT_VISUAL_WEIGHT: f32 = 0.8;

/// Caption weight when the entry carries a user-provided caption.
pub const USER_CAPTION_WEIGHT: f32 = 0.35;

/// Caption weight when only an automatic caption is available.
pub const AUTO_CAPTION_WEIGHT: f32 = 0.20;

/// Absolute lower bound of the acceptance threshold.
pub const MIN_SCORE_FLOOR: f32 = 0.25;

/// Top scores at or above this use the strict threshold factor.
pub const STRICT_FACTOR_CUTOFF: f32 = 0.6;

/// Threshold factor for strong result sets.
pub const STRICT_THRESHOLD_FACTOR: f32 = 0.6;

/// Threshold factor for weak result sets.
pub const LENIENT_THRESHOLD_FACTOR: f32 = 0.7;

/// Results returned when the caller asks for zero or fewer.
pub const DEFAULT_TOP_K: usize = 5;

// ============================================================================
// Blending
// ============================================================================

/// Fixed weight of the image embedding when blending in caption embeddings.
pub const DEFAULT_PRIMARY_WEIGHT: f32 = 0.8;

// ============================================================================
// Ingest
// ============================================================================

/// Images per `add_batch` call during folder ingest.
pub const DEFAULT_INGEST_BATCH_SIZE: usize = 32;

/// Image file extensions accepted for ingest (lowercase, without dot).
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// Extension used when the original one is missing or not allowed.
pub const FALLBACK_IMAGE_EXTENSION: &str = "jpg";

/// Check if a file extension is an accepted image type (case-insensitive).
#[inline]
pub fn is_allowed_image_extension(ext: &str) -> bool {
    let lower = ext.trim_start_matches('.').to_ascii_lowercase();
    ALLOWED_IMAGE_EXTENSIONS.contains(&lower.as_str())
}
