//! Configuration types for snapseek.
//!
//! - [`GlobalConfig`]: user-level configuration stored in `~/.snapseek/config.yaml`
//! - [`IndexSettings`]: vector dimension and startup recovery
//! - [`ScoringConfig`]: caption weights and the acceptance floor
//! - [`BlendConfig`]: image weight used when caption vectors are blended in
//! - [`IngestConfig`]: folder ingest batching
//!
//! Embedding and captioning settings are the canonical types from
//! `snapseek-model`, embedded unchanged.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use snapseek_model::{CaptionConfig, DevicePreference, EmbeddingConfig};

use crate::constants::{
    AUTO_CAPTION_WEIGHT, DEFAULT_DATA_DIR_NAME, DEFAULT_INGEST_BATCH_SIZE, DEFAULT_PRIMARY_WEIGHT,
    GLOBAL_CONFIG_FILENAME, IMAGES_DIR, MIN_SCORE_FLOOR, SNAPSEEK_HOME_DIR, USER_CAPTION_WEIGHT,
};
use crate::errors::SnapError;

/// Embedding dimension of CLIP ViT-B/32.
pub const DEFAULT_DIMENSION: usize = 512;

// ============================================================================
// GlobalConfig
// ============================================================================

/// Global (user-level) configuration for snapseek.
///
/// # Example YAML
///
/// ```yaml
/// dataDir: /srv/snapseek
/// index:
///   dimension: 512
///   recoverDanglingTail: true
/// scoring:
///   userCaptionWeight: 0.35
///   autoCaptionWeight: 0.2
///   minScoreFloor: 0.25
/// embedding:
///   modelId: openai/clip-vit-base-patch32
///   device: cpu
/// captioning:
///   enabled: true
///   endpoint: http://localhost:11434
///   model: llava
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    /// Where the index, metadata and images live. Defaults to `~/.snapseek/data`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub index: IndexSettings,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub blend: BlendConfig,

    /// CLIP model selection.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Automatic captions at ingest time (off by default).
    #[serde(default)]
    pub captioning: CaptionConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

impl GlobalConfig {
    /// Load the global configuration from the default location (`~/.snapseek/config.yaml`).
    ///
    /// If the file does not exist, returns a default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::InvalidGlobalConfig`] if the file exists but cannot be parsed.
    pub fn load_default() -> Result<Self, SnapError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load the global configuration from a specific path.
    ///
    /// If the file does not exist, returns a default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::InvalidGlobalConfig`] if the file exists but cannot be parsed.
    /// Returns [`SnapError::Configuration`] if validation fails.
    pub fn from_path(path: &Path) -> Result<Self, SnapError> {
        if !path.exists() {
            tracing::debug!(
                "Global config not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SnapError::InvalidGlobalConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            SnapError::InvalidGlobalConfig(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let warnings = config.validate()?;
        for warning in warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Get the default global directory (`~/.snapseek`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(SNAPSEEK_HOME_DIR))
    }

    /// Get the default global config file path (`~/.snapseek/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(GLOBAL_CONFIG_FILENAME))
    }

    /// Configuration rooted at `data_dir`, everything else default.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Override the embedding device.
    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.embedding.device = device;
        self
    }

    /// The effective data directory.
    ///
    /// Falls back to `./.snapseek/data` when the home directory is unknown.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.data_dir {
            return dir.clone();
        }
        Self::default_dir()
            .unwrap_or_else(|| PathBuf::from(SNAPSEEK_HOME_DIR))
            .join(DEFAULT_DATA_DIR_NAME)
    }

    /// Directory holding ingested image files.
    pub fn images_dir(&self) -> PathBuf {
        self.resolved_data_dir().join(IMAGES_DIR)
    }

    /// Validate the whole configuration, returning warnings for questionable values.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Configuration`] for values the engine cannot run with.
    pub fn validate(&self) -> Result<Vec<String>, SnapError> {
        let mut all_warnings = Vec::new();
        all_warnings.extend(self.index.validate()?);
        all_warnings.extend(self.scoring.validate()?);
        all_warnings.extend(self.blend.validate()?);
        all_warnings.extend(self.ingest.validate()?);
        self.embedding.validate().map_err(|e| {
            SnapError::configuration(
                e.to_string(),
                "Set embedding.maxSequenceLength between 1 and 77",
            )
        })?;
        Ok(all_warnings)
    }
}

// ============================================================================
// IndexSettings
// ============================================================================

/// Vector index settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    /// Vector dimensionality D. Must match the embedding model.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Truncate a vector tail left behind by an interrupted ingest at startup.
    /// Off by default: any count mismatch is fatal.
    #[serde(default)]
    pub recover_dangling_tail: bool,
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            recover_dangling_tail: false,
        }
    }
}

impl IndexSettings {
    /// Validates the index settings.
    ///
    /// # Errors
    /// Returns an error if `dimension` is 0.
    pub fn validate(&self) -> Result<Vec<String>, SnapError> {
        if self.dimension == 0 {
            return Err(SnapError::configuration(
                "index.dimension cannot be 0",
                "Set dimension to the embedding model's output size (512 for CLIP ViT-B/32)",
            ));
        }

        let mut warnings = Vec::new();
        if self.dimension != DEFAULT_DIMENSION {
            warnings.push(format!(
                "index.dimension={} differs from the bundled CLIP model ({}); ingest will fail unless a matching model is configured",
                self.dimension, DEFAULT_DIMENSION
            ));
        }
        Ok(warnings)
    }
}

// ============================================================================
// ScoringConfig
// ============================================================================

/// Relevance scoring weights.
///
/// The caption weight chosen for an entry is the text share of its combined
/// score; the visual share is the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Caption weight for entries with a user caption.
    #[serde(default = "default_user_caption_weight")]
    pub user_caption_weight: f32,

    /// Caption weight for entries with only an automatic caption.
    #[serde(default = "default_auto_caption_weight")]
    pub auto_caption_weight: f32,

    /// Absolute lower bound of the acceptance threshold.
    #[serde(default = "default_min_score_floor")]
    pub min_score_floor: f32,
}

fn default_user_caption_weight() -> f32 {
    USER_CAPTION_WEIGHT
}
fn default_auto_caption_weight() -> f32 {
    AUTO_CAPTION_WEIGHT
}
fn default_min_score_floor() -> f32 {
    MIN_SCORE_FLOOR
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            user_caption_weight: USER_CAPTION_WEIGHT,
            auto_caption_weight: AUTO_CAPTION_WEIGHT,
            min_score_floor: MIN_SCORE_FLOOR,
        }
    }
}

impl ScoringConfig {
    /// Validates the scoring weights.
    ///
    /// # Errors
    /// Returns an error if a caption weight is outside `[0, 1)` or the floor is not finite.
    pub fn validate(&self) -> Result<Vec<String>, SnapError> {
        for (name, weight) in [
            ("userCaptionWeight", self.user_caption_weight),
            ("autoCaptionWeight", self.auto_caption_weight),
        ] {
            if !(0.0..1.0).contains(&weight) {
                return Err(SnapError::configuration(
                    format!("scoring.{} must be in [0, 1), got {}", name, weight),
                    "Caption weights are the text share of the combined score (defaults: 0.35 user, 0.2 auto)",
                ));
            }
        }

        if !self.min_score_floor.is_finite() {
            return Err(SnapError::configuration(
                "scoring.minScoreFloor must be a finite number",
                "Use a value between 0 and 1 (default 0.25)",
            ));
        }

        let mut warnings = Vec::new();
        if self.user_caption_weight < self.auto_caption_weight {
            warnings.push(format!(
                "scoring.userCaptionWeight ({}) < autoCaptionWeight ({}); user captions will count less than generated ones",
                self.user_caption_weight, self.auto_caption_weight
            ));
        }
        if self.min_score_floor >= 1.0 {
            warnings.push(format!(
                "scoring.minScoreFloor={} is at or above the maximum cosine score; every query will fall back to a single low-confidence result",
                self.min_score_floor
            ));
        }
        Ok(warnings)
    }
}

// ============================================================================
// BlendConfig
// ============================================================================

/// Ingest-time blending of image and caption vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendConfig {
    /// Weight of the image embedding, in `(0, 1]`.
    #[serde(default = "default_primary_weight")]
    pub primary_weight: f32,

    /// Blend the user description into the stored vector.
    #[serde(default = "default_true")]
    pub blend_user_caption: bool,

    /// Blend the automatic caption into the stored vector.
    #[serde(default = "default_true")]
    pub blend_auto_caption: bool,
}

fn default_primary_weight() -> f32 {
    DEFAULT_PRIMARY_WEIGHT
}
fn default_true() -> bool {
    true
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            primary_weight: DEFAULT_PRIMARY_WEIGHT,
            blend_user_caption: true,
            blend_auto_caption: true,
        }
    }
}

impl BlendConfig {
    /// Validates the blend settings.
    ///
    /// # Errors
    /// Returns an error if `primary_weight` is outside `(0, 1]`.
    pub fn validate(&self) -> Result<Vec<String>, SnapError> {
        if !(self.primary_weight > 0.0 && self.primary_weight <= 1.0) {
            return Err(SnapError::configuration(
                format!("blend.primaryWeight must be in (0, 1], got {}", self.primary_weight),
                "Use 0.8 to keep the image dominant, or 1.0 to store image vectors only",
            ));
        }

        let mut warnings = Vec::new();
        if self.primary_weight < 0.5 && (self.blend_user_caption || self.blend_auto_caption) {
            warnings.push(format!(
                "blend.primaryWeight={} lets captions dominate the stored image vectors",
                self.primary_weight
            ));
        }
        Ok(warnings)
    }
}

// ============================================================================
// IngestConfig
// ============================================================================

/// Folder ingest tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestConfig {
    /// Images per batch (one lock and one transaction per batch).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Read image files of a batch in parallel using rayon.
    #[serde(default = "default_true")]
    pub parallel_file_reading: bool,
}

fn default_batch_size() -> usize {
    DEFAULT_INGEST_BATCH_SIZE
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_INGEST_BATCH_SIZE,
            parallel_file_reading: true,
        }
    }
}

impl IngestConfig {
    /// Validates the ingest settings.
    ///
    /// # Errors
    /// Returns an error if `batch_size` is 0.
    pub fn validate(&self) -> Result<Vec<String>, SnapError> {
        if self.batch_size == 0 {
            return Err(SnapError::configuration(
                "ingest.batchSize cannot be 0",
                "Set batchSize to at least 1 (recommended: 32)",
            ));
        }

        let mut warnings = Vec::new();
        if self.batch_size > 512 {
            warnings.push(format!(
                "ingest.batchSize={} is very large; a failed batch rolls back every image in it",
                self.batch_size
            ));
        }
        Ok(warnings)
    }
}
