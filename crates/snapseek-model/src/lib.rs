//! # snapseek-model
//!
//! ML inference layer for snapseek - multimodal embeddings and captions.
//!
//! This crate owns every model snapseek runs:
//!
//! - **Text embedder**: maps a prompt or caption into the shared CLIP space
//! - **Image embedder**: maps encoded image bytes into the same space
//! - **Captioner**: produces a short description of an image (optional)
//! - **Model locator**: runtime path resolution for on-disk checkpoints
//!
//! ## Design Principles
//!
//! 1. **Production-only**: No mock implementations. Test doubles live in consuming crates.
//! 2. **Local-first**: Embeddings run in-process with Candle; captions are opt-in.
//! 3. **Provider-agnostic**: Traits don't leak Candle or HTTP types.
//!
//! ## Model Location
//!
//! Models are searched in this order:
//! 1. `$SNAPSEEK_MODELS_DIR` environment variable
//! 2. `~/.snapseek/models` user directory
//! 3. `{exe_dir}/models` next to the binary
//!
//! ## Features
//!
//! - `embedded` (default): Local Candle CLIP inference
//! - `ollama`: Image captions through an Ollama server
//!
//! ## Usage
//!
//! ```ignore
//! use snapseek_model::{create_embedding_models, EmbeddingConfig};
//!
//! let models = create_embedding_models(&EmbeddingConfig::default())?;
//! let query = models.text.embed_text("a red bicycle")?;
//! let image = models.image.embed_image(&std::fs::read("bike.jpg")?)?;
//! ```

pub mod config;
pub mod error;
pub mod model_locator;

#[cfg(feature = "embedded")]
mod clip;

#[cfg(feature = "ollama")]
mod caption;

use std::sync::Arc;

// Re-export error types
pub use error::{ModelError, ModelResult};

// Re-export config types (canonical source of truth)
pub use config::{
    CaptionConfig, DevicePreference, EmbeddingConfig, HuggingFaceClipConfig,
    HuggingFaceVisionConfig, ModelInfo,
};

// Re-export model locator
pub use model_locator::{
    ModelLocator, CLIP_SUBDIR, DEFAULT_CLIP_MODEL_NAME, REQUIRED_MODEL_FILES,
    SNAPSEEK_MODELS_DIR_ENV,
};

/// Default CLIP checkpoint (full Hugging Face identifier).
pub const DEFAULT_CLIP_MODEL_ID: &str = "openai/clip-vit-base-patch32";

/// Default Ollama server.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Default vision-language model used for captions.
pub const DEFAULT_CAPTION_MODEL: &str = "llava";

// ============================================================================
// Capability Traits
// ============================================================================

/// Maps text into the shared embedding space.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across threads.
pub trait TextEmbedder: Send + Sync + std::fmt::Debug {
    /// Embed a batch of texts, one vector per input.
    fn embed_texts(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed_text(&self, text: &str) -> ModelResult<Vec<f32>> {
        self.embed_texts(&[text])?
            .pop()
            .ok_or_else(|| ModelError::embedding_failed("text", "model returned no embedding"))
    }

    /// Output dimension.
    fn dimension(&self) -> usize;
}

/// Maps encoded image bytes into the shared embedding space.
pub trait ImageEmbedder: Send + Sync + std::fmt::Debug {
    /// Embed one encoded image (JPEG, PNG, BMP or WebP).
    fn embed_image(&self, bytes: &[u8]) -> ModelResult<Vec<f32>>;

    /// Output dimension.
    fn dimension(&self) -> usize;
}

/// Produces a short natural-language description of an image.
pub trait Captioner: Send + Sync + std::fmt::Debug {
    /// Describe one encoded image.
    fn caption(&self, bytes: &[u8]) -> ModelResult<String>;

    /// Provider name, for logs and errors.
    fn name(&self) -> &str;
}

/// Text and image embedders that share one embedding space.
#[derive(Debug, Clone)]
pub struct EmbeddingModels {
    pub text: Arc<dyn TextEmbedder>,
    pub image: Arc<dyn ImageEmbedder>,
    pub info: ModelInfo,
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Load the CLIP model and expose it as both embedders.
///
/// # Errors
///
/// Returns `ModelError` if the checkpoint is missing, unsupported, or fails to load.
#[cfg(feature = "embedded")]
pub fn create_embedding_models(config: &EmbeddingConfig) -> ModelResult<EmbeddingModels> {
    let model = Arc::new(clip::CandleClipModel::new(config)?);
    let info = model.model_info().clone();
    Ok(EmbeddingModels {
        text: model.clone(),
        image: model,
        info,
    })
}

#[cfg(not(feature = "embedded"))]
pub fn create_embedding_models(_config: &EmbeddingConfig) -> ModelResult<EmbeddingModels> {
    Err(ModelError::ProviderNotAvailable {
        provider: "candle".to_string(),
        reason: "No embedding providers available. Enable the 'embedded' feature.".to_string(),
    })
}

/// Build the configured captioner, or `None` when captioning is disabled.
///
/// # Errors
///
/// Returns `ModelError::ProviderNotAvailable` when captions are enabled but
/// the crate was built without the `ollama` feature.
pub fn create_captioner(config: &CaptionConfig) -> ModelResult<Option<Arc<dyn Captioner>>> {
    if !config.enabled {
        return Ok(None);
    }

    #[cfg(feature = "ollama")]
    {
        let captioner = caption::OllamaCaptioner::new(config)?;
        Ok(Some(Arc::new(captioner)))
    }

    #[cfg(not(feature = "ollama"))]
    {
        Err(ModelError::ProviderNotAvailable {
            provider: "ollama".to_string(),
            reason: format!(
                "captioning is enabled for model '{}' but this build lacks the 'ollama' feature",
                config.model
            ),
        })
    }
}

// ============================================================================
// Re-export implementations (feature-gated)
// ============================================================================

#[cfg(feature = "embedded")]
pub use clip::{preprocess_image, CandleClipModel};

#[cfg(feature = "ollama")]
pub use caption::OllamaCaptioner;
