//! The model capabilities the engine consumes.
//!
//! Built once at startup and handed to [`crate::SnapEngine`]. Nothing in the
//! engine loads a model lazily.

use std::sync::Arc;

use snapseek_model::{Captioner, ImageEmbedder, TextEmbedder};
use tracing::info;

use crate::config::GlobalConfig;
use crate::errors::{SnapError, SnapResult};
use crate::model_adapter::from_model_error;

/// Text embedder, image embedder and optional captioner.
///
/// Both embedders must map into the same space of the same dimension.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub text: Arc<dyn TextEmbedder>,
    pub image: Arc<dyn ImageEmbedder>,
    pub captioner: Option<Arc<dyn Captioner>>,
}

impl Capabilities {
    /// Bundle two embedders without a captioner.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Configuration`] if the embedders disagree on dimension.
    pub fn new(text: Arc<dyn TextEmbedder>, image: Arc<dyn ImageEmbedder>) -> SnapResult<Self> {
        if text.dimension() != image.dimension() {
            return Err(SnapError::configuration(
                format!(
                    "text embedder produces {} dimensions but image embedder produces {}",
                    text.dimension(),
                    image.dimension()
                ),
                "Use a single CLIP checkpoint for both text and images",
            ));
        }
        Ok(Self {
            text,
            image,
            captioner: None,
        })
    }

    /// Attach a captioner.
    pub fn with_captioner(mut self, captioner: Arc<dyn Captioner>) -> Self {
        self.captioner = Some(captioner);
        self
    }

    /// Load the configured CLIP model and, if enabled, the captioner.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Capability`] if the model cannot be loaded and
    /// [`SnapError::Configuration`] if its dimension differs from `index.dimension`.
    pub fn from_config(config: &GlobalConfig) -> SnapResult<Self> {
        let models =
            snapseek_model::create_embedding_models(&config.embedding).map_err(from_model_error)?;

        if models.info.dimension != config.index.dimension {
            return Err(SnapError::configuration(
                format!(
                    "model '{}' produces {} dimensions but index.dimension is {}",
                    models.info.model_id, models.info.dimension, config.index.dimension
                ),
                "Set index.dimension to match the embedding model",
            ));
        }

        let mut caps = Self::new(models.text, models.image)?;
        if let Some(captioner) =
            snapseek_model::create_captioner(&config.captioning).map_err(from_model_error)?
        {
            info!("Automatic captions enabled ({})", captioner.name());
            caps = caps.with_captioner(captioner);
        }
        Ok(caps)
    }

    /// Shared embedding dimension.
    pub fn dimension(&self) -> usize {
        self.text.dimension()
    }
}
