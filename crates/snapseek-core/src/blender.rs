//! Blending of an image embedding with caption embeddings.
//!
//! The image vector keeps a fixed weight `w0`; caption texts share the
//! remaining `1 - w0` in proportion to their own weights. The result is
//! L2-normalized before it reaches the index.

use snapseek_db::vector::l2_normalize;
use snapseek_model::TextEmbedder;
use tracing::debug;

use crate::errors::{SnapError, SnapResult};
use crate::model_adapter::from_model_error;

/// Combines one primary vector with weighted text embeddings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorBlender {
    primary_weight: f32,
    dimension: usize,
}

impl VectorBlender {
    /// Create a blender for vectors of `dimension` components.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Configuration`] if `primary_weight` is outside `(0, 1]`.
    pub fn new(primary_weight: f32, dimension: usize) -> SnapResult<Self> {
        if !(primary_weight > 0.0 && primary_weight <= 1.0) {
            return Err(SnapError::configuration(
                format!("primary weight must be in (0, 1], got {}", primary_weight),
                "Set blend.primaryWeight to a value such as 0.8",
            ));
        }
        Ok(Self {
            primary_weight,
            dimension,
        })
    }

    pub fn primary_weight(&self) -> f32 {
        self.primary_weight
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Blend `primary` with the embeddings of `texts`.
    ///
    /// Pairs with a non-positive weight or blank text are ignored. With no
    /// pair left the primary vector alone is normalized.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::DimensionMismatch`] if the primary vector or any
    /// text embedding has the wrong length, and [`SnapError::Capability`] if
    /// embedding fails.
    pub fn blend(
        &self,
        primary: &[f32],
        texts: &[(&str, f32)],
        embedder: &dyn TextEmbedder,
    ) -> SnapResult<Vec<f32>> {
        self.check_dimension(primary.len())?;

        let valid: Vec<(&str, f32)> = texts
            .iter()
            .filter(|(text, weight)| *weight > 0.0 && weight.is_finite() && !text.trim().is_empty())
            .map(|(text, weight)| (text.trim(), *weight))
            .collect();

        if valid.is_empty() || self.primary_weight >= 1.0 {
            return Ok(l2_normalize(primary));
        }

        let inputs: Vec<&str> = valid.iter().map(|(text, _)| *text).collect();
        let embeddings = embedder.embed_texts(&inputs).map_err(from_model_error)?;
        if embeddings.len() != inputs.len() {
            return Err(SnapError::capability(
                "text-embedder",
                format!(
                    "returned {} embeddings for {} texts",
                    embeddings.len(),
                    inputs.len()
                ),
            ));
        }

        let weight_sum: f32 = valid.iter().map(|(_, w)| w).sum();
        let text_share = 1.0 - self.primary_weight;

        let mut out: Vec<f32> = primary.iter().map(|x| x * self.primary_weight).collect();
        for ((_, weight), embedding) in valid.iter().zip(&embeddings) {
            self.check_dimension(embedding.len())?;
            let w = text_share * weight / weight_sum;
            for (acc, x) in out.iter_mut().zip(embedding) {
                *acc += w * x;
            }
        }

        debug!(
            "Blended primary vector with {} caption(s) (w0={})",
            valid.len(),
            self.primary_weight
        );
        Ok(l2_normalize(&out))
    }

    fn check_dimension(&self, actual: usize) -> SnapResult<()> {
        if actual != self.dimension {
            return Err(SnapError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}
