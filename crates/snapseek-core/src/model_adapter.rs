//! Adapter layer for snapseek-model infrastructure.
//!
//! Converts `ModelError` into `SnapError`. Model discovery failures keep the
//! full `ModelError` message since it carries the install instructions.

use crate::errors::SnapError;

// ============================================================================
// Error Conversion
// ============================================================================

/// Convert a snapseek-model error to a snapseek-core error.
pub fn from_model_error(err: snapseek_model::ModelError) -> SnapError {
    use snapseek_model::ModelError;

    match err {
        ModelError::ModelsDirectoryNotFound { .. }
        | ModelError::IncompleteModelFiles { .. }
        | ModelError::DeviceNotAvailable { .. } => SnapError::capability("model-locator", err.to_string()),

        ModelError::ModelNotFound { ref model_id, .. } => {
            SnapError::capability(model_id.clone(), err.to_string())
        }

        ModelError::ModelLoad { model_id, message } => SnapError::capability(model_id, message),

        ModelError::InvalidConfig { message } => SnapError::configuration(
            message,
            "Only CLIP ViT-B/32 checkpoints are supported",
        ),

        ModelError::Tokenization { message } => SnapError::capability("tokenizer", message),

        // The caller handed us bytes that are not an image.
        ModelError::ImageDecode { message } => {
            SnapError::validation(format!("image could not be decoded: {}", message))
        }

        ModelError::EmbeddingFailed { model_id, message } => {
            SnapError::capability(model_id, message)
        }

        ModelError::CaptionFailed { provider, message } => SnapError::capability(provider, message),

        ModelError::ProviderNotAvailable { provider, reason } => {
            SnapError::capability(provider, reason)
        }

        ModelError::Io(io_err) => SnapError::Io(io_err),

        ModelError::Json(json_err) => SnapError::Json(json_err),
    }
}

/// Extension trait to convert snapseek-model Result to Result<T, SnapError>.
pub trait IntoSnapModelResult<T> {
    /// Convert a snapseek-model result to a SnapError result.
    fn into_snap_result(self) -> Result<T, SnapError>;
}

impl<T> IntoSnapModelResult<T> for Result<T, snapseek_model::ModelError> {
    fn into_snap_result(self) -> Result<T, SnapError> {
        self.map_err(from_model_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapseek_model::ModelError;

    #[test]
    fn test_image_decode_is_validation() {
        let err = from_model_error(ModelError::image_decode("bad header"));
        assert!(matches!(err, SnapError::Validation(_)));
    }

    #[test]
    fn test_missing_models_keeps_hint() {
        let err = from_model_error(ModelError::ModelsDirectoryNotFound { searched: vec![] });
        match err {
            SnapError::Capability { reason, .. } => assert!(reason.contains("SNAPSEEK_MODELS_DIR")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_caption_failure_is_capability() {
        let err = from_model_error(ModelError::caption_failed("ollama", "timeout"));
        assert!(matches!(err, SnapError::Capability { provider, .. } if provider == "ollama"));
    }
}
