//! Inference errors.
//!
//! Installation problems (missing directory, missing files, unusable GPU)
//! print the fix alongside the failure, since they are what a first run hits.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

const REQUIRED_FILES_HELP: &str = "A CLIP model directory holds model.safetensors and tokenizer.json; \
     config.json is optional and checked when present.";

#[derive(Debug, Error)]
pub enum ModelError {
    /// None of the [`crate::ModelLocator`] search roots exist.
    #[error("{}", models_dir_help(.searched))]
    ModelsDirectoryNotFound { searched: Vec<PathBuf> },

    #[error("model {model_id} not found at {}\n\n{}", .path.display(), REQUIRED_FILES_HELP)]
    ModelNotFound { model_id: String, path: PathBuf },

    #[error("{}", incomplete_help(.path, .missing))]
    IncompleteModelFiles {
        path: PathBuf,
        missing: Vec<&'static str>,
    },

    #[error("cannot load model {model_id}: {message}")]
    ModelLoad { model_id: String, message: String },

    /// `config.json` describes something other than a ViT-B/32 CLIP.
    #[error("unsupported model configuration: {message} (only CLIP ViT-B/32 checkpoints load)")]
    InvalidConfig { message: String },

    #[error("tokenizer: {message}")]
    Tokenization { message: String },

    #[error("cannot decode image: {message}")]
    ImageDecode { message: String },

    #[error("{model_id} failed to embed: {message}")]
    EmbeddingFailed { model_id: String, message: String },

    #[error("{provider} failed to caption: {message}")]
    CaptionFailed { provider: String, message: String },

    #[error("{provider} is not available: {reason}")]
    ProviderNotAvailable { provider: String, reason: String },

    #[error("GPU requested but not usable: {reason}\nSet embedding.device: cpu in ~/.snapseek/config.yaml or pass --device cpu.")]
    DeviceNotAvailable { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed model config: {0}")]
    Json(#[from] serde_json::Error),
}

fn models_dir_help(searched: &[PathBuf]) -> String {
    let mut out = String::from("no models directory found; searched:\n");
    for (n, path) in searched.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", n + 1, path.display()));
    }
    out.push_str(
        "\nSet $SNAPSEEK_MODELS_DIR, or place the models in ~/.snapseek/models \
         or in models/ next to the snapseek binary.",
    );
    out
}

fn incomplete_help(path: &Path, missing: &[&str]) -> String {
    format!(
        "model directory {} is missing {}\n\n{}",
        path.display(),
        missing.join(", "),
        REQUIRED_FILES_HELP
    )
}

impl ModelError {
    pub fn model_load(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    pub fn embedding_failed(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingFailed {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    pub fn caption_failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CaptionFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn tokenization(message: impl Into<String>) -> Self {
        Self::Tokenization {
            message: message.into(),
        }
    }

    pub fn image_decode(message: impl Into<String>) -> Self {
        Self::ImageDecode {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_dir_not_found_lists_locations() {
        let err = ModelError::ModelsDirectoryNotFound {
            searched: vec![PathBuf::from("/a/models"), PathBuf::from("/b/models")],
        };
        let msg = err.to_string();
        assert!(msg.contains("1. /a/models"));
        assert!(msg.contains("2. /b/models"));
        assert!(msg.contains("SNAPSEEK_MODELS_DIR"));
    }

    #[test]
    fn test_incomplete_model_lists_missing() {
        let err = ModelError::IncompleteModelFiles {
            path: PathBuf::from("/m/clip"),
            missing: vec!["tokenizer.json"],
        };
        let msg = err.to_string();
        assert!(msg.contains("is missing tokenizer.json"));
        assert!(msg.contains("model.safetensors"));
    }

    #[test]
    fn test_device_error_suggests_cpu() {
        let err = ModelError::DeviceNotAvailable {
            reason: "no CUDA device".into(),
        };
        assert!(err.to_string().contains("--device cpu"));
    }
}
