//! Embedding and captioning settings.
//!
//! `snapseek-core` nests these in its YAML config under `embedding` and
//! `captioning`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ModelError, ModelResult};
use crate::model_locator::{extract_model_name, ModelLocator, CLIP_SUBDIR};
use crate::{DEFAULT_CAPTION_MODEL, DEFAULT_CLIP_MODEL_ID, DEFAULT_OLLAMA_ENDPOINT};

/// CLIP text context length.
const CLIP_CONTEXT_LEN: usize = 77;

/// Where inference runs. `gpu` means Metal or CUDA, whichever the build
/// enabled; `auto` falls back to the CPU when neither is usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Auto,
    Gpu,
    Cpu,
}

impl DevicePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Gpu => "gpu",
            Self::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    /// Accepts `auto`, `cpu` and `gpu`, with `metal`/`cuda` as aliases for `gpu`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "gpu" | "metal" | "cuda" => Ok(Self::Gpu),
            _ => Err(format!("unknown device '{}' (expected auto, gpu or cpu)", value)),
        }
    }
}

/// What a loaded CLIP checkpoint reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_id: String,
    /// Width of the shared projection space (512 for ViT-B/32).
    pub dimension: usize,
    pub max_seq_len: usize,
    /// Side length in pixels the vision tower expects.
    pub image_size: usize,
}

/// The `embedding` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingConfig {
    /// Hugging Face id; its last segment names the directory under `clip/`.
    pub model_id: String,
    pub device: DevicePreference,
    /// Model directory that bypasses the locator.
    pub local_path: Option<PathBuf>,
    /// Prompts are cut to this many tokens (never above 77).
    pub max_sequence_length: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_CLIP_MODEL_ID.to_string(),
            device: DevicePreference::Auto,
            local_path: None,
            max_sequence_length: CLIP_CONTEXT_LEN,
        }
    }
}

impl EmbeddingConfig {
    /// `local_path` if set, else the locator's answer, else where the model
    /// would live under `~/.snapseek/models`. The path may not exist.
    pub fn effective_model_path(&self) -> PathBuf {
        if let Some(path) = &self.local_path {
            return path.clone();
        }
        ModelLocator::new()
            .clip_model_path(&self.model_id)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_default()
                    .join(".snapseek/models")
                    .join(CLIP_SUBDIR)
                    .join(extract_model_name(&self.model_id))
            })
    }

    /// A prompt must keep at least one token (the end-of-text marker).
    pub fn validate(&self) -> ModelResult<()> {
        if self.max_sequence_length == 0 {
            return Err(ModelError::InvalidConfig {
                message: "embedding.maxSequenceLength must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }
}

/// The `captioning` section. Off unless `enabled: true` and the binary was
/// built with the `ollama` feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionConfig {
    pub enabled: bool,
    /// Ollama base URL.
    pub endpoint: String,
    /// A vision model pulled on that server, e.g. `llava`.
    pub model: String,
    pub prompt: String,
    pub timeout_secs: u64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_CAPTION_MODEL.to_string(),
            prompt: "Describe this image in one short sentence.".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Fields of a checkpoint's `config.json` checked before loading weights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HuggingFaceClipConfig {
    pub model_type: String,
    pub projection_dim: Option<usize>,
    pub vision_config: Option<HuggingFaceVisionConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HuggingFaceVisionConfig {
    pub image_size: Option<usize>,
    pub patch_size: Option<usize>,
}

impl HuggingFaceClipConfig {
    /// True unless a field present in the file contradicts the ViT-B/32
    /// layout candle builds.
    pub fn is_vit_base_patch32(&self) -> bool {
        let patch = self.vision_config.as_ref().and_then(|v| v.patch_size);
        (self.model_type.is_empty() || self.model_type == "clip")
            && self.projection_dim.unwrap_or(512) == 512
            && patch.unwrap_or(32) == 32
    }
}
