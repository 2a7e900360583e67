//! Candle-based CLIP model implementation.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::{ClipConfig, ClipModel};
use image::imageops::FilterType;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::config::{DevicePreference, EmbeddingConfig, HuggingFaceClipConfig, ModelInfo};
use crate::error::{ModelError, ModelResult};
use crate::model_locator::ModelLocator;
use crate::{ImageEmbedder, TextEmbedder};

/// End-of-text token; CLIP pads with it and pools on its first occurrence.
const EOT_TOKEN: &str = "<|endoftext|>";

// ============================================================================
// CandleClipModel
// ============================================================================

/// CLIP ViT-B/32 running in-process on Candle.
///
/// One instance serves both the text and the image tower. Outputs are
/// L2-normalized projection features.
pub struct CandleClipModel {
    model_info: ModelInfo,
    model: ClipModel,
    tokenizer: Tokenizer,
    eot_id: u32,
    device: Device,
}

impl std::fmt::Debug for CandleClipModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleClipModel")
            .field("model_id", &self.model_info.model_id)
            .field("dimension", &self.model_info.dimension)
            .finish()
    }
}

impl CandleClipModel {
    /// Load a CLIP checkpoint.
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        config.validate()?;
        let model_path = config.effective_model_path();

        if !model_path.exists() {
            return Err(ModelError::ModelNotFound {
                model_id: config.model_id.clone(),
                path: model_path,
            });
        }
        ModelLocator::new().validate_model_dir(&model_path)?;
        Self::check_hf_config(&model_path)?;

        let clip_config = ClipConfig::vit_base_patch32();
        let dimension = clip_config.text_config.projection_dim;
        let max_seq_len = config
            .max_sequence_length
            .min(clip_config.text_config.max_position_embeddings);

        info!(
            "Loading CLIP model '{}' from {:?} (dim={}, image_size={})",
            config.model_id, model_path, dimension, clip_config.image_size
        );

        let (tokenizer, eot_id) = Self::load_tokenizer(&model_path)?;
        let device = Self::select_device(config.device)?;
        let model = Self::load_model(&model_path, &clip_config, &device)?;

        let model_info = ModelInfo {
            model_id: config.model_id.clone(),
            dimension,
            max_seq_len,
            image_size: clip_config.image_size,
        };

        Ok(Self {
            model_info,
            model,
            tokenizer,
            eot_id,
            device,
        })
    }

    /// Information about the loaded checkpoint.
    pub fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }

    fn check_hf_config(model_path: &Path) -> ModelResult<()> {
        let config_path = model_path.join("config.json");
        if !config_path.exists() {
            debug!("No config.json at {:?}, assuming ViT-B/32", model_path);
            return Ok(());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let hf: HuggingFaceClipConfig = serde_json::from_str(&content)?;
        if !hf.is_vit_base_patch32() {
            return Err(ModelError::InvalidConfig {
                message: format!(
                    "model_type={:?}, projection_dim={:?} in {}",
                    hf.model_type,
                    hf.projection_dim,
                    config_path.display()
                ),
            });
        }
        Ok(())
    }

    fn load_tokenizer(model_path: &Path) -> ModelResult<(Tokenizer, u32)> {
        let tokenizer_path = model_path.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelError::model_load(model_path.display().to_string(), e.to_string()))?;

        let eot_id = tokenizer.token_to_id(EOT_TOKEN).ok_or_else(|| {
            ModelError::model_load(
                model_path.display().to_string(),
                format!("tokenizer has no {} token", EOT_TOKEN),
            )
        })?;

        Ok((tokenizer, eot_id))
    }

    fn select_device(pref: DevicePreference) -> ModelResult<Device> {
        match pref {
            DevicePreference::Auto => {
                if let Some(device) = Self::try_gpu() {
                    Ok(device)
                } else {
                    info!("Using CPU");
                    Ok(Device::Cpu)
                }
            }
            DevicePreference::Gpu => Self::try_gpu().ok_or_else(|| ModelError::DeviceNotAvailable {
                reason: Self::gpu_not_available_reason(),
            }),
            DevicePreference::Cpu => Ok(Device::Cpu),
        }
    }

    fn try_gpu() -> Option<Device> {
        #[cfg(feature = "metal")]
        {
            match Device::new_metal(0) {
                Ok(device) => {
                    info!("Using Metal GPU");
                    return Some(device);
                }
                Err(e) => debug!("Metal not available: {}", e),
            }
        }

        #[cfg(feature = "cuda")]
        {
            match Device::new_cuda(0) {
                Ok(device) => {
                    info!("Using CUDA GPU");
                    return Some(device);
                }
                Err(e) => debug!("CUDA not available: {}", e),
            }
        }

        None
    }

    fn gpu_not_available_reason() -> String {
        if cfg!(any(feature = "metal", feature = "cuda")) {
            "no usable GPU device was found".to_string()
        } else {
            "snapseek was built without GPU support. \
             Rebuild with --features metal (macOS) or --features cuda (NVIDIA GPU)"
                .to_string()
        }
    }

    fn load_model(
        model_path: &Path,
        clip_config: &ClipConfig,
        device: &Device,
    ) -> ModelResult<ClipModel> {
        let weights_path = model_path.join("model.safetensors");

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device).map_err(
                |e| ModelError::model_load(model_path.display().to_string(), e.to_string()),
            )?
        };

        ClipModel::new(vb, clip_config)
            .map_err(|e| ModelError::model_load(model_path.display().to_string(), e.to_string()))
    }

    /// Token ids padded (or cut) to exactly `max_seq_len`, ending in EOT.
    fn encode_padded(&self, text: &str) -> ModelResult<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ModelError::tokenization(e.to_string()))?;

        let max_len = self.model_info.max_seq_len;
        let mut ids = encoding.get_ids().to_vec();
        if ids.len() > max_len {
            ids.truncate(max_len);
            ids[max_len - 1] = self.eot_id;
        }
        ids.resize(max_len, self.eot_id);
        Ok(ids)
    }

    fn candle_err(&self, e: candle_core::Error) -> ModelError {
        ModelError::embedding_failed(&self.model_info.model_id, e.to_string())
    }

    fn features_to_rows(&self, features: &Tensor) -> ModelResult<Vec<Vec<f32>>> {
        let rows = features
            .to_dtype(DType::F32)
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(|e| self.candle_err(e))?;
        Ok(rows.into_iter().map(|r| l2_normalize(&r)).collect())
    }
}

impl TextEmbedder for CandleClipModel {
    fn embed_texts(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let max_len = self.model_info.max_seq_len;
        let mut ids = Vec::with_capacity(texts.len() * max_len);
        for text in texts {
            ids.extend(self.encode_padded(text)?);
        }

        let input_ids = Tensor::from_vec(ids, (texts.len(), max_len), &self.device)
            .map_err(|e| self.candle_err(e))?;
        let features = self
            .model
            .get_text_features(&input_ids)
            .map_err(|e| self.candle_err(e))?;

        self.features_to_rows(&features)
    }

    fn dimension(&self) -> usize {
        self.model_info.dimension
    }
}

impl ImageEmbedder for CandleClipModel {
    fn embed_image(&self, bytes: &[u8]) -> ModelResult<Vec<f32>> {
        let pixels = preprocess_image(bytes, self.model_info.image_size)?;
        let batch = pixels
            .to_device(&self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| self.candle_err(e))?;

        let features = self
            .model
            .get_image_features(&batch)
            .map_err(|e| self.candle_err(e))?;

        self.features_to_rows(&features)?
            .pop()
            .ok_or_else(|| ModelError::embedding_failed(&self.model_info.model_id, "no image features"))
    }

    fn dimension(&self) -> usize {
        self.model_info.dimension
    }
}

// ============================================================================
// Preprocessing
// ============================================================================

/// Per-channel RGB statistics of the CLIP training set.
const CLIP_IMAGE_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const CLIP_IMAGE_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Decode image bytes into a `(3, size, size)` tensor, each channel scaled to
/// `[0, 1]` then standardized with the CLIP mean and std.
pub fn preprocess_image(bytes: &[u8], size: usize) -> ModelResult<Tensor> {
    let img = image::load_from_memory(bytes).map_err(|e| ModelError::image_decode(e.to_string()))?;
    let img = img.resize_to_fill(size as u32, size as u32, FilterType::Triangle);
    let raw = img.to_rgb8().into_raw();

    let device = Device::Cpu;
    let mean = Tensor::new(&CLIP_IMAGE_MEAN, &device).and_then(|t| t.reshape((3, 1, 1)));
    let std = Tensor::new(&CLIP_IMAGE_STD, &device).and_then(|t| t.reshape((3, 1, 1)));

    Tensor::from_vec(raw, (size, size, 3), &device)
        .and_then(|t| t.permute((2, 0, 1)))
        .and_then(|t| t.to_dtype(DType::F32))
        .and_then(|t| t.affine(1.0 / 255.0, 0.0))
        .and_then(|t| t.broadcast_sub(&mean?))
        .and_then(|t| t.broadcast_div(&std?))
        .map_err(|e| ModelError::image_decode(e.to_string()))
}

fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-12);
    v.iter().map(|x| x / norm).collect()
}
