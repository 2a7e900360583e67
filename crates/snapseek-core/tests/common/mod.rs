//! Shared test utilities for snapseek-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use snapseek_core::{Capabilities, GlobalConfig, SnapEngine};
use snapseek_model::{Captioner, ImageEmbedder, ModelError, ModelResult, TextEmbedder};
use tempfile::TempDir;

pub const VOCAB: &[&str] = &["cat", "dog", "car", "beach", "red", "snow", "mountain"];

/// Bag-of-words embedder over [`VOCAB`] plus one catch-all axis.
///
/// Image bytes are read as UTF-8 and embedded like text.
#[derive(Debug)]
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn embed(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; VOCAB.len() + 1];
        let mut matched = false;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            if let Some(pos) = VOCAB.iter().position(|v| *v == word.to_lowercase()) {
                v[pos] += 1.0;
                matched = true;
            }
        }
        if !matched {
            v[VOCAB.len()] = 1.0;
        }
        v
    }
}

impl TextEmbedder for KeywordEmbedder {
    fn embed_texts(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        VOCAB.len() + 1
    }
}

impl ImageEmbedder for KeywordEmbedder {
    fn embed_image(&self, bytes: &[u8]) -> ModelResult<Vec<f32>> {
        let text =
            std::str::from_utf8(bytes).map_err(|e| ModelError::image_decode(e.to_string()))?;
        Ok(Self::embed(text))
    }

    fn dimension(&self) -> usize {
        VOCAB.len() + 1
    }
}

/// Captioner that always returns the same text, or always fails.
#[derive(Debug)]
pub struct FixedCaptioner(pub Option<String>);

impl Captioner for FixedCaptioner {
    fn caption(&self, _bytes: &[u8]) -> ModelResult<String> {
        self.0
            .clone()
            .ok_or_else(|| ModelError::caption_failed("fixed", "captioner offline"))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Config rooted at `<temp>/data` with the test dimension.
pub fn test_config(temp: &TempDir) -> GlobalConfig {
    let mut config = GlobalConfig::default().with_data_dir(temp.path().join("data"));
    config.index.dimension = VOCAB.len() + 1;
    config
}

pub fn test_capabilities() -> Capabilities {
    Capabilities::new(Arc::new(KeywordEmbedder), Arc::new(KeywordEmbedder))
        .expect("embedders agree on dimension")
}

pub fn open_engine(config: GlobalConfig) -> SnapEngine {
    SnapEngine::new(config, test_capabilities()).expect("engine should open")
}
