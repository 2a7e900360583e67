//! Deterministic capability doubles for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use snapseek_model::{Captioner, ImageEmbedder, ModelError, ModelResult, TextEmbedder};

/// Bag-of-words embedder: one axis per vocabulary word plus a catch-all axis.
///
/// Image bytes are read as UTF-8 text and embedded the same way, so an
/// "image" `b"red car"` lands exactly where the text "red car" does.
#[derive(Debug)]
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
    pub text_calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_string()).collect(),
            text_calls: AtomicUsize::new(0),
        }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.vocabulary.len() + 1];
        let mut matched = false;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            if let Some(pos) = self.vocabulary.iter().position(|v| *v == word) {
                v[pos] += 1.0;
                matched = true;
            }
        }
        if !matched {
            v[self.vocabulary.len()] = 1.0;
        }
        v
    }
}

impl TextEmbedder for KeywordEmbedder {
    fn embed_texts(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.vocabulary.len() + 1
    }
}

impl ImageEmbedder for KeywordEmbedder {
    fn embed_image(&self, bytes: &[u8]) -> ModelResult<Vec<f32>> {
        let text = std::str::from_utf8(bytes).map_err(|e| ModelError::image_decode(e.to_string()))?;
        Ok(self.embed(text))
    }

    fn dimension(&self) -> usize {
        self.vocabulary.len() + 1
    }
}

/// Captioner that always answers with the same text, or always fails.
#[derive(Debug)]
pub struct FixedCaptioner(pub Option<String>);

impl Captioner for FixedCaptioner {
    fn caption(&self, _bytes: &[u8]) -> ModelResult<String> {
        self.0
            .clone()
            .ok_or_else(|| ModelError::caption_failed("fixed", "no caption configured"))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
