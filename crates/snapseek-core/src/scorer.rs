//! Relevance scoring of search candidates.
//!
//! A candidate's combined score mixes its visual score (query vs stored
//! vector) with the similarity between the query text and its caption. The
//! caption's share depends on where the caption came from:
//!
//! | Caption          | Caption weight | Visual weight |
//! |------------------|----------------|---------------|
//! | user-provided    | 0.35           | 0.65          |
//! | automatic only   | 0.20           | 0.80          |
//! | none             | 0.0            | 1.0           |
//!
//! Results are then cut at an adaptive threshold relative to the best score,
//! never below an absolute floor. If nothing clears it, the best candidate is
//! still returned, flagged low-confidence.

use std::collections::HashMap;

use snapseek_db::vector::{dot, l2_normalize};
use snapseek_model::TextEmbedder;
use tracing::debug;

use crate::config::ScoringConfig;
use crate::constants::{
    DEFAULT_VISUAL_WEIGHT, LENIENT_THRESHOLD_FACTOR, MIN_SCORE_FLOOR, STRICT_FACTOR_CUTOFF,
    STRICT_THRESHOLD_FACTOR,
};
use crate::errors::{SnapError, SnapResult};
use crate::model_adapter::from_model_error;
use crate::types::{effective_caption, non_blank, Entry, ScoredResult};

// ============================================================================
// Scoring primitives
// ============================================================================

/// `visual_weight * visual + (1 - visual_weight) * text`.
pub fn combine(visual_score: f32, text_score: f32, visual_weight: f32) -> f32 {
    visual_weight * visual_score + (1.0 - visual_weight) * text_score
}

/// [`combine`] with the default visual weight (0.8).
pub fn combine_default(visual_score: f32, text_score: f32) -> f32 {
    combine(visual_score, text_score, DEFAULT_VISUAL_WEIGHT)
}

/// Adaptive acceptance threshold with the default floor (0.25).
pub fn dynamic_minimum_score(scores: &[f32]) -> f32 {
    dynamic_minimum_score_with_floor(scores, MIN_SCORE_FLOOR)
}

/// `max(floor, top * factor)` where `top` is the best score (0 if none) and
/// the factor is 0.6 for `top >= 0.6`, else 0.7.
pub fn dynamic_minimum_score_with_floor(scores: &[f32], floor: f32) -> f32 {
    let top = scores
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.max(s))))
        .unwrap_or(0.0);

    let factor = if top >= STRICT_FACTOR_CUTOFF {
        STRICT_THRESHOLD_FACTOR
    } else {
        LENIENT_THRESHOLD_FACTOR
    };
    floor.max(top * factor)
}

/// Cosine similarity between a query embedding and a caption embedding.
pub fn text_score(query_embedding: &[f32], caption_embedding: &[f32]) -> f32 {
    dot(&l2_normalize(query_embedding), &l2_normalize(caption_embedding))
}

// ============================================================================
// RelevanceScorer
// ============================================================================

/// Ranks and filters search candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceScorer {
    config: ScoringConfig,
}

impl RelevanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Text share of the combined score for this entry.
    pub fn caption_weight(&self, entry: &Entry) -> f32 {
        if non_blank(entry.user_caption.as_deref()).is_some() {
            self.config.user_caption_weight
        } else if non_blank(entry.auto_caption.as_deref()).is_some() {
            self.config.auto_caption_weight
        } else {
            0.0
        }
    }

    /// Acceptance threshold for a set of combined scores.
    pub fn threshold(&self, scores: &[f32]) -> f32 {
        dynamic_minimum_score_with_floor(scores, self.config.min_score_floor)
    }

    /// Whether a single score clears the absolute floor.
    pub fn clears_floor(&self, score: f32) -> bool {
        score >= self.config.min_score_floor
    }

    /// Score, filter and rank candidates from a vector search.
    ///
    /// Inactive entries are dropped first. Captions are embedded in one batch.
    /// The result holds at most `top_k` items and, when any active candidate
    /// exists, at least one.
    pub fn rank(
        &self,
        query_text: &str,
        query_embedding: &[f32],
        candidates: Vec<(Entry, f32)>,
        embedder: &dyn TextEmbedder,
        top_k: usize,
    ) -> SnapResult<Vec<ScoredResult>> {
        let active: Vec<(Entry, f32)> = candidates
            .into_iter()
            .filter(|(entry, _)| entry.active)
            .collect();
        if active.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }

        let caption_scores = self.caption_scores(query_embedding, &active, embedder)?;

        let mut scored: Vec<ScoredResult> = active
            .into_iter()
            .map(|(entry, visual)| {
                let caption = effective_caption(&entry).map(String::from);
                let text = caption
                    .as_deref()
                    .and_then(|c| caption_scores.get(c).copied())
                    .unwrap_or(0.0);
                let weight = self.caption_weight(&entry);
                ScoredResult {
                    external_id: entry.external_id,
                    stored_path: entry.stored_path,
                    row_index: entry.row_index,
                    combined_score: combine(visual, text, 1.0 - weight),
                    visual_score: visual,
                    text_score: text,
                    effective_caption: caption,
                    low_confidence: false,
                }
            })
            .collect();

        sort_by_score(&mut scored);

        let scores: Vec<f32> = scored.iter().map(|r| r.combined_score).collect();
        let threshold = self.threshold(&scores);
        debug!(
            "Scored {} candidates for {:?}: top={:.4}, threshold={:.4}",
            scored.len(),
            query_text,
            scores.first().copied().unwrap_or(0.0),
            threshold
        );

        let mut kept: Vec<ScoredResult> = scored
            .iter()
            .filter(|r| r.combined_score >= threshold)
            .cloned()
            .collect();

        if kept.is_empty() {
            if let Some(mut best) = scored.into_iter().next() {
                debug!(
                    "No candidate reached {:.4}; returning best ({:.4}) as low confidence",
                    threshold, best.combined_score
                );
                best.low_confidence = true;
                kept.push(best);
            }
        }

        kept.truncate(top_k);
        Ok(kept)
    }

    /// Text score per distinct caption.
    fn caption_scores(
        &self,
        query_embedding: &[f32],
        candidates: &[(Entry, f32)],
        embedder: &dyn TextEmbedder,
    ) -> SnapResult<HashMap<String, f32>> {
        let mut captions: Vec<&str> = candidates
            .iter()
            .filter_map(|(entry, _)| effective_caption(entry))
            .collect();
        captions.sort_unstable();
        captions.dedup();

        if captions.is_empty() {
            return Ok(HashMap::new());
        }

        let embeddings = embedder.embed_texts(&captions).map_err(from_model_error)?;
        if embeddings.len() != captions.len() {
            return Err(SnapError::capability(
                "text-embedder",
                format!(
                    "returned {} embeddings for {} captions",
                    embeddings.len(),
                    captions.len()
                ),
            ));
        }

        Ok(captions
            .into_iter()
            .zip(embeddings)
            .map(|(caption, embedding)| {
                (caption.to_string(), text_score(query_embedding, &embedding))
            })
            .collect())
    }
}

/// Descending combined score; row index breaks ties.
fn sort_by_score(results: &mut [ScoredResult]) {
    results.sort_by(|a, b| {
        b.combined_score
            .total_cmp(&a.combined_score)
            .then_with(|| a.row_index.cmp(&b.row_index))
    });
}
