//! Common types for snapseek-core: results of the engine's operations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use snapseek_db::metadata::EntryRecord as Entry;
pub use snapseek_db::vector::RowIndex;

/// The caption used for display and scoring: user caption if non-empty,
/// else auto caption if non-empty, else none.
pub fn effective_caption(entry: &Entry) -> Option<&str> {
    non_blank(entry.user_caption.as_deref()).or_else(|| non_blank(entry.auto_caption.as_deref()))
}

pub(crate) fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

// ============================================================================
// Query results
// ============================================================================

/// One ranked query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResult {
    pub external_id: String,
    pub stored_path: String,
    pub row_index: RowIndex,
    /// Ranking score: weighted visual and caption similarity.
    pub combined_score: f32,
    /// Raw inner product between the query and the stored vector.
    pub visual_score: f32,
    /// Similarity between the query text and the effective caption (0 without caption).
    pub text_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_caption: Option<String>,
    /// Set when nothing cleared the threshold and this is the best remaining candidate.
    #[serde(default)]
    pub low_confidence: bool,
}

// ============================================================================
// Ingest results
// ============================================================================

/// Outcome of ingesting one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    pub external_id: String,
    pub stored_path: String,
    pub row_index: RowIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_caption: Option<String>,
}

/// A file skipped during folder ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSkip {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of ingesting a folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderIngestReport {
    /// Image files found (allowed extension).
    pub discovered: usize,
    pub ingested: Vec<IngestResult>,
    pub skipped: Vec<IngestSkip>,
}

// ============================================================================
// Health / rebuild
// ============================================================================

/// Row counts of both stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub vectors: usize,
    pub entries: usize,
    pub active: usize,
    pub dimension: usize,
    pub data_dir: PathBuf,
}

impl HealthReport {
    /// Whether the vector index and the metadata store agree on row count.
    pub fn is_aligned(&self) -> bool {
        self.vectors == self.entries
    }
}

/// Outcome of an offline rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildReport {
    /// Rows before the rebuild.
    pub rows_before: usize,
    /// Rows after the rebuild (the active entries).
    pub rows_after: usize,
}

impl RebuildReport {
    pub fn removed(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user: Option<&str>, auto: Option<&str>) -> Entry {
        Entry {
            row_index: RowIndex::new(0),
            external_id: "a".into(),
            stored_path: "images/a.jpg".into(),
            auto_caption: auto.map(String::from),
            user_caption: user.map(String::from),
            active: true,
            created_at: None,
        }
    }

    #[test]
    fn test_effective_caption_precedence() {
        assert_eq!(
            effective_caption(&entry(Some("mine"), Some("auto"))),
            Some("mine")
        );
        assert_eq!(effective_caption(&entry(None, Some("auto"))), Some("auto"));
        assert_eq!(effective_caption(&entry(Some("  "), Some("auto"))), Some("auto"));
        assert_eq!(effective_caption(&entry(None, None)), None);
    }

    #[test]
    fn test_scored_result_json_shape() {
        let result = ScoredResult {
            external_id: "id".into(),
            stored_path: "p".into(),
            row_index: RowIndex::new(2),
            combined_score: 0.5,
            visual_score: 0.5,
            text_score: 0.0,
            effective_caption: None,
            low_confidence: true,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["externalId"], "id");
        assert_eq!(json["rowIndex"], 2);
        assert_eq!(json["lowConfidence"], true);
        assert!(json.get("effectiveCaption").is_none());
    }
}
