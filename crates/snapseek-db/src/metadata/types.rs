//! Entry metadata types.

use crate::vector::RowIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// EntryRecord
// ============================================================================

/// A persisted entry, as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    /// Position of the entry's vector in the index.
    pub row_index: RowIndex,

    /// Stable public identifier.
    pub external_id: String,

    /// Where the asset bytes live.
    pub stored_path: String,

    /// Caption produced by the captioning capability at ingest time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_caption: Option<String>,

    /// Caption supplied or edited by a user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_caption: Option<String>,

    /// Soft-delete flag. Inactive entries keep their row.
    pub active: bool,

    /// Ingestion timestamp (absent on rows written before it was tracked).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// ============================================================================
// NewEntry
// ============================================================================

/// An entry to insert. The store assigns the row index.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub external_id: String,
    pub stored_path: String,
    pub auto_caption: Option<String>,
    pub user_caption: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl NewEntry {
    /// Create an active entry with no captions.
    pub fn new(external_id: impl Into<String>, stored_path: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            stored_path: stored_path.into(),
            auto_caption: None,
            user_caption: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Set the automatic caption.
    pub fn with_auto_caption(mut self, caption: Option<String>) -> Self {
        self.auto_caption = caption;
        self
    }

    /// Set the user caption.
    pub fn with_user_caption(mut self, caption: Option<String>) -> Self {
        self.user_caption = caption;
        self
    }

    /// Set the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

impl From<&EntryRecord> for NewEntry {
    fn from(record: &EntryRecord) -> Self {
        Self {
            external_id: record.external_id.clone(),
            stored_path: record.stored_path.clone(),
            auto_caption: record.auto_caption.clone(),
            user_caption: record.user_caption.clone(),
            active: record.active,
            created_at: record.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_builder() {
        let entry = NewEntry::new("abc", "/data/images/abc.png")
            .with_auto_caption(Some("a cat".to_string()))
            .with_user_caption(Some("my cat".to_string()))
            .with_active(false);

        assert_eq!(entry.external_id, "abc");
        assert_eq!(entry.auto_caption.as_deref(), Some("a cat"));
        assert_eq!(entry.user_caption.as_deref(), Some("my cat"));
        assert!(!entry.active);
    }

    #[test]
    fn test_record_serialization_skips_empty_captions() {
        let record = EntryRecord {
            row_index: RowIndex(2),
            external_id: "abc".to_string(),
            stored_path: "x.png".to_string(),
            auto_caption: None,
            user_caption: None,
            active: true,
            created_at: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"rowIndex\":2"));
        assert!(!json.contains("autoCaption"));
    }
}
