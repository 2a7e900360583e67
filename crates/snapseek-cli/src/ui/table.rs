//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `snapseek list` | `render_entries_table()` |
//! | `snapseek query` | `render_results_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use snapseek_core::{effective_caption, Entry, ScoredResult};

use super::format::{format_relative_time, truncate_str};

/// Width kept for the caption column.
const CAPTION_WIDTH: usize = 40;

/// Render the entry table for `snapseek list`.
///
/// # Example Output
///
/// ```text
/// ROW  ID        STATUS    ADDED     CAPTION
///   0  0b7c9d2e  active    2h ago    our dog at the beach
///   1  5a11e0f3  inactive  1d ago    -
/// ```
pub fn render_entries_table(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("ROW").set_alignment(CellAlignment::Right),
        Cell::new("ID"),
        Cell::new("STATUS"),
        Cell::new("ADDED"),
        Cell::new("CAPTION"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(4)), // ROW
        ColumnConstraint::LowerBoundary(Width::Fixed(8)), // ID
        ColumnConstraint::LowerBoundary(Width::Fixed(8)), // STATUS
        ColumnConstraint::LowerBoundary(Width::Fixed(8)), // ADDED
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // CAPTION
    ]);

    for entry in entries {
        let id: String = entry.external_id.chars().take(8).collect();
        let status = if entry.active { "active" } else { "inactive" };
        let added = entry
            .created_at
            .map(format_relative_time)
            .unwrap_or_else(|| "-".to_string());
        let caption = effective_caption(entry)
            .map(|c| truncate_str(c, CAPTION_WIDTH))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(entry.row_index).set_alignment(CellAlignment::Right),
            Cell::new(id),
            Cell::new(status),
            Cell::new(added),
            Cell::new(caption),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render ranked results for `snapseek query`.
///
/// # Example Output
///
/// ```text
///  #  SCORE  VISUAL  TEXT   PATH                         CAPTION
///  1  0.712  0.688   0.756  ~/.snapseek/data/images/...  our dog at the beach
/// ```
pub fn render_results_table(results: &[ScoredResult], path_width: usize) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("SCORE").set_alignment(CellAlignment::Right),
        Cell::new("VISUAL").set_alignment(CellAlignment::Right),
        Cell::new("TEXT").set_alignment(CellAlignment::Right),
        Cell::new("PATH"),
        Cell::new("CAPTION"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(2)), // #
        ColumnConstraint::LowerBoundary(Width::Fixed(6)), // SCORE
        ColumnConstraint::LowerBoundary(Width::Fixed(6)), // VISUAL
        ColumnConstraint::LowerBoundary(Width::Fixed(6)), // TEXT
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // PATH
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // CAPTION
    ]);

    for (i, result) in results.iter().enumerate() {
        let caption = result
            .effective_caption
            .as_deref()
            .map(|c| truncate_str(c, CAPTION_WIDTH))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", result.combined_score)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", result.visual_score)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", result.text_score)).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(&result.stored_path, path_width)),
            Cell::new(caption),
        ]);
    }

    table.trim_fmt().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapseek_core::RowIndex;

    fn entry(row: u64, active: bool, caption: Option<&str>) -> Entry {
        Entry {
            row_index: RowIndex::new(row),
            external_id: format!("{:08}-aaaa-bbbb", row),
            stored_path: format!("images/{}.jpg", row),
            auto_caption: None,
            user_caption: caption.map(String::from),
            active,
            created_at: None,
        }
    }

    #[test]
    fn test_render_entries_table() {
        let output = render_entries_table(&[
            entry(0, true, Some("our dog at the beach")),
            entry(1, false, None),
        ]);
        assert!(output.contains("ROW"));
        assert!(output.contains("CAPTION"));
        assert!(output.contains("our dog at the beach"));
        assert!(output.contains("inactive"));
        assert!(output.contains("00000001"));
        assert!(!output.contains("aaaa"));
    }

    #[test]
    fn test_render_results_table() {
        let results = vec![ScoredResult {
            external_id: "id".into(),
            stored_path: "images/a.jpg".into(),
            row_index: RowIndex::new(0),
            combined_score: 0.7123,
            visual_score: 0.6881,
            text_score: 0.7564,
            effective_caption: Some("a red car".into()),
            low_confidence: false,
        }];
        let output = render_results_table(&results, 40);
        assert!(output.contains("0.712"));
        assert!(output.contains("images/a.jpg"));
        assert!(output.contains("a red car"));
    }

    #[test]
    fn test_empty_tables() {
        assert!(render_entries_table(&[]).is_empty());
        assert!(render_results_table(&[], 40).is_empty());
    }
}
