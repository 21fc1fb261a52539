use tracing::debug;

use crate::config::ColumnsConfig;
use crate::types::{ColumnRef, DetectedColumns, Table};

/// Finds the "before" and "after" photo columns of a table.
pub struct ColumnDetector {
    before_labels: Vec<String>,
    after_labels: Vec<String>,
    marker: String,
}

impl Default for ColumnDetector {
    fn default() -> Self {
        Self::new(&ColumnsConfig::default())
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

impl ColumnDetector {
    pub fn new(config: &ColumnsConfig) -> Self {
        Self {
            before_labels: config.before_labels.iter().map(|l| normalize_header(l)).collect(),
            after_labels: config.after_labels.iter().map(|l| normalize_header(l)).collect(),
            marker: config.marker.clone(),
        }
    }

    /// Header match first; when that fails, the first two text columns
    /// (left to right) with a value containing the marker.
    pub fn detect(&self, table: &Table) -> Option<DetectedColumns> {
        if let Some(found) = self.detect_by_header(table) {
            debug!(before = %found.before.name, after = %found.after.name, "Photo columns matched by header");
            return Some(found);
        }
        let found = self.detect_by_content(table)?;
        debug!(before = %found.before.name, after = %found.after.name, "Photo columns matched by content");
        Some(found)
    }

    fn detect_by_header(&self, table: &Table) -> Option<DetectedColumns> {
        let find = |labels: &[String]| {
            // Last matching column wins, like a header -> column lookup map
            table
                .headers()
                .iter()
                .enumerate()
                .rev()
                .find(|(_, h)| labels.contains(&normalize_header(h)))
                .map(|(index, name)| ColumnRef { index, name: name.clone() })
        };
        let before = find(&self.before_labels)?;
        let after = find(&self.after_labels)?;
        Some(DetectedColumns { before, after })
    }

    fn detect_by_content(&self, table: &Table) -> Option<DetectedColumns> {
        let mut candidates = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                table
                    .column(*index)
                    .filter_map(|cell| cell.as_text())
                    .any(|text| text.contains(self.marker.as_str()))
            })
            .map(|(index, name)| ColumnRef { index, name: name.clone() });

        let before = candidates.next()?;
        let after = candidates.next()?;
        Some(DetectedColumns { before, after })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn table(headers: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table::new(headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    #[test]
    fn exact_headers_match_case_and_whitespace_insensitively() {
        let t = table(&["ID", "  Photo Before ", "PHOTO AFTER"], vec![]);
        let found = ColumnDetector::default().detect(&t).unwrap();
        assert_eq!(found.before, ColumnRef { index: 1, name: "  Photo Before ".into() });
        assert_eq!(found.after.index, 2);
    }

    #[test]
    fn localized_headers_match() {
        let t = table(&["Фото ДО", "Комментарий", "Фото ПОСЛЕ"], vec![]);
        let found = ColumnDetector::default().detect(&t).unwrap();
        assert_eq!((found.before.index, found.after.index), (0, 2));
    }

    #[test]
    fn headers_take_precedence_over_content() {
        let t = table(
            &["a", "b", "photo before", "photo after"],
            vec![vec![
                Cell::from("saved-1"),
                Cell::from("saved-2"),
                Cell::from("https://x/1"),
                Cell::from("https://x/2"),
            ]],
        );
        let found = ColumnDetector::default().detect(&t).unwrap();
        assert_eq!((found.before.index, found.after.index), (2, 3));
    }

    #[test]
    fn content_fallback_uses_left_to_right_order() {
        let t = table(
            &["n", "first", "note", "second", "third"],
            vec![
                vec![Cell::Int(1), Cell::Empty, Cell::from("plain"), Cell::from("x/saved-20240101_000000"), Cell::from("saved-")],
                vec![Cell::Int(2), Cell::from("y/saved-20240101_000000"), Cell::Empty, Cell::Empty, Cell::Empty],
            ],
        );
        let found = ColumnDetector::default().detect(&t).unwrap();
        assert_eq!(found.before.name, "first");
        assert_eq!(found.after.name, "second");
    }

    #[test]
    fn one_header_alone_falls_back_to_content() {
        let t = table(
            &["photo before", "x", "y"],
            vec![vec![Cell::from("https://a"), Cell::from("saved-a"), Cell::from("saved-b")]],
        );
        let found = ColumnDetector::default().detect(&t).unwrap();
        assert_eq!((found.before.index, found.after.index), (1, 2));
    }

    #[test]
    fn fewer_than_two_candidates_is_none() {
        let t = table(
            &["a", "b"],
            vec![vec![Cell::from("saved-20240101_000000"), Cell::Int(5)]],
        );
        assert!(ColumnDetector::default().detect(&t).is_none());
        assert!(ColumnDetector::default().detect(&table(&[], vec![])).is_none());
    }
}
