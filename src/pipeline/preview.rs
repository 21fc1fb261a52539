use askama::Template;
use serde::Serialize;

use crate::error::Result;
use crate::templates::PreviewTemplate;

pub const PREVIEW_TABLE_CLASSES: &str = "table table-striped table-bordered table-sm";

/// Display-ready slice of the processed table, every cell pre-formatted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Preview {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as an HTML table without an index column; cell text is escaped
    pub fn to_html(&self) -> Result<String> {
        let template = PreviewTemplate {
            classes: PREVIEW_TABLE_CLASSES,
            headers: &self.headers,
            rows: &self.rows,
        };
        Ok(template.render()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headers_and_escaped_cells() {
        let preview = Preview {
            headers: vec!["Фото ДО".into(), "Интервал_мин".into()],
            rows: vec![vec!["a=1&b=<2>".into(), "45 мин".into()]],
        };
        let html = preview.to_html().unwrap();
        assert!(html.starts_with("<table class=\"table table-striped table-bordered table-sm\">"));
        assert!(html.contains("<th>Фото ДО</th><th>Интервал_мин</th>"));
        assert!(html.contains("<td>a=1&amp;b=&lt;2&gt;</td><td>45 мин</td>"));
        assert_eq!(html.matches("<tr>").count(), 2);
    }

    #[test]
    fn empty_preview_still_has_header_row() {
        let preview = Preview { headers: vec!["a".into()], rows: vec![] };
        assert!(preview.is_empty());
        let html = preview.to_html().unwrap();
        assert!(html.contains("<th>a</th>"));
        assert!(!html.contains("<td>"));
    }
}
