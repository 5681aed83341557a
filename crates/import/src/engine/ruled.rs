use gmpricing_core::RawTable;

use super::{EngineError, ExtractionEngine};
use crate::document::{Document, DocumentKind};

const VERTICAL: &[char] = &['|', '│', '┃', '║'];

/// Lattice-style detection on the text layer: tables drawn with vertical
/// rules. Consecutive ruled lines form one table; horizontal rule lines
/// (`+---+`, `|---|`, `├───┼`) separate rows and are dropped.
pub struct RuledEngine;

impl RuledEngine {
    pub const NAME: &'static str = "ruled";
}

impl ExtractionEngine for RuledEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports(&self, doc: &Document) -> bool {
        matches!(doc.kind(), DocumentKind::Pdf | DocumentKind::Text)
    }

    fn extract(&self, doc: &Document) -> Result<Vec<RawTable>, EngineError> {
        let mut tables = Vec::new();
        for (i, text) in doc.page_texts()?.iter().enumerate() {
            let page = i + 1;
            for (index, rows) in ruled_blocks(text).into_iter().enumerate() {
                tables.push(RawTable::new(Self::NAME, page, index, rows));
            }
        }
        Ok(tables)
    }
}

fn is_rule_line(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty()
        && t.chars().any(|c| matches!(c, '-' | '=' | '─' | '━' | '═'))
        && t.chars().all(|c| {
            c.is_whitespace()
                || VERTICAL.contains(&c)
                || matches!(c, '+' | '-' | '=' | ':')
                || ('\u{2500}'..='\u{257F}').contains(&c)
        })
}

fn ruled_cells(line: &str) -> Option<Vec<String>> {
    let t = line.trim();
    if !t.contains(VERTICAL) {
        return None;
    }
    let mut cells: Vec<String> = t.split(VERTICAL).map(|c| c.trim().to_string()).collect();
    if t.starts_with(VERTICAL) {
        cells.remove(0);
    }
    if t.ends_with(VERTICAL) {
        cells.pop();
    }
    (cells.len() >= 2).then_some(cells)
}

fn ruled_blocks(text: &str) -> Vec<Vec<Vec<String>>> {
    let mut blocks = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        if is_rule_line(line) {
            continue;
        }
        match ruled_cells(line) {
            Some(cells) => current.push(cells),
            None => {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = "\
Claims data by member type (value AED)
+------+------------+-----+-----+
| Code | Member     | IP  | OP  |
+------+------------+-----+-----+
| 8a   | Employee   | 100 | 50  |
|------|------------|-----|-----|
| 8b   | Spouse     |     | 10  |
+------+------------+-----+-----+

│ 17a │ January │ 2023 │
";

    #[test]
    fn grid_rows_between_rules() {
        let blocks = ruled_blocks(GRID);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 3);
        assert_eq!(blocks[0][0], ["Code", "Member", "IP", "OP"]);
        assert_eq!(blocks[0][2], ["8b", "Spouse", "", "10"]);
        assert_eq!(blocks[1][0], ["17a", "January", "2023"]);
    }

    #[test]
    fn rule_line_detection() {
        assert!(is_rule_line("+---+----+"));
        assert!(is_rule_line("|---|:--:|"));
        assert!(is_rule_line("├────┼────┤"));
        assert!(!is_rule_line("| 8a | -5 |"));
        assert!(!is_rule_line("----- end of report -----"));
    }

    #[test]
    fn pages_and_indices_are_tagged() {
        let doc = Document::from_text("r.txt", GRID);
        let tables = RuledEngine.extract(&doc).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!((tables[1].page, tables[1].index), (1, 1));
        assert_eq!(tables[1].engine, "ruled");
    }
}
