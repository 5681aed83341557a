use gmpricing_core::RawTable;

use super::{split_cells, EngineError, ExtractionEngine};
use crate::document::{Document, DocumentKind};
use crate::util::{is_numeric_token, is_value_token};

re!(
    re_header_phrase,
    r"(?i)month\s+ending(?:\s+date)?|value\s*\(\s*aed\s*\)|(?:over|above)\s*-?\s*65|\d{1,3}\s*(?:-|–|—|to)\s*\d{1,3}|65\s*\+|\S+"
);

/// Last-resort detector for text whose columns are separated by single
/// spaces. Every line with trailing numbers becomes `[label, numbers…]`;
/// other lines are split into header phrases. Value rows are right-aligned
/// against the most recent header so their numbers land under its columns.
pub struct HeuristicEngine;

impl HeuristicEngine {
    pub const NAME: &'static str = "heuristic";
}

impl ExtractionEngine for HeuristicEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports(&self, doc: &Document) -> bool {
        matches!(doc.kind(), DocumentKind::Pdf | DocumentKind::Text)
    }

    fn extract(&self, doc: &Document) -> Result<Vec<RawTable>, EngineError> {
        let tables = doc
            .page_texts()?
            .iter()
            .enumerate()
            .filter_map(|(i, text)| {
                let rows = heuristic_rows(text);
                (!rows.is_empty()).then(|| RawTable::new(Self::NAME, i + 1, 0, rows))
            })
            .collect();
        Ok(tables)
    }
}

fn heuristic_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut header_width = 0usize;

    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        // "Over 65" ends in a number but is a header phrase, not a value.
        let ends_in_value = re_header_phrase()
            .find_iter(line)
            .last()
            .is_some_and(|m| is_value_token(m.as_str()));
        let split = tokens.iter().rposition(|t| !is_value_token(t)).map_or(0, |i| i + 1);
        let values = &tokens[split..];
        if ends_in_value && values.iter().any(|t| is_numeric_token(t)) {
            let mut row = Vec::with_capacity(header_width.max(tokens.len()));
            row.push(tokens[..split].join(" "));
            let pad = header_width.saturating_sub(values.len() + 1);
            row.extend(std::iter::repeat(String::new()).take(pad));
            // Dash placeholders become empty cells in their own column.
            row.extend(values.iter().map(|t| if is_numeric_token(t) { t.to_string() } else { String::new() }));
            rows.push(row);
            continue;
        }

        let mut cells = split_cells(line);
        if cells.len() < 2 {
            cells = re_header_phrase()
                .find_iter(line)
                .map(|m| m.as_str().to_string())
                .collect();
        }
        if cells.len() >= 2 {
            header_width = cells.len();
        }
        rows.push(cells);
    }
    rows
}
