//! Locate rows by their permanent row code ("6a", "8d", "17m") instead of by
//! position.

use gmpricing_core::{is_placeholder, normalize_text};

use crate::util::is_numeric_token;

/// Only this many leading non-empty cells may hold a row's code.
pub const ANCHOR_CELLS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorMatch<'a> {
    pub code: &'a str,
    pub label: String,
    /// Cell holding the code; values start after it.
    pub cell_index: usize,
}

/// A text line whose leading token is a row code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch<'a> {
    pub code: &'a str,
    /// Everything after the code: label words and values.
    pub rest: String,
}

const SEPARATORS: &[char] = &['.', ':', '-', ')', '/'];

/// Find the row code in the first [`ANCHOR_CELLS`] non-empty cells of a row.
///
/// A cell that is exactly a code (trailing separators allowed, `"6a -"`)
/// takes the next text cell as its label, skipping dash placeholders; a
/// number there means the row has no label. A cell that starts with a code
/// and a separator (`"6a male"`, `"6a. Male"`) is split and the remainder
/// becomes the label. Codes are tried longest first.
pub fn match_row_code<'a>(cells: &[String], codes: &[&'a str]) -> Option<AnchorMatch<'a>> {
    let mut ordered: Vec<&'a str> = codes.to_vec();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut non_empty = cells
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.trim().is_empty());

    for (index, cell) in non_empty.by_ref().take(ANCHOR_CELLS) {
        let norm = normalize_text(cell);
        let token = norm.trim_end_matches(|c: char| c == ' ' || SEPARATORS.contains(&c));

        if let Some(code) = ordered.iter().find(|c| **c == token) {
            let label = cells[index + 1..]
                .iter()
                .map(|c| c.trim())
                .find(|c| !c.is_empty() && !is_placeholder(c))
                .filter(|c| !is_numeric_token(c))
                .unwrap_or_default()
                .to_string();
            return Some(AnchorMatch { code, label, cell_index: index });
        }

        if let Some(code) = ordered.iter().find(|c| has_code_prefix(&norm, c)) {
            return Some(AnchorMatch { code, label: strip_code(cell, code), cell_index: index });
        }
    }
    None
}

/// [`match_row_code`] over a free text line, treating each whitespace
/// separated token as a cell.
pub fn match_line_code<'a>(line: &str, codes: &[&'a str]) -> Option<LineMatch<'a>> {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let m = match_row_code(&tokens, codes)?;

    let head = strip_code(&tokens[m.cell_index], m.code);
    // A dash right after the code separates it from the label.
    let after = tokens[m.cell_index + 1..]
        .iter()
        .map(String::as_str)
        .skip_while(|t| head.is_empty() && is_placeholder(t));
    let rest = std::iter::once(head.as_str())
        .chain(after)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Some(LineMatch { code: m.code, rest })
}

fn has_code_prefix(norm: &str, code: &str) -> bool {
    norm.strip_prefix(code)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == ' ' || SEPARATORS.contains(&c))
}

/// Remove a leading code (case-insensitive) and the separators after it.
fn strip_code(cell: &str, code: &str) -> String {
    let trimmed = cell.trim_start();
    let rest = match trimmed.get(..code.len()) {
        Some(head) if head.eq_ignore_ascii_case(code) => &trimmed[code.len()..],
        _ => return String::new(),
    };
    rest.trim_start_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c) || c == '–' || c == '—')
        .trim_end()
        .to_string()
}
