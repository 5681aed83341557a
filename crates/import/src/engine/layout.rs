use std::process::Command;

use gmpricing_core::RawTable;

use super::{split_cells, EngineError, ExtractionEngine};
use crate::document::{Document, DocumentKind};

/// Columns closer than this many blank character positions are merged.
const MIN_GAP: usize = 2;

/// Stream-style detection on `pdftotext -layout` output: within a block of
/// tabular lines, column boundaries are the character positions that are
/// blank on every line.
pub struct LayoutEngine {
    enabled: bool,
}

impl LayoutEngine {
    pub const NAME: &'static str = "layout";

    /// `enabled` comes from the capability probe for `pdftotext`.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl ExtractionEngine for LayoutEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports(&self, doc: &Document) -> bool {
        self.enabled && doc.kind() == DocumentKind::Pdf
    }

    fn extract(&self, doc: &Document) -> Result<Vec<RawTable>, EngineError> {
        let text = run_pdftotext(doc)?;
        Ok(layout_tables(&text))
    }
}

fn run_pdftotext(doc: &Document) -> Result<String, EngineError> {
    let file = doc.disk_path()?;
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(file.path())
        .arg("-")
        .output()
        .map_err(|e| EngineError::Tool { tool: "pdftotext", message: e.to_string() })?;

    if !output.status.success() {
        return Err(EngineError::Tool {
            tool: "pdftotext",
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Tables from layout text; pages are separated by form feeds.
pub(crate) fn layout_tables(text: &str) -> Vec<RawTable> {
    let mut tables = Vec::new();
    for (i, page) in text.split('\u{c}').enumerate() {
        for (index, rows) in page_blocks(page).into_iter().enumerate() {
            tables.push(RawTable::new(LayoutEngine::NAME, i + 1, index, rows));
        }
    }
    tables
}

/// Runs of tabular lines (two or more wide-gap cells). Blank lines do not
/// end a block; a line of running text does.
fn page_blocks(page: &str) -> Vec<Vec<Vec<String>>> {
    let mut blocks = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    let mut flush = |block: &mut Vec<&str>| {
        if block.len() >= 2 {
            let spans = column_spans(block);
            blocks.push(block.iter().map(|l| cut(l, &spans)).collect());
        }
        block.clear();
    };

    for line in page.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if split_cells(line).len() >= 2 {
            block.push(line);
        } else {
            flush(&mut block);
        }
    }
    flush(&mut block);
    blocks
}

/// Half-open character spans of the columns shared by `lines`.
fn column_spans(lines: &[&str]) -> Vec<(usize, usize)> {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let mut occupied = vec![false; width];
    for line in lines {
        for (i, c) in line.chars().enumerate() {
            if !c.is_whitespace() {
                occupied[i] = true;
            }
        }
    }

    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut blank_run = 0;
    for (i, &filled) in occupied.iter().enumerate() {
        if filled {
            if start.is_none() {
                start = Some(i);
            }
            blank_run = 0;
        } else if let Some(s) = start {
            blank_run += 1;
            if blank_run >= MIN_GAP {
                spans.push((s, i + 1 - blank_run));
                start = None;
            }
        }
    }
    if let Some(s) = start {
        spans.push((s, width - blank_run));
    }
    spans
}

fn cut(line: &str, spans: &[(usize, usize)]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    spans
        .iter()
        .map(|&(s, e)| {
            let s = s.min(chars.len());
            let e = e.min(chars.len());
            chars[s..e].iter().collect::<String>().trim().to_string()
        })
        .collect()
}
