use gmpricing_core::RawTable;

use super::{split_cells, EngineError, ExtractionEngine};
use crate::document::{Document, DocumentKind};

/// Reads the document's own text layer, one table per page, splitting each
/// line into cells on wide gaps, tabs and pipes.
pub struct TextLayerEngine;

impl TextLayerEngine {
    pub const NAME: &'static str = "text-layer";
}

impl ExtractionEngine for TextLayerEngine {
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
                let rows: Vec<Vec<String>> = text
                    .lines()
                    .map(split_cells)
                    .filter(|cells| !cells.is_empty())
                    .collect();
                (!rows.is_empty()).then(|| RawTable::new(Self::NAME, i + 1, 0, rows))
            })
            .collect();
        Ok(tables)
    }
}
