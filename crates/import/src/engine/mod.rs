//! Independent table-extraction engines.
//!
//! Each engine turns a [`Document`] into zero or more [`RawTable`]s with its
//! own detection heuristics. Engines know nothing about sections; the
//! orchestrator decides what their tables are worth.

use gmpricing_core::RawTable;
use gmpricing_ocr::Capabilities;
use thiserror::Error;

use crate::document::{Document, DocumentError};

pub mod heuristic;
pub mod layout;
pub mod ruled;
pub mod text_layer;
pub mod xml;

pub use heuristic::HeuristicEngine;
pub use layout::LayoutEngine;
pub use ruled::RuledEngine;
pub use text_layer::TextLayerEngine;
pub use xml::XmlEngine;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("{tool} failed: {message}")]
    Tool { tool: &'static str, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait ExtractionEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this engine can read `doc` at all. Unsupported documents are
    /// skipped without calling [`extract`](Self::extract).
    fn supports(&self, doc: &Document) -> bool;

    fn extract(&self, doc: &Document) -> Result<Vec<RawTable>, EngineError>;
}

/// Engine names in default priority order.
pub const DEFAULT_ORDER: [&str; 5] = [
    XmlEngine::NAME,
    TextLayerEngine::NAME,
    RuledEngine::NAME,
    LayoutEngine::NAME,
    HeuristicEngine::NAME,
];

/// Build a built-in engine by name.
pub fn by_name(name: &str, caps: &Capabilities) -> Option<Box<dyn ExtractionEngine>> {
    let engine: Box<dyn ExtractionEngine> = match name {
        XmlEngine::NAME => Box::new(XmlEngine),
        TextLayerEngine::NAME => Box::new(TextLayerEngine),
        RuledEngine::NAME => Box::new(RuledEngine),
        LayoutEngine::NAME => Box::new(LayoutEngine::new(caps.pdftotext)),
        HeuristicEngine::NAME => Box::new(HeuristicEngine),
        _ => return None,
    };
    Some(engine)
}

// ── Shared line helpers ───────────────────────────────────────────────────────

re!(re_cell_gap, r"\t+|\s*\|\s*|\s{2,}");

/// Split a text line into cells on tabs, pipes or runs of two or more
/// spaces. Leading and trailing empty cells from border pipes are dropped.
pub(crate) fn split_cells(line: &str) -> Vec<String> {
    let mut cells: Vec<String> = re_cell_gap()
        .split(line.trim_end())
        .map(|c| c.trim().to_string())
        .collect();
    while cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
    }
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// An engine that fails on every document, like a geometry detector fed
    /// a malformed PDF.
    pub struct FailingEngine;

    impl ExtractionEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn supports(&self, _doc: &Document) -> bool {
            true
        }

        fn extract(&self, _doc: &Document) -> Result<Vec<RawTable>, EngineError> {
            Err(EngineError::Tool { tool: "failing", message: "malformed PDF".into() })
        }
    }

    /// Returns a fixed set of tables for every document.
    pub struct FixedEngine(pub &'static str, pub Vec<RawTable>);

    impl ExtractionEngine for FixedEngine {
        fn name(&self) -> &'static str {
            self.0
        }

        fn supports(&self, _doc: &Document) -> bool {
            true
        }

        fn extract(&self, _doc: &Document) -> Result<Vec<RawTable>, EngineError> {
            Ok(self.1.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_wide_gaps_tabs_and_pipes() {
        assert_eq!(split_cells("6a Male    10   20\t30"), ["6a Male", "10", "20", "30"]);
        assert_eq!(split_cells("| 6a | Male | 10 |"), ["6a", "Male", "10"]);
        assert_eq!(split_cells("   "), Vec::<String>::new());
    }

    #[test]
    fn registry_knows_every_default_engine() {
        let caps = Capabilities::none();
        for name in DEFAULT_ORDER {
            assert_eq!(by_name(name, &caps).unwrap().name(), name);
        }
        assert!(by_name("camelot", &caps).is_none());
    }
}
