#[macro_use]
mod util;

pub mod anchor;
pub mod assemble;
pub mod columns;
pub mod document;
pub mod engine;
pub mod export;
pub mod fallback;
pub mod fields;
pub mod orchestrator;
pub mod pipeline;
pub mod validate;

pub use anchor::{match_line_code, match_row_code, AnchorMatch, LineMatch};
pub use assemble::{assemble, PartialSection, RowValues};
pub use columns::{classify_header, map_columns, ColumnMapping, MappedColumn};
pub use document::{collect_inputs, Document, DocumentError, DocumentKind};
pub use engine::{EngineError, ExtractionEngine, DEFAULT_ORDER};
pub use export::{render_report, render_table, write_csv_files, write_json, write_section_csv, ExportError};
pub use fallback::{sections_from_lines, FallbackOutcome, OcrFallback};
pub use fields::{extract_fields, ReportFields};
pub use orchestrator::{
    resolve, CandidatePool, EngineDiagnostic, EngineStatus, Orchestrator, OrchestratorError,
    Provenance, ResolvedSection, ResolvedSections,
};
pub use pipeline::{ExtractionReport, Pipeline};
pub use validate::{validate, validate_period, ValidationIssue};
