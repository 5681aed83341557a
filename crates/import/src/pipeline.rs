//! One document in, one [`ExtractionReport`] out.

use std::path::{Path, PathBuf};

use gmpricing_core::{CanonicalSection, SectionKind};
use serde::Serialize;

use crate::document::{Document, DocumentError, DocumentKind};
use crate::engine::xml::created_date;
use crate::fallback::{FallbackOutcome, OcrFallback};
use crate::fields::{extract_fields, ReportFields};
use crate::orchestrator::{EngineDiagnostic, Orchestrator, ResolvedSections};
use crate::validate::{validate, validate_period, ValidationIssue};

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub source: PathBuf,
    pub document_kind: DocumentKind,
    pub sha256: String,
    pub fields: ReportFields,
    pub sections: ResolvedSections,
    pub engines: Vec<EngineDiagnostic>,
    /// Tables pooled across all engines.
    pub candidates: usize,
    pub ocr: FallbackOutcome,
    pub issues: Vec<ValidationIssue>,
}

impl ExtractionReport {
    pub fn section(&self, kind: SectionKind) -> Option<&CanonicalSection> {
        self.sections.get(&kind).map(|r| &r.section)
    }

    pub fn missing(&self) -> Vec<SectionKind> {
        SectionKind::ALL.into_iter().filter(|k| !self.sections.contains_key(k)).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.sections.len() == SectionKind::ALL.len()
    }

    /// File stem used for exported files.
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string())
    }
}

pub struct Pipeline {
    orchestrator: Orchestrator,
    fallback: Option<OcrFallback>,
}

impl Pipeline {
    /// `fallback: None` disables OCR entirely.
    pub fn new(orchestrator: Orchestrator, fallback: Option<OcrFallback>) -> Self {
        Self { orchestrator, fallback }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn process_path(&self, path: &Path) -> Result<ExtractionReport, DocumentError> {
        let doc = Document::load(path)?;
        Ok(self.process(&doc))
    }

    pub fn process(&self, doc: &Document) -> ExtractionReport {
        let span = tracing::info_span!("extract", file = %doc.path().display());
        let _guard = span.enter();

        let (mut sections, pool) = self.orchestrator.run(doc);

        let ocr = match &self.fallback {
            Some(fallback) => fallback.run(doc, &mut sections),
            None if sections.len() < SectionKind::ALL.len() => {
                FallbackOutcome::Skipped { reason: "OCR fallback disabled".to_string() }
            }
            None => FallbackOutcome::NotNeeded,
        };

        let fields = header_fields(doc, &ocr);
        let mut issues = validate(&sections);
        if let Some(period) = fields.period {
            issues.extend(validate_period(period, &sections));
        }
        for issue in &issues {
            tracing::warn!(%issue, "validation");
        }

        let report = ExtractionReport {
            source: doc.path().to_path_buf(),
            document_kind: doc.kind(),
            sha256: doc.digest(),
            fields,
            sections,
            engines: pool.diagnostics,
            candidates: pool.tables.len(),
            ocr,
            issues,
        };
        tracing::info!(
            found = report.sections.len(),
            missing = ?report.missing(),
            "extraction finished"
        );
        report
    }
}

/// Template metadata first, then the text layer, then OCR text.
fn header_fields(doc: &Document, ocr: &FallbackOutcome) -> ReportFields {
    let mut fields = ReportFields::default();
    match doc.kind() {
        DocumentKind::SpreadsheetXml => {
            if let Ok(xml) = doc.text() {
                fields.report_date = created_date(xml);
                fields = fields.or(extract_fields(xml));
            }
        }
        DocumentKind::Pdf | DocumentKind::Text => {
            if let Ok(pages) = doc.page_texts() {
                fields = extract_fields(&pages.join("\n"));
            }
        }
        DocumentKind::Image => {}
    }
    if let FallbackOutcome::Ran { text, .. } = ocr {
        fields = fields.or(extract_fields(text));
    }
    fields
}
