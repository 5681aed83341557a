//! Write extraction results: one CSV per section, a JSON report, or a plain
//! text table for the terminal.

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use gmpricing_core::{CanonicalSection, SectionKind};
use thiserror::Error;

use crate::pipeline::ExtractionReport;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn csv_file_name(stem: &str, kind: SectionKind) -> String {
    format!("{stem}_{}.csv", kind.slug())
}

/// Fixed header, then rows in canonical code order.
pub fn write_section_csv<W: Write>(section: &CanonicalSection, out: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(section.header())?;
    for record in section.records() {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// One CSV per found section into `dir`; missing sections write nothing.
pub fn write_csv_files(report: &ExtractionReport, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;
    let stem = report.stem();
    let mut written = Vec::new();
    for (kind, resolved) in &report.sections {
        let path = dir.join(csv_file_name(&stem, *kind));
        let file = std::fs::File::create(&path)?;
        write_section_csv(&resolved.section, std::io::BufWriter::new(file))?;
        tracing::debug!(path = %path.display(), "wrote section");
        written.push(path);
    }
    Ok(written)
}

pub fn write_json<W: Write>(reports: &[ExtractionReport], out: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(out, reports)?;
    Ok(())
}

/// Section as an aligned text table under its title.
pub fn render_table(section: &CanonicalSection) -> String {
    let header = section.header();
    let records = section.records();
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for record in &records {
        for (w, cell) in widths.iter_mut().zip(record) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", section.kind().title());
    let line = |out: &mut String, cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, &w))| {
                // Codes and labels left, numbers right.
                if i < 2 { format!("{cell:<w$}") } else { format!("{cell:>w$}") }
            })
            .collect();
        let _ = writeln!(out, "  {}", padded.join("  ").trim_end());
    };
    line(&mut out, &header);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    line(&mut out, &rule);
    for record in &records {
        line(&mut out, record);
    }
    out
}

/// Every section of a report, with "not found" for the missing ones, then
/// OCR notices and validation issues.
pub fn render_report(report: &ExtractionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", report.source.display(), report.document_kind.as_str());
    if let Some(date) = report.fields.report_date {
        let _ = writeln!(out, "Report date: {date}");
    }
    if let Some(period) = report.fields.period {
        let _ = writeln!(out, "Reporting period: {period}");
    }

    for kind in SectionKind::ALL {
        out.push('\n');
        match report.sections.get(&kind) {
            Some(resolved) => {
                out.push_str(&render_table(&resolved.section));
                let _ = writeln!(out, "  (from {})", resolved.provenance);
            }
            None => {
                let _ = writeln!(out, "{}\n  not found", kind.title());
            }
        }
    }

    if let Some(notice) = report.ocr.notice() {
        let _ = writeln!(out, "\nNote: {notice}");
    }
    if !report.issues.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for issue in &report.issues {
            let _ = writeln!(out, "  - {issue}");
        }
    }
    out
}
