//! Subcommand handlers. Tables and reports go to stdout, logs to stderr.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use gmpricing_core::{CanonicalSection, SectionKind};
use gmpricing_import::{
    collect_inputs, render_report, write_csv_files, write_json, DocumentKind, ExtractionReport,
    OcrFallback, Orchestrator, Pipeline, Provenance, DEFAULT_ORDER,
};
use gmpricing_ocr::{Capabilities, OcrBackend, Pdftoppm};
use gmpricing_pricing::{
    census_lines, section_lines, Money, PriceTable, PricingCalculator, PricingLine, PricingResult,
};
use serde::Serialize;

use crate::cli::{AnalyzeArgs, ExtractArgs, OutputFormat, PriceArgs, SampleArgs};
use crate::config::{self, Config};
use crate::sample;

// ── Pipeline setup ────────────────────────────────────────────────────────────

fn capabilities() -> Capabilities {
    #[allow(unused_mut)]
    let mut caps = Capabilities::probe();
    // The linked library stands in for the tesseract binary.
    #[cfg(feature = "tesseract")]
    {
        caps.tesseract = true;
    }
    caps
}

#[cfg(feature = "tesseract")]
fn ocr_backend(config: &Config) -> Box<dyn OcrBackend> {
    Box::new(gmpricing_ocr::recognizer::tesseract_backend::TesseractRecognizer::new(
        config.ocr.data_path.clone(),
        &config.ocr.language,
    ))
}

#[cfg(not(feature = "tesseract"))]
fn ocr_backend(config: &Config) -> Box<dyn OcrBackend> {
    Box::new(gmpricing_ocr::TesseractCli::new(&config.ocr.language, config.ocr.psm))
}

fn build_pipeline(
    config: &Config,
    caps: Capabilities,
    engines: Option<&[String]>,
    no_ocr: bool,
) -> anyhow::Result<Pipeline> {
    let order = engines.unwrap_or(config.extraction.engines.as_slice());
    let orchestrator = Orchestrator::from_names(order, &config.extraction.disabled, &caps)?;
    let fallback = (config.ocr.enabled && !no_ocr).then(|| {
        OcrFallback::new(ocr_backend(config), Box::new(Pdftoppm { dpi: config.ocr.dpi }), caps)
    });
    tracing::debug!(engines = ?orchestrator.engine_names(), ocr = fallback.is_some(), "pipeline ready");
    Ok(Pipeline::new(orchestrator, fallback))
}

/// Process every input, logging and counting the ones that cannot be read.
fn extract_all(pipeline: &Pipeline, path: &Path) -> anyhow::Result<(Vec<ExtractionReport>, usize)> {
    let inputs = collect_inputs(path)?;
    if inputs.is_empty() {
        bail!("No supported files in {}", path.display());
    }
    let mut reports = Vec::with_capacity(inputs.len());
    let mut failed = 0;
    for input in &inputs {
        match pipeline.process_path(input) {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::error!(file = %input.display(), error = %e, "could not read document");
                failed += 1;
            }
        }
    }
    Ok((reports, failed))
}

// ── extract ───────────────────────────────────────────────────────────────────

pub fn extract(config: &Config, args: &ExtractArgs) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, capabilities(), args.engines.as_deref(), args.no_ocr)?;
    let (reports, failed) = extract_all(&pipeline, &args.path)?;
    let format = args.format.unwrap_or(config.output.format);
    let out_dir = args.output.as_deref().unwrap_or(config.output.directory.as_path());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Table => {
            for report in &reports {
                writeln!(out, "{}", render_report(report))?;
            }
        }
        OutputFormat::Csv => {
            for report in &reports {
                let written = write_csv_files(report, out_dir)?;
                for path in written {
                    writeln!(out, "{}", path.display())?;
                }
                if !report.is_complete() {
                    tracing::warn!(file = %report.source.display(), missing = ?report.missing(), "sections not found");
                }
            }
        }
        OutputFormat::Json => match &args.output {
            Some(dir) => {
                std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
                let path = dir.join("extraction.json");
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_json(&reports, std::io::BufWriter::new(file))?;
                writeln!(out, "{}", path.display())?;
            }
            None => {
                write_json(&reports, &mut out)?;
                writeln!(out)?;
            }
        },
    }

    let summary = Summary::of(&reports, failed);
    tracing::info!(
        files = summary.files,
        complete = summary.complete,
        incomplete = summary.incomplete,
        failed = summary.failed,
        "done"
    );
    if reports.is_empty() {
        bail!("No document could be read");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct Summary {
    files: usize,
    complete: usize,
    incomplete: usize,
    failed: usize,
}

impl Summary {
    fn of(reports: &[ExtractionReport], failed: usize) -> Self {
        let complete = reports.iter().filter(|r| r.is_complete()).count();
        Self { files: reports.len() + failed, complete, incomplete: reports.len() - complete, failed }
    }
}

// ── price ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PricedReport {
    source: PathBuf,
    basis: Vec<SectionKind>,
    result: PricingResult,
}

/// Census at the beginning of the period when found, else at the end.
fn pricing_basis(report: &ExtractionReport, all_sections: bool) -> (Vec<SectionKind>, Vec<PricingLine>) {
    if all_sections {
        let kinds: Vec<SectionKind> = report.sections.keys().copied().collect();
        let lines = report.sections.values().flat_map(|r| section_lines(&r.section)).collect();
        return (kinds, lines);
    }
    for kind in [SectionKind::CensusBeginning, SectionKind::CensusEnd] {
        if let Some(CanonicalSection::Census(census)) = report.section(kind) {
            return (vec![kind], census_lines(census));
        }
    }
    (Vec::new(), Vec::new())
}

pub fn price(config: &Config, args: &PriceArgs) -> anyhow::Result<()> {
    let table = PriceTable::load(&args.prices)
        .with_context(|| format!("Failed to load price table {}", args.prices.display()))?;
    let calculator = PricingCalculator::new(table);
    let pipeline = build_pipeline(config, capabilities(), None, args.no_ocr)?;
    let (reports, _) = extract_all(&pipeline, &args.path)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut priced = Vec::new();
    for report in reports {
        let (basis, lines) = pricing_basis(&report, args.all_sections);
        if lines.is_empty() {
            tracing::warn!(file = %report.source.display(), "nothing to price: no census found");
            continue;
        }
        let result = calculator.calculate(&lines);
        write_pricing(&mut out, &report.source, &result)?;
        priced.push(PricedReport { source: report.source, basis, result });
    }

    if let Some(path) = &args.output {
        let file = std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &priced)?;
        tracing::info!(path = %path.display(), "pricing written");
    }
    if priced.is_empty() {
        bail!("No report could be priced");
    }
    Ok(())
}

fn write_pricing<W: Write>(out: &mut W, source: &Path, result: &PricingResult) -> std::io::Result<()> {
    writeln!(out, "{}", source.display())?;
    let width = result.lines.iter().map(|l| l.code.len()).max().unwrap_or(4).max(4);
    writeln!(out, "  {:<width$}  {:>8}  {:>10}  {:>5}  {:>12}", "Code", "Qty", "Price", "x", "Amount")?;
    for line in &result.lines {
        let flag = if line.known { "" } else { " *" };
        writeln!(
            out,
            "  {:<width$}  {:>8}  {:>10}  {:>5}  {:>12}{flag}",
            line.code,
            line.quantity.to_string(),
            line.unit_price.to_string(),
            line.multiplier.to_string(),
            line.amount.to_string()
        )?;
    }
    writeln!(out, "  Total: {} {}", result.total, result.currency)?;
    writeln!(out, "  Confidence: {:.1}%", result.confidence)?;
    for note in &result.notes {
        writeln!(out, "  Note: {note}")?;
    }
    for warning in &result.warnings {
        writeln!(out, "  Warning: {warning}")?;
    }
    writeln!(out)
}

// ── analyze ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
struct AnalysisSummary {
    #[serde(flatten)]
    counts: Summary,
    /// Complete reports as a share of every input, 0-100.
    success_rate: f64,
    /// Resolved sections per engine, OCR counted as `ocr`.
    sections_by_source: BTreeMap<String, usize>,
    validation_issues: usize,
    priced: usize,
    /// Pricing totals per currency.
    totals: BTreeMap<String, Money>,
}

impl AnalysisSummary {
    fn of(reports: &[ExtractionReport], failed: usize, priced: &[PricedReport]) -> Self {
        let counts = Summary::of(reports, failed);
        let success_rate = if counts.files == 0 {
            0.0
        } else {
            counts.complete as f64 * 100.0 / counts.files as f64
        };

        let mut sections_by_source = BTreeMap::new();
        for resolved in reports.iter().flat_map(|r| r.sections.values()) {
            let source = match &resolved.provenance {
                Provenance::Engine { engine, .. } => engine.clone(),
                Provenance::Ocr { .. } => "ocr".to_string(),
            };
            *sections_by_source.entry(source).or_insert(0) += 1;
        }

        let mut totals: BTreeMap<String, Money> = BTreeMap::new();
        for p in priced {
            let total = totals.entry(p.result.currency.clone()).or_default();
            *total = *total + p.result.total;
        }

        Self {
            counts,
            success_rate,
            sections_by_source,
            validation_issues: reports.iter().map(|r| r.issues.len()).sum(),
            priced: priced.len(),
            totals,
        }
    }
}

#[derive(Debug, Serialize)]
struct Analysis<'a> {
    generated_at: String,
    summary: &'a AnalysisSummary,
    reports: &'a [ExtractionReport],
    pricing: &'a [PricedReport],
}

pub fn analyze(config: &Config, args: &AnalyzeArgs) -> anyhow::Result<()> {
    let calculator = match &args.prices {
        Some(path) => Some(PricingCalculator::new(
            PriceTable::load(path).with_context(|| format!("Failed to load price table {}", path.display()))?,
        )),
        None => None,
    };
    let pipeline = build_pipeline(config, capabilities(), None, args.no_ocr)?;
    let (reports, failed) = extract_all(&pipeline, &args.path)?;

    let mut priced = Vec::new();
    if let Some(calculator) = &calculator {
        for report in &reports {
            let (basis, lines) = pricing_basis(report, false);
            if lines.is_empty() {
                tracing::warn!(file = %report.source.display(), "nothing to price: no census found");
                continue;
            }
            let result = calculator.calculate(&lines);
            priced.push(PricedReport { source: report.source.clone(), basis, result });
        }
    }

    let summary = AnalysisSummary::of(&reports, failed, &priced);
    let path = match &args.output {
        Some(path) => path.clone(),
        None => config.output.directory.join("analysis.json"),
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let analysis = Analysis {
        generated_at: chrono::Local::now().to_rfc3339(),
        summary: &summary,
        reports: &reports,
        pricing: &priced,
    };
    let file = std::fs::File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &analysis)?;
    tracing::info!(path = %path.display(), "analysis written");

    let stdout = std::io::stdout();
    write_analysis(&mut stdout.lock(), &summary, &path)?;
    if reports.is_empty() {
        bail!("No document could be read");
    }
    Ok(())
}

fn write_analysis<W: Write>(out: &mut W, summary: &AnalysisSummary, saved: &Path) -> std::io::Result<()> {
    let counts = &summary.counts;
    writeln!(out, "Analysis summary")?;
    writeln!(out, "  Files processed: {}", counts.files)?;
    writeln!(
        out,
        "  Complete: {} ({:.1}%), incomplete: {}, unreadable: {}",
        counts.complete, summary.success_rate, counts.incomplete, counts.failed
    )?;
    if !summary.sections_by_source.is_empty() {
        let sources: Vec<String> =
            summary.sections_by_source.iter().map(|(source, n)| format!("{source} {n}")).collect();
        writeln!(out, "  Sections by source: {}", sources.join(", "))?;
    }
    writeln!(out, "  Validation warnings: {}", summary.validation_issues)?;
    writeln!(out, "  Priced reports: {}", summary.priced)?;
    for (currency, total) in &summary.totals {
        writeln!(out, "  Total estimated cost: {total} {currency}")?;
    }
    writeln!(out, "  Saved to: {}", saved.display())
}

// ── info ──────────────────────────────────────────────────────────────────────

pub fn info(config: &Config, config_path: Option<&Path>) -> anyhow::Result<()> {
    let caps = capabilities();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let yes_no = |b: bool| if b { "available" } else { "missing" };

    writeln!(out, "gmpricing {}", env!("CARGO_PKG_VERSION"))?;
    match config_path.map(Path::to_path_buf).or_else(config::default_path) {
        Some(path) if path.is_file() => writeln!(out, "Config: {}", path.display())?,
        Some(path) => writeln!(out, "Config: defaults ({} not found)", path.display())?,
        None => writeln!(out, "Config: defaults")?,
    }

    writeln!(out, "\nExternal tools:")?;
    writeln!(out, "  pdftotext  {}", yes_no(caps.pdftotext))?;
    writeln!(out, "  pdftoppm   {}", yes_no(caps.pdftoppm))?;
    writeln!(out, "  tesseract  {}", yes_no(caps.tesseract))?;

    let order: Vec<&str> = config
        .extraction
        .engines
        .iter()
        .map(String::as_str)
        .filter(|name| !config.extraction.disabled.iter().any(|d| d == name))
        .collect();
    writeln!(out, "\nEngines: {}", order.join(" > "))?;
    writeln!(out, "Known engines: {}", DEFAULT_ORDER.join(", "))?;
    let ocr = if !config.ocr.enabled {
        "disabled".to_string()
    } else {
        format!(
            "images {}, PDFs {} ({}, {} dpi)",
            if caps.can_ocr_images() { "yes" } else { "no" },
            if caps.can_ocr_pdfs() { "yes" } else { "no" },
            config.ocr.language,
            config.ocr.dpi
        )
    };
    writeln!(out, "OCR fallback: {ocr}")?;

    writeln!(out, "\nSupported inputs:")?;
    for kind in [DocumentKind::Pdf, DocumentKind::Image, DocumentKind::SpreadsheetXml, DocumentKind::Text] {
        writeln!(out, "  {:<16} {}", kind.as_str(), extensions(kind))?;
    }
    Ok(())
}

fn extensions(kind: DocumentKind) -> String {
    match kind {
        DocumentKind::Pdf => ".pdf".to_string(),
        DocumentKind::Image => gmpricing_import::document::IMAGE_EXTENSIONS
            .iter()
            .map(|e| format!(".{e}"))
            .collect::<Vec<_>>()
            .join(" "),
        DocumentKind::SpreadsheetXml => ".xml".to_string(),
        DocumentKind::Text => ".txt".to_string(),
    }
}

// ── sample ────────────────────────────────────────────────────────────────────

pub fn sample(args: &SampleArgs) -> anyhow::Result<()> {
    for path in sample::write_sample(&args.output)? {
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmpricing_import::Document;

    fn sample_report() -> ExtractionReport {
        let pipeline = build_pipeline(&Config::default(), Capabilities::none(), None, true).unwrap();
        pipeline.process(&Document::from_text(sample::REPORT_FILE, &sample::report_text()))
    }

    #[test]
    fn engine_override_and_unknown_engine() {
        let engines = vec!["text-layer".to_string()];
        let pipeline = build_pipeline(&Config::default(), Capabilities::none(), Some(&engines), true).unwrap();
        assert_eq!(pipeline.orchestrator().engine_names(), ["text-layer"]);

        let bogus = vec!["tabula".to_string()];
        assert!(build_pipeline(&Config::default(), Capabilities::none(), Some(&bogus), true).is_err());
    }

    #[test]
    fn prices_the_beginning_of_period_census() {
        let mut report = sample_report();
        let (basis, lines) = pricing_basis(&report, false);
        assert_eq!(basis, [SectionKind::CensusBeginning]);
        assert!(lines.iter().all(|l| l.code.starts_with('6')));

        let (basis, lines) = pricing_basis(&report, true);
        assert_eq!(basis.len(), 4);
        assert!(lines.iter().any(|l| l.code == "17a"));

        report.sections.remove(&SectionKind::CensusBeginning);
        assert_eq!(pricing_basis(&report, false).0, [SectionKind::CensusEnd]);
    }

    #[test]
    fn pricing_output_marks_default_prices() {
        let table = PriceTable::from_toml(sample::PRICE_TABLE).unwrap();
        let result = PricingCalculator::new(table).calculate(&[
            PricingLine::new("6a:0-15", 2.into()),
            PricingLine::new("9z", 1.into()),
        ]);
        let mut buf = Vec::new();
        write_pricing(&mut buf, Path::new("r.txt"), &result).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Total: 3100.00 AED"), "{text}");
        assert!(text.lines().any(|l| l.starts_with("  9z") && l.ends_with(" *")));
    }

    #[test]
    fn analysis_summarizes_sources_and_pricing() {
        let report = sample_report();
        let calculator = PricingCalculator::new(PriceTable::from_toml(sample::PRICE_TABLE).unwrap());
        let (basis, lines) = pricing_basis(&report, false);
        let result = calculator.calculate(&lines);
        let total = result.total;
        let priced = vec![PricedReport { source: report.source.clone(), basis, result }];

        let summary = AnalysisSummary::of(&[report], 1, &priced);
        assert_eq!(summary.counts, Summary { files: 2, complete: 1, incomplete: 0, failed: 1 });
        assert_eq!(summary.success_rate, 50.0);
        assert_eq!(summary.sections_by_source.values().sum::<usize>(), 4);
        assert!(!summary.sections_by_source.contains_key("ocr"));
        assert_eq!(summary.totals["AED"], total);

        let mut buf = Vec::new();
        write_analysis(&mut buf, &summary, Path::new("out/analysis.json")).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Complete: 1 (50.0%), incomplete: 0, unreadable: 1"), "{text}");
        assert!(text.contains(&format!("Total estimated cost: {total} AED")));
    }

    #[test]
    fn analyze_saves_the_analysis() {
        let dir = tempfile::tempdir().unwrap();
        sample::write_sample(dir.path()).unwrap();
        let output = dir.path().join("out").join("analysis.json");
        let args = AnalyzeArgs {
            path: dir.path().join(sample::REPORT_FILE),
            prices: Some(dir.path().join(sample::PRICES_FILE)),
            output: Some(output.clone()),
            no_ocr: true,
        };
        analyze(&Config::default(), &args).unwrap();

        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(saved["summary"]["files"], 1);
        assert_eq!(saved["summary"]["complete"], 1);
        assert_eq!(saved["summary"]["priced"], 1);
        assert_eq!(saved["reports"].as_array().map(Vec::len), Some(1));
        assert_eq!(saved["pricing"][0]["basis"][0], "census_beginning");
    }

    #[test]
    fn summary_counts() {
        let summary = Summary::of(&[sample_report()], 2);
        assert_eq!(summary, Summary { files: 3, complete: 1, incomplete: 0, failed: 2 });
    }
}
