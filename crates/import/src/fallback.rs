//! Last resort for sections no engine could resolve: rasterize, OCR, then
//! rebuild rows from recognized lines with the same code anchoring.

use gmpricing_core::{month_name, parse_number, CanonicalSection, SectionKind};
use gmpricing_ocr::{
    group_into_lines, lines_from_text, prepare_for_ocr_from_bytes, Capabilities, OcrBackend,
    OcrLine, Rasterizer,
};
use serde::Serialize;

use crate::anchor::match_line_code;
use crate::assemble::{parse_month, PartialSection, RowValues};
use crate::document::{Document, DocumentKind};
use crate::orchestrator::{Provenance, ResolvedSection, ResolvedSections};
use crate::util::{is_value_token, parse_year_token};

/// Below this mean word confidence recovered values are flagged for review.
pub const LOW_CONFIDENCE: f32 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FallbackOutcome {
    /// Every section was already resolved.
    NotNeeded,
    /// OCR could not run here; the rest of the pipeline is unaffected.
    Skipped { reason: String },
    Failed { error: String },
    Ran {
        pages: usize,
        lines: usize,
        /// Mean word confidence (0-100) over every recognized line that
        /// carries one; `None` for line-level OCR output.
        confidence: Option<f32>,
        filled: Vec<SectionKind>,
        /// Recognized text, for header field extraction.
        #[serde(skip)]
        text: String,
    },
}

impl FallbackOutcome {
    /// Notice worth showing the user, if any.
    pub fn notice(&self) -> Option<String> {
        match self {
            FallbackOutcome::Skipped { reason } => Some(format!("OCR fallback skipped: {reason}")),
            FallbackOutcome::Failed { error } => Some(format!("OCR fallback failed: {error}")),
            FallbackOutcome::Ran { filled, confidence, .. } if !filled.is_empty() => {
                let mut notice = format!("{} section(s) recovered by OCR", filled.len());
                if let Some(c) = confidence {
                    notice.push_str(&format!(", mean confidence {c:.0}%"));
                    if *c < LOW_CONFIDENCE {
                        notice.push_str("; check these values against the source");
                    }
                }
                Some(notice)
            }
            _ => None,
        }
    }
}

pub struct OcrFallback {
    backend: Box<dyn OcrBackend>,
    rasterizer: Box<dyn Rasterizer>,
    caps: Capabilities,
}

impl OcrFallback {
    pub fn new(backend: Box<dyn OcrBackend>, rasterizer: Box<dyn Rasterizer>, caps: Capabilities) -> Self {
        Self { backend, rasterizer, caps }
    }

    /// Fill still-missing sections in `sections` from OCR. Resolved sections
    /// are never touched.
    pub fn run(&self, doc: &Document, sections: &mut ResolvedSections) -> FallbackOutcome {
        let missing: Vec<SectionKind> =
            SectionKind::ALL.into_iter().filter(|k| !sections.contains_key(k)).collect();
        if missing.is_empty() {
            return FallbackOutcome::NotNeeded;
        }

        if let Some(reason) = self.unavailable(doc.kind()) {
            tracing::warn!(file = %doc.path().display(), "OCR fallback skipped: {reason}");
            return FallbackOutcome::Skipped { reason };
        }

        let pages = match self.page_images(doc) {
            Ok(pages) => pages,
            Err(error) => {
                tracing::warn!(file = %doc.path().display(), %error, "OCR fallback failed");
                return FallbackOutcome::Failed { error };
            }
        };

        let page_lines: Vec<Vec<OcrLine>> = pages.iter().map(|img| self.page_lines(img)).collect();
        let line_count = page_lines.iter().map(Vec::len).sum();
        let text = page_lines
            .iter()
            .flatten()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut filled = Vec::new();
        for found in sections_from_lines(&page_lines, &missing) {
            tracing::info!(section = %found.kind, page = found.page, "section recovered by OCR");
            filled.push(found.kind);
            sections.insert(
                found.kind,
                ResolvedSection { section: found.section, provenance: Provenance::Ocr { page: found.page } },
            );
        }

        let confidence = mean_confidence(&page_lines);
        FallbackOutcome::Ran { pages: pages.len(), lines: line_count, confidence, filled, text }
    }

    fn unavailable(&self, kind: DocumentKind) -> Option<String> {
        match kind {
            DocumentKind::Text | DocumentKind::SpreadsheetXml => {
                Some(format!("{} input has no page images", kind.as_str()))
            }
            DocumentKind::Image if !self.caps.can_ocr_images() => {
                Some("tesseract not found on PATH".to_string())
            }
            DocumentKind::Pdf if !self.caps.can_ocr_pdfs() => {
                Some("OCR of PDF pages needs both tesseract and pdftoppm".to_string())
            }
            _ => None,
        }
    }

    /// Preprocessed image bytes per page.
    fn page_images(&self, doc: &Document) -> Result<Vec<Vec<u8>>, String> {
        let raw = match doc.kind() {
            DocumentKind::Image => vec![doc.bytes().to_vec()],
            _ => {
                let file = doc.disk_path().map_err(|e| e.to_string())?;
                let images = self.rasterizer.rasterize(file.path()).map_err(|e| e.to_string())?;
                images
                    .pages()
                    .iter()
                    .map(std::fs::read)
                    .collect::<std::io::Result<Vec<_>>>()
                    .map_err(|e| e.to_string())?
            }
        };
        Ok(raw
            .into_iter()
            .map(|bytes| match prepare_for_ocr_from_bytes(&bytes) {
                Ok(prepared) => prepared,
                Err(e) => {
                    tracing::debug!(error = %e, "preprocessing failed, using the original image");
                    bytes
                }
            })
            .collect())
    }

    /// Box-level OCR grouped into lines, or line-level text when word boxes
    /// are unavailable.
    fn page_lines(&self, image: &[u8]) -> Vec<OcrLine> {
        match self.backend.recognize_words(image) {
            Ok(words) if !words.is_empty() => return group_into_lines(&words),
            Ok(_) => {}
            Err(e) => tracing::debug!(backend = self.backend.name(), error = %e, "using line-level OCR"),
        }
        match self.backend.recognize(image) {
            Ok(text) => lines_from_text(&text),
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "OCR failed on page");
                Vec::new()
            }
        }
    }
}

fn mean_confidence(pages: &[Vec<OcrLine>]) -> Option<f32> {
    let scored: Vec<f32> = pages.iter().flatten().filter_map(|l| l.confidence).collect();
    if scored.is_empty() {
        return None;
    }
    Some(scored.iter().sum::<f32>() / scored.len() as f32)
}

/// A section rebuilt from OCR lines and the page its first row was on.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredSection {
    pub kind: SectionKind,
    pub section: CanonicalSection,
    pub page: usize,
}

/// Anchor each line against the codes of the `missing` sections and build
/// every section whose required rows were all found. `pages` is in page
/// order, lines top to bottom.
pub fn sections_from_lines(pages: &[Vec<OcrLine>], missing: &[SectionKind]) -> Vec<RecoveredSection> {
    let mut partials: Vec<(PartialSection, Option<usize>)> =
        missing.iter().map(|&k| (PartialSection::new(k), None)).collect();

    for (i, lines) in pages.iter().enumerate() {
        for line in lines {
            for (partial, first_page) in partials.iter_mut() {
                let kind = partial.kind();
                let Some(m) = match_line_code(&line.text, &kind.codes()) else {
                    continue;
                };
                if partial.insert(m.code, line_values(kind, &m.rest)) {
                    first_page.get_or_insert(i + 1);
                }
                // Codes are unique across sections.
                break;
            }
        }
    }

    partials
        .into_iter()
        .filter_map(|(partial, page)| {
            let kind = partial.kind();
            if !partial.is_empty() && !partial.is_complete() {
                tracing::debug!(section = %kind, missing = ?partial.missing_codes(), "OCR rows incomplete");
            }
            let section = partial.finish()?;
            Some(RecoveredSection { kind, section, page: page.unwrap_or(1) })
        })
        .collect()
}

/// Values from the text after a row code. Numeric tokens fill the
/// canonical columns left to right.
fn line_values(kind: SectionKind, rest: &str) -> RowValues {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    // Dash placeholders keep their column and read as empty.
    let numbers = || tokens.iter().filter(|t| is_value_token(t)).map(|t| parse_number(t));

    match kind {
        SectionKind::CensusBeginning | SectionKind::CensusEnd => {
            let mut bands = [None; 6];
            for (slot, value) in bands.iter_mut().zip(numbers()) {
                *slot = value;
            }
            RowValues::Census(bands)
        }
        SectionKind::ClaimsByMemberType => {
            let mut values = numbers();
            let mut categories = [None; 5];
            for slot in categories.iter_mut() {
                *slot = values.next().flatten();
            }
            RowValues::Claims { categories, reported_total: values.next().flatten() }
        }
        SectionKind::ClaimsByServiceMonth => {
            let parsed = parse_month(rest);
            let year = tokens
                .iter()
                .find_map(|t| parse_year_token(t))
                .or_else(|| parsed.and_then(|(_, y)| y));
            // The year is numeric too; the value is the last other number.
            let mut skipped_year = false;
            let value = tokens
                .iter()
                .filter(|t| is_value_token(t))
                .filter(|t| {
                    if !skipped_year && year.is_some() && parse_year_token(t) == year {
                        skipped_year = true;
                        return false;
                    }
                    true
                })
                .last()
                .and_then(|t| parse_number(t));
            RowValues::Month {
                month: parsed.and_then(|(m, _)| month_name(m)).map(str::to_string),
                year,
                value,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;

    use super::*;
    use gmpricing_ocr::{BoundingBox, MockRecognizer, OcrWord, PageImages, RasterizeError};

    const CENSUS_TEXT: &str = "\
Population census (at end of reporting period)
Code Category 0-15 16-25 26-35 36-50 51-65 Over 65
6a Male 10 20 30 40 50 60
6b Single females 1 2 3 4 5 6
6c Married females 7 8 9 10 11 12
";

    const END_CENSUS: &str = "\
7a Male 5 5 5 5 5 5
7b Single females 1 1 1 1 1 1
7c Married females 2 2 2 2 2 2
";

    fn png() -> Vec<u8> {
        let img = image::GrayImage::from_pixel(40, 20, image::Luma([200u8]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn ocr_caps() -> Capabilities {
        Capabilities { pdftotext: false, pdftoppm: true, tesseract: true }
    }

    struct OnePage;

    impl Rasterizer for OnePage {
        fn rasterize(&self, _pdf: &Path) -> Result<PageImages, RasterizeError> {
            let dir = tempfile::tempdir()?;
            let page = dir.path().join("page-1.png");
            std::fs::write(&page, png())?;
            Ok(PageImages::new(dir, vec![page]))
        }
    }

    struct NoPdftoppm;

    impl Rasterizer for NoPdftoppm {
        fn rasterize(&self, _pdf: &Path) -> Result<PageImages, RasterizeError> {
            Err(RasterizeError::NotAvailable)
        }
    }

    fn fallback(text: &str, caps: Capabilities) -> OcrFallback {
        OcrFallback::new(Box::new(MockRecognizer::new(text)), Box::new(OnePage), caps)
    }

    fn image_doc() -> Document {
        Document::from_bytes("scan.png", DocumentKind::Image, png())
    }

    #[test]
    fn fills_missing_sections_from_image() {
        let mut sections = ResolvedSections::new();
        let outcome = fallback(CENSUS_TEXT, ocr_caps()).run(&image_doc(), &mut sections);

        let FallbackOutcome::Ran { pages, filled, text, .. } = outcome else {
            panic!("fallback did not run: {outcome:?}");
        };
        assert_eq!(pages, 1);
        assert_eq!(filled, [SectionKind::CensusBeginning]);
        assert!(text.starts_with("Population census"));
        let resolved = &sections[&SectionKind::CensusBeginning];
        assert_eq!(resolved.provenance, Provenance::Ocr { page: 1 });
        let CanonicalSection::Census(census) = &resolved.section else { panic!() };
        assert_eq!(census.rows[0].total, 210.0);
    }

    #[test]
    fn resolved_sections_are_not_overwritten() {
        let mut sections = ResolvedSections::new();
        fallback(CENSUS_TEXT, ocr_caps()).run(&image_doc(), &mut sections);
        let before = sections[&SectionKind::CensusBeginning].clone();

        let second = format!("{}{}", CENSUS_TEXT.replace("6a Male 10", "6a Male 99"), END_CENSUS);
        let outcome = fallback(&second, ocr_caps()).run(&image_doc(), &mut sections);
        assert!(matches!(&outcome, FallbackOutcome::Ran { filled, .. } if filled == &[SectionKind::CensusEnd]));
        assert_eq!(sections[&SectionKind::CensusBeginning], before);
        let CanonicalSection::Census(end) = &sections[&SectionKind::CensusEnd].section else { panic!() };
        assert_eq!(end.rows[0].bands[0], Some(5.0));
    }

    #[test]
    fn missing_capability_is_a_notice_not_an_error() {
        let mut sections = ResolvedSections::new();
        let outcome = fallback(CENSUS_TEXT, Capabilities::none()).run(&image_doc(), &mut sections);
        assert!(matches!(outcome, FallbackOutcome::Skipped { .. }));
        assert!(outcome.notice().unwrap().contains("tesseract"));
        assert!(sections.is_empty());

        let pdf = Document::from_bytes("r.pdf", DocumentKind::Pdf, Vec::new());
        let caps = Capabilities { pdftoppm: false, ..ocr_caps() };
        assert!(matches!(fallback("", caps).run(&pdf, &mut sections), FallbackOutcome::Skipped { .. }));

        let text = Document::from_text("r.txt", CENSUS_TEXT);
        assert!(matches!(fallback("", ocr_caps()).run(&text, &mut sections), FallbackOutcome::Skipped { .. }));
    }

    #[test]
    fn pdf_pages_are_rasterized() {
        let pdf = Document::from_bytes("scan.pdf", DocumentKind::Pdf, b"%PDF-1.4".to_vec());
        let mut sections = ResolvedSections::new();
        let outcome = fallback(CENSUS_TEXT, ocr_caps()).run(&pdf, &mut sections);
        assert!(matches!(outcome, FallbackOutcome::Ran { pages: 1, .. }));
        assert!(sections.contains_key(&SectionKind::CensusBeginning));
    }

    #[test]
    fn rasterizer_failure_is_reported() {
        let pdf = Document::from_bytes("scan.pdf", DocumentKind::Pdf, b"%PDF-1.4".to_vec());
        let fb = OcrFallback::new(Box::new(MockRecognizer::new(CENSUS_TEXT)), Box::new(NoPdftoppm), ocr_caps());
        let mut sections = ResolvedSections::new();
        let outcome = fb.run(&pdf, &mut sections);
        assert!(matches!(outcome, FallbackOutcome::Failed { .. }));
        assert!(sections.is_empty());
    }

    #[test]
    fn not_needed_when_everything_resolved() {
        let mut sections = ResolvedSections::new();
        let censuses = format!("{CENSUS_TEXT}{END_CENSUS}");
        fallback(&censuses, ocr_caps()).run(&image_doc(), &mut sections);
        assert_eq!(sections.len(), 2);
        let claims = "\
8a Employee 1 2 3 4 5 15
8b Spouse 1 1 1 1 1 5
8c Dependants 0 0 0 0 0 0
8d Totals 2 3 4 5 6 20
";
        let months: String = (0..12)
            .map(|i| format!("17{} {} 2023 1,000\n", (b'a' + i as u8) as char, month_name(i + 1).unwrap()))
            .collect();
        let fb = fallback(&format!("{claims}{months}"), ocr_caps());
        fb.run(&image_doc(), &mut sections);
        assert_eq!(sections.len(), 4);
        assert_eq!(fb.run(&image_doc(), &mut sections), FallbackOutcome::NotNeeded);
    }

    #[test]
    fn word_boxes_are_grouped_before_anchoring() {
        let word = |text: &str, left: u32, top: u32| {
            OcrWord::new(text, BoundingBox::new(left, top, 20, 10), 90.0)
        };
        let mut words = Vec::new();
        for (row, (code, values)) in [("8a", 1), ("8b", 2), ("8c", 3), ("8d", 6)].into_iter().enumerate() {
            let top = 100 + row as u32 * 30;
            // Scrambled order and a slight skew on the value words.
            for col in (0..5).rev() {
                words.push(word(&values.to_string(), 200 + col * 50, top + (col % 2)));
            }
            words.push(word(code, 10, top));
        }
        let fb = OcrFallback::new(Box::new(MockRecognizer::with_words(words)), Box::new(OnePage), ocr_caps());
        let mut sections = ResolvedSections::new();
        let outcome = fb.run(&image_doc(), &mut sections);
        assert!(matches!(outcome, FallbackOutcome::Ran { confidence: Some(c), .. } if (c - 90.0).abs() < 1e-3));

        let CanonicalSection::MemberClaims(claims) = &sections[&SectionKind::ClaimsByMemberType].section else {
            panic!("claims not recovered");
        };
        assert_eq!(claims.rows[0].categories, [Some(1.0); 5]);
        assert_eq!(claims.rows[3].total, 30.0);
        assert_eq!(claims.rows[3].reported_total, None);
    }

    #[test]
    fn confidence_reaches_the_notice() {
        let words = vec![
            OcrWord::new("6a", BoundingBox::new(10, 10, 20, 10), 40.0),
            OcrWord::new("Male", BoundingBox::new(40, 10, 40, 10), 50.0),
            OcrWord::new("1", BoundingBox::new(100, 10, 10, 10), 30.0),
            OcrWord::new("2", BoundingBox::new(10, 40, 10, 10), 70.0),
        ];
        let lines = group_into_lines(&words);
        assert_eq!(mean_confidence(&[lines]), Some(55.0));
        assert_eq!(mean_confidence(&[lines_from_text("6a Male 1")]), None);

        let low = FallbackOutcome::Ran {
            pages: 1,
            lines: 2,
            confidence: Some(55.0),
            filled: vec![SectionKind::CensusBeginning],
            text: String::new(),
        };
        let notice = low.notice().unwrap();
        assert!(notice.contains("mean confidence 55%"), "{notice}");
        assert!(notice.contains("check these values"));

        let line_level = FallbackOutcome::Ran {
            pages: 1,
            lines: 2,
            confidence: None,
            filled: vec![SectionKind::CensusBeginning],
            text: String::new(),
        };
        assert_eq!(line_level.notice().as_deref(), Some("1 section(s) recovered by OCR"));
        let nothing = FallbackOutcome::Ran { pages: 1, lines: 2, confidence: None, filled: Vec::new(), text: String::new() };
        assert_eq!(nothing.notice(), None);
    }

    #[test]
    fn month_line_values() {
        assert_eq!(
            line_values(SectionKind::ClaimsByServiceMonth, "January 2023 12,500"),
            RowValues::Month { month: Some("January".into()), year: Some(2023), value: Some(12500.0) }
        );
        assert_eq!(
            line_values(SectionKind::ClaimsByServiceMonth, "31/03/2024 2024 800"),
            RowValues::Month { month: Some("March".into()), year: Some(2024), value: Some(800.0) }
        );
        assert_eq!(
            line_values(SectionKind::ClaimsByServiceMonth, "Dec-23 -"),
            RowValues::Month { month: Some("December".into()), year: Some(2023), value: None }
        );
    }

    #[test]
    fn census_line_values_skip_noise() {
        assert_eq!(
            line_values(SectionKind::CensusEnd, "Male | 1 2 x 3"),
            RowValues::Census([Some(1.0), Some(2.0), Some(3.0), None, None, None])
        );
    }

    #[test]
    fn dash_cells_keep_their_column() {
        assert_eq!(
            line_values(SectionKind::CensusBeginning, "Single females 1 - 3 4 5 6"),
            RowValues::Census([Some(1.0), None, Some(3.0), Some(4.0), Some(5.0), Some(6.0)])
        );
        assert_eq!(
            line_values(SectionKind::ClaimsByMemberType, "Spouse 80 — 20 0 0 100"),
            RowValues::Claims {
                categories: [Some(80.0), None, Some(20.0), Some(0.0), Some(0.0)],
                reported_total: Some(100.0),
            }
        );
    }
}
