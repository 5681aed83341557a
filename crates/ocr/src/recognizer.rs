use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;

use crate::types::{BoundingBox, OcrWord};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OCR backend `{0}` does not report word boxes")]
    WordsUnsupported(&'static str),
    #[error("Tesseract not available: install the `tesseract` binary or build with the `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over an OCR backend.
/// Implementations accept raw PNG/JPEG image bytes.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Line-oriented OCR: the recognized text, one source line per `\n`.
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;

    /// Box-level OCR: every recognized word with its bounding box.
    fn recognize_words(&self, _image_bytes: &[u8]) -> Result<Vec<OcrWord>, OcrError> {
        Err(OcrError::WordsUnsupported(self.name()))
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns pre-set text and words, so the fallback path can be tested
/// without Tesseract installed.
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    pub text: String,
    pub words: Option<Vec<OcrWord>>,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), words: None }
    }

    pub fn with_words(words: Vec<OcrWord>) -> Self {
        Self { text: String::new(), words: Some(words) }
    }
}

impl OcrBackend for MockRecognizer {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }

    fn recognize_words(&self, _image_bytes: &[u8]) -> Result<Vec<OcrWord>, OcrError> {
        self.words.clone().ok_or(OcrError::WordsUnsupported("mock"))
    }
}

// ── Tesseract CLI backend ─────────────────────────────────────────────────────

/// Shells out to the `tesseract` binary. The image is written to a temporary
/// file that is removed when the call returns.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    lang: String,
    /// Page segmentation mode; 6 = "assume a uniform block of text".
    psm: u8,
}

impl TesseractCli {
    pub fn new(lang: &str, psm: u8) -> Self {
        Self { binary: PathBuf::from("tesseract"), lang: lang.to_string(), psm }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn run(&self, image_bytes: &[u8], tsv: bool) -> Result<String, OcrError> {
        let mut input = tempfile::Builder::new().prefix("gmpricing-ocr-").suffix(".png").tempfile()?;
        input.write_all(image_bytes)?;
        input.flush()?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(input.path())
            .arg("stdout")
            .args(["-l", &self.lang, "--psm", &self.psm.to_string()]);
        if tsv {
            cmd.arg("tsv");
        }

        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OcrError::NotAvailable
            } else {
                OcrError::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("eng", 6)
    }
}

impl OcrBackend for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract-cli"
    }

    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        self.run(image_bytes, false)
    }

    fn recognize_words(&self, image_bytes: &[u8]) -> Result<Vec<OcrWord>, OcrError> {
        let tsv = self.run(image_bytes, true)?;
        Ok(parse_tsv(&tsv))
    }
}

/// Parse Tesseract's TSV output into word boxes.
///
/// Only level-5 (word) records with non-blank text are kept; malformed rows
/// are skipped rather than failing the page.
pub fn parse_tsv(tsv: &str) -> Vec<OcrWord> {
    tsv.lines()
        .skip_while(|l| l.starts_with("level"))
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 12 || cols[0] != "5" {
                return None;
            }
            let text = cols[11..].join("\t");
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let num = |i: usize| cols[i].trim().parse::<u32>().ok();
            let bbox = BoundingBox::new(num(6)?, num(7)?, num(8)?, num(9)?);
            let confidence = cols[10].trim().parse::<f32>().unwrap_or(0.0);
            Some(OcrWord::new(text, bbox, confidence))
        })
        .collect()
}

// ── Tesseract library backend (optional, gated behind `tesseract` feature) ────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{parse_tsv, OcrBackend, OcrError, OcrWord};
    use leptess::LepTess;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }

        fn load(&self, image_bytes: &[u8]) -> Result<LepTess, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            Ok(lt)
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn name(&self) -> &'static str {
            "tesseract-lib"
        }

        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            self.load(image_bytes)?
                .get_utf8_text()
                .map_err(|e| OcrError::Engine(e.to_string()))
        }

        fn recognize_words(&self, image_bytes: &[u8]) -> Result<Vec<OcrWord>, OcrError> {
            let tsv = self
                .load(image_bytes)?
                .get_tsv_text(0)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(parse_tsv(&tsv))
        }
    }
}
