//! Input documents: loading, type detection and the per-page text layer.

use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use gmpricing_ocr::content_digest;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("Document is not valid UTF-8 text")]
    NotText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Image,
    Text,
    /// DHA extraction template saved as Excel 2003 XML.
    SpreadsheetXml,
}

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif"];

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" => Some(DocumentKind::Text),
            "xml" => Some(DocumentKind::SpreadsheetXml),
            e if IMAGE_EXTENSIONS.contains(&e) => Some(DocumentKind::Image),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "image",
            DocumentKind::Text => "text",
            DocumentKind::SpreadsheetXml => "xml",
        }
    }
}

/// One input file, held in memory for the duration of its processing.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    kind: DocumentKind,
    bytes: Vec<u8>,
    /// `path` holds exactly `bytes`: set only by [`Document::load`].
    on_disk: bool,
    pages: OnceLock<Result<Vec<String>, String>>,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| DocumentError::Unsupported(path.display().to_string()))?;
        let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { on_disk: true, ..Self::from_bytes(path, kind, bytes) })
    }

    pub fn from_bytes(path: impl Into<PathBuf>, kind: DocumentKind, bytes: Vec<u8>) -> Self {
        Self { path: path.into(), kind, bytes, on_disk: false, pages: OnceLock::new() }
    }

    /// In-memory text document, used by tests and the sample command.
    pub fn from_text(name: &str, text: &str) -> Self {
        Self::from_bytes(name, DocumentKind::Text, text.as_bytes().to_vec())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// A filesystem path holding this document's bytes, for external tools.
    /// In-memory documents are copied to a temporary file removed on drop,
    /// even when a file of the same name exists.
    pub fn disk_path(&self) -> std::io::Result<DiskPath<'_>> {
        if self.on_disk {
            return Ok(DiskPath { path: Cow::Borrowed(&self.path), _copy: None });
        }
        let ext = self.path.extension().and_then(|e| e.to_str()).unwrap_or(self.kind.as_str());
        let mut tmp = tempfile::Builder::new()
            .prefix("gmpricing-")
            .suffix(&format!(".{ext}"))
            .tempfile()?;
        tmp.write_all(&self.bytes)?;
        tmp.flush()?;
        Ok(DiskPath { path: Cow::Owned(tmp.path().to_path_buf()), _copy: Some(tmp) })
    }

    pub fn digest(&self) -> String {
        content_digest(&self.bytes)
    }

    /// Whole contents as UTF-8, for text and XML inputs.
    pub fn text(&self) -> Result<&str, DocumentError> {
        std::str::from_utf8(&self.bytes).map_err(|_| DocumentError::NotText)
    }

    /// Text layer split by page. Text files are a single page; images and
    /// XML templates have no text layer.
    pub fn page_texts(&self) -> Result<&[String], DocumentError> {
        let pages = self.pages.get_or_init(|| match self.kind {
            DocumentKind::Pdf => pdf_page_texts(&self.bytes),
            DocumentKind::Text => std::str::from_utf8(&self.bytes)
                .map(|t| vec![t.to_string()])
                .map_err(|_| DocumentError::NotText.to_string()),
            DocumentKind::Image | DocumentKind::SpreadsheetXml => Ok(Vec::new()),
        });
        pages.as_deref().map_err(|e| DocumentError::Pdf(e.clone()))
    }
}

pub struct DiskPath<'a> {
    path: Cow<'a, Path>,
    _copy: Option<tempfile::NamedTempFile>,
}

impl DiskPath<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn pdf_page_texts(bytes: &[u8]) -> Result<Vec<String>, String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| format!("Failed to load PDF: {e}"))?;
    let mut numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    numbers.sort_unstable();

    Ok(numbers
        .into_iter()
        .map(|n| match doc.extract_text(&[n]) {
            Ok(text) => text,
            Err(e) => {
                // Scanned pages and odd encodings: empty text, OCR may still find it.
                tracing::debug!(page = n, error = %e, "no text layer");
                String::new()
            }
        })
        .collect())
}

/// Expand a CLI path argument into the supported files it names. Directories
/// are scanned one level deep, sorted by file name.
pub fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let io_err = |source| DocumentError::Io { path: path.to_path_buf(), source };
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(io_err)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && DocumentKind::from_path(p).is_some())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a/report.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_path(Path::new("scan.jpeg")), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_path(Path::new("template.xml")), Some(DocumentKind::SpreadsheetXml));
        assert_eq!(DocumentKind::from_path(Path::new("notes.txt")), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_path(Path::new("book.xlsx")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn text_document_is_one_page() {
        let doc = Document::from_text("r.txt", "6a Male 1 2 3");
        assert_eq!(doc.page_texts().unwrap(), ["6a Male 1 2 3"]);
    }

    #[test]
    fn image_has_no_text_layer() {
        let doc = Document::from_bytes("scan.png", DocumentKind::Image, vec![0x89, b'P']);
        assert!(doc.page_texts().unwrap().is_empty());
    }

    #[test]
    fn broken_pdf_reports_error_every_time() {
        let doc = Document::from_bytes("bad.pdf", DocumentKind::Pdf, b"%PDF-1.4 garbage".to_vec());
        assert!(matches!(doc.page_texts(), Err(DocumentError::Pdf(_))));
        assert!(matches!(doc.page_texts(), Err(DocumentError::Pdf(_))));
    }

    #[test]
    fn in_memory_document_gets_temporary_copy() {
        let doc = Document::from_text("not-on-disk/report.txt", "6a Male");
        let copy = doc.disk_path().unwrap();
        let path = copy.path().to_path_buf();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "6a Male");
        assert_eq!(path.extension().unwrap(), "txt");
        drop(copy);
        assert!(!path.exists());
    }

    #[test]
    fn in_memory_bytes_win_over_same_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "on disk").unwrap();

        let doc = Document::from_bytes(&path, DocumentKind::Text, b"in memory".to_vec());
        let copy = doc.disk_path().unwrap();
        assert_ne!(copy.path(), path.as_path());
        assert_eq!(std::fs::read_to_string(copy.path()).unwrap(), "in memory");

        let loaded = Document::load(&path).unwrap();
        assert_eq!(loaded.disk_path().unwrap().path(), path.as_path());
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let err = Document::load(Path::new("/tmp/whatever.docx")).unwrap_err();
        assert!(matches!(err, DocumentError::Unsupported(_)));
    }

    #[test]
    fn collect_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.txt", "skip.docx", "c.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let files = collect_inputs(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, ["a.txt", "b.pdf", "c.png"]);

        let single = dir.path().join("a.txt");
        assert_eq!(collect_inputs(&single).unwrap(), vec![single]);
    }
}
