use std::process::{Command, Stdio};

use serde::Serialize;

/// External tools the extraction pipeline can use, probed once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub pdftotext: bool,
    pub pdftoppm: bool,
    pub tesseract: bool,
}

impl Capabilities {
    pub fn probe() -> Self {
        let caps = Self {
            pdftotext: command_available("pdftotext"),
            pdftoppm: command_available("pdftoppm"),
            tesseract: command_available("tesseract"),
        };
        tracing::debug!(?caps, "probed external tools");
        caps
    }

    /// Every capability off; engines and the OCR path that need tools skip.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn can_ocr_images(&self) -> bool {
        self.tesseract
    }

    pub fn can_ocr_pdfs(&self) -> bool {
        self.tesseract && self.pdftoppm
    }
}

/// True when `name` can be spawned. Poppler tools print their version with
/// `-v`, tesseract with `--version`; either exit status is fine, only a
/// spawn failure counts as missing.
pub fn command_available(name: &str) -> bool {
    let flag = if name == "tesseract" { "--version" } else { "-v" };
    Command::new(name)
        .arg(flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_is_unavailable() {
        assert!(!command_available("gmpricing-definitely-not-installed"));
    }

    #[test]
    fn ocr_needs_rasterizer_for_pdfs() {
        let caps = Capabilities { pdftotext: false, pdftoppm: false, tesseract: true };
        assert!(caps.can_ocr_images());
        assert!(!caps.can_ocr_pdfs());
        assert!(!Capabilities::none().can_ocr_images());
    }
}
