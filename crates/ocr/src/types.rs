use serde::{Deserialize, Serialize};

/// Pixel-space box of a recognized word, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    pub fn center_y(&self) -> f32 {
        self.top as f32 + self.height as f32 / 2.0
    }
}

/// A single word from box-level OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    pub bbox: BoundingBox,
    /// Engine confidence in this word (0.0–100.0).
    pub confidence: f32,
}

impl OcrWord {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self { text: text.into(), bbox, confidence: confidence.clamp(0.0, 100.0) }
    }
}

/// One reconstructed text line, words ordered left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    /// Top edge of the highest word; used to keep lines in reading order.
    pub top: u32,
    /// Mean word confidence; `None` for line-level OCR output.
    pub confidence: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_clamps_confidence() {
        let w = OcrWord::new("6a", BoundingBox::new(0, 0, 10, 10), 140.0);
        assert_eq!(w.confidence, 100.0);
        let w = OcrWord::new("6a", BoundingBox::new(0, 0, 10, 10), -1.0);
        assert_eq!(w.confidence, 0.0);
    }

    #[test]
    fn center_y_is_mid_height() {
        assert_eq!(BoundingBox::new(5, 10, 4, 20).center_y(), 20.0);
    }
}
