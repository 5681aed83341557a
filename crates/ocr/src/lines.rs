//! Rebuild text lines from box-level OCR output.

use crate::types::{OcrLine, OcrWord};

/// Group words into lines by vertical proximity.
///
/// Two words share a line when their vertical centers are within half the
/// median word height. Lines come back top-to-bottom, words left-to-right.
pub fn group_into_lines(words: &[OcrWord]) -> Vec<OcrLine> {
    let mut words: Vec<&OcrWord> = words.iter().filter(|w| !w.text.trim().is_empty()).collect();
    if words.is_empty() {
        return Vec::new();
    }

    let tolerance = median_height(&words) / 2.0;
    words.sort_by(|a, b| a.bbox.center_y().total_cmp(&b.bbox.center_y()));

    let mut groups: Vec<Vec<&OcrWord>> = Vec::new();
    let mut anchor_y = f32::NEG_INFINITY;
    for word in words {
        let y = word.bbox.center_y();
        match groups.last_mut() {
            Some(group) if (y - anchor_y).abs() <= tolerance => {
                group.push(word);
                // Track the running mean so slightly skewed scans still join.
                anchor_y += (y - anchor_y) / group.len() as f32;
            }
            _ => {
                groups.push(vec![word]);
                anchor_y = y;
            }
        }
    }

    groups
        .into_iter()
        .map(|mut group| {
            group.sort_by_key(|w| w.bbox.left);
            let text = group.iter().map(|w| w.text.trim()).collect::<Vec<_>>().join(" ");
            let top = group.iter().map(|w| w.bbox.top).min().unwrap_or(0);
            let confidence = group.iter().map(|w| w.confidence).sum::<f32>() / group.len() as f32;
            OcrLine { text, top, confidence: Some(confidence) }
        })
        .collect()
}

/// Line-oriented OCR fallback: split plain text on newlines.
pub fn lines_from_text(text: &str) -> Vec<OcrLine> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(i, l)| OcrLine { text: l.to_string(), top: i as u32, confidence: None })
        .collect()
}

fn median_height(words: &[&OcrWord]) -> f32 {
    let mut heights: Vec<u32> = words.iter().map(|w| w.bbox.height).collect();
    heights.sort_unstable();
    heights[heights.len() / 2].max(1) as f32
}
