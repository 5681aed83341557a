//! Cell-level text and number normalization shared by every extraction engine.

/// Dash variants emitted by PDF text layers and OCR engines.
const DASHES: [char; 7] = ['\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', '\u{2212}'];

/// Lower-case `s`, fold dash variants to `-`, replace every character outside
/// `[a-z0-9 .+-/%>]` with a space and collapse runs of whitespace.
pub fn normalize_text(s: &str) -> String {
    let mapped: String = s
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if DASHES.contains(&c) {
                '-'
            } else if c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || matches!(c, '.' | '+' | '-' | '/' | '%' | '>')
            {
                c
            } else {
                ' '
            }
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A dash-only cell (`-`, `--`, `–`, `—`) standing in for an empty value.
pub fn is_placeholder(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty() && t.chars().all(|c| c == '-' || DASHES.contains(&c))
}

/// [`normalize_text`] over an optional cell; a missing cell normalizes to `""`.
pub fn normalize_opt(s: Option<&str>) -> String {
    s.map(normalize_text).unwrap_or_default()
}

/// Parse a numeric cell.
///
/// Thousands separators, currency codes and any other non-numeric characters
/// are dropped; a leading minus or accounting parentheses make the value
/// negative. Blank, dash-only and unparseable cells yield `None`.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (negative, body) = if trimmed.starts_with('(') && trimmed.ends_with(')') && trimmed.len() > 2 {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let mut digits = String::with_capacity(body.len());
    let mut seen_digit = false;
    let mut minus = false;
    for c in body.chars() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                digits.push(c);
            }
            '.' => digits.push(c),
            c if (c == '-' || DASHES.contains(&c)) && !seen_digit && digits.is_empty() => {
                minus = true;
            }
            _ => {}
        }
    }

    if !seen_digit {
        return None;
    }

    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative ^ minus { -value } else { value })
}

/// Render a value for CSV/table output: whole numbers without decimals,
/// everything else with two.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}
