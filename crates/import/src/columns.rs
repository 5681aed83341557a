//! Map free-form table headers onto the canonical columns of a section.
//!
//! Every match is keyword or pattern based; a column is never assumed from
//! its position alone.

use std::collections::BTreeMap;

use gmpricing_core::{normalize_text, ColumnKey, SectionKind, AGE_BANDS};
use serde::Serialize;

// Headers are normalized first, so dash variants are already `-`.
re!(re_range, r"(\d{1,3})\s*(?:-|to)\s*(\d{1,3})");
re!(re_over_65, r"(?:over|above)\s*-?\s*65|65\s*\+|>\s*=?\s*65|65\s*(?:and|&)\s*(?:over|above)");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedColumn {
    pub index: usize,
    /// Header text as it appeared in the source.
    pub label: String,
}

/// Canonical column → source column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    columns: BTreeMap<ColumnKey, MappedColumn>,
}

impl ColumnMapping {
    pub fn index(&self, key: ColumnKey) -> Option<usize> {
        self.columns.get(&key).map(|c| c.index)
    }

    pub fn get(&self, key: ColumnKey) -> Option<&MappedColumn> {
        self.columns.get(&key)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColumnKey, &MappedColumn)> {
        self.columns.iter().map(|(k, v)| (*k, v))
    }

    /// Number of `kind`'s canonical columns this mapping covers.
    pub fn coverage(&self, kind: SectionKind) -> usize {
        kind.columns().iter().filter(|k| self.columns.contains_key(k)).count()
    }

    pub fn is_sufficient(&self, kind: SectionKind) -> bool {
        self.coverage(kind) >= kind.min_column_coverage()
    }
}

/// Classify one header cell for `kind`, or `None` when it names no
/// canonical column of that section.
pub fn classify_header(kind: SectionKind, header: &str) -> Option<ColumnKey> {
    let h = normalize_text(header);
    if h.is_empty() {
        return None;
    }
    match kind {
        SectionKind::CensusBeginning | SectionKind::CensusEnd => classify_age_band(&h),
        SectionKind::ClaimsByMemberType => classify_claim(&h),
        SectionKind::ClaimsByServiceMonth => classify_month_column(&h),
    }
}

fn classify_age_band(h: &str) -> Option<ColumnKey> {
    if re_over_65().is_match(h) {
        return Some(ColumnKey::AgeOver65);
    }
    let caps = re_range().captures(h)?;
    let lo: u32 = caps[1].parse().ok()?;
    let hi: u32 = caps[2].parse().ok()?;
    AGE_BANDS
        .into_iter()
        .find(|band| band.age_range() == Some((lo, Some(hi))))
}

fn classify_claim(h: &str) -> Option<ColumnKey> {
    if h.contains("total") {
        return Some(ColumnKey::ClaimsTotal);
    }
    let joined = h.replace('-', "");
    let compact = joined.replace(' ', "");
    let tokens: Vec<&str> = joined.split([' ', '/']).filter(|t| !t.is_empty()).collect();
    let has = |words: &[&str]| tokens.iter().any(|t| words.contains(t));

    if has(&["ip"]) || compact.contains("inpatient") {
        Some(ColumnKey::Inpatient)
    } else if has(&["op"]) || compact.contains("outpatient") {
        Some(ColumnKey::Outpatient)
    } else if tokens.iter().any(|t| t.contains("pharmacy")) {
        Some(ColumnKey::Pharmacy)
    } else if has(&["dental"]) {
        Some(ColumnKey::Dental)
    } else if has(&["optical", "vision"]) {
        Some(ColumnKey::Optical)
    } else {
        None
    }
}

fn classify_month_column(h: &str) -> Option<ColumnKey> {
    if (h.contains("month") && h.contains("ending")) || h.starts_with("month") {
        Some(ColumnKey::Month)
    } else if h == "year" || h.starts_with("year ") {
        Some(ColumnKey::Year)
    } else if h.contains("value") || h.contains("amount") || h.split(' ').any(|t| t == "aed") {
        Some(ColumnKey::Value)
    } else {
        None
    }
}

/// Map a header row. The first column claiming a key keeps it.
pub fn map_columns(kind: SectionKind, header: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    for (index, cell) in header.iter().enumerate() {
        if let Some(key) = classify_header(kind, cell) {
            mapping
                .columns
                .entry(key)
                .or_insert_with(|| MappedColumn { index, label: cell.trim().to_string() });
        }
    }
    mapping
}
