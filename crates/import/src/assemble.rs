//! Turn anchored rows into finished, fixed-shape sections.
//!
//! Rows are collected into a [`PartialSection`] keyed by row code. Only a
//! partial section holding every required code can be finished; anything
//! less is "not found", never a partially filled section.

use std::collections::BTreeMap;

use gmpricing_core::{
    expand_year, month_from_name, month_name, parse_number, CanonicalSection, CensusRow,
    CensusSection, ColumnKey, MemberClaimsRow, MemberClaimsSection, MonthRow,
    MonthlyClaimsSection, RawTable, SectionKind, AGE_BANDS, CLAIM_CATEGORIES,
};

use crate::anchor::{match_row_code, AnchorMatch};
use crate::columns::{map_columns, ColumnMapping};
use crate::util::parse_year_token;

re!(re_iso_date, r"(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})");
re!(re_dmy_date, r"(\d{1,2})[-/.](\d{1,2})[-/.](\d{2,4})");

/// Values of one row, in canonical column order.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    Census([Option<f64>; 6]),
    Claims {
        categories: [Option<f64>; 5],
        reported_total: Option<f64>,
    },
    Month {
        month: Option<String>,
        year: Option<i32>,
        value: Option<f64>,
    },
}

impl RowValues {
    fn fits(&self, kind: SectionKind) -> bool {
        match self {
            RowValues::Census(_) => kind.is_census(),
            RowValues::Claims { .. } => kind == SectionKind::ClaimsByMemberType,
            RowValues::Month { .. } => kind == SectionKind::ClaimsByServiceMonth,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PartialSection {
    kind: SectionKind,
    rows: BTreeMap<&'static str, RowValues>,
}

impl PartialSection {
    pub fn new(kind: SectionKind) -> Self {
        Self { kind, rows: BTreeMap::new() }
    }

    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    /// Record a row. The first occurrence of a code wins; codes outside the
    /// section and values of the wrong shape are refused.
    pub fn insert(&mut self, code: &str, values: RowValues) -> bool {
        let Some(spec) = self.kind.row_spec(code) else {
            return false;
        };
        if !values.fits(self.kind) || self.rows.contains_key(spec.code) {
            return false;
        }
        self.rows.insert(spec.code, values);
        true
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rows.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn missing_codes(&self) -> Vec<&'static str> {
        self.kind.required_codes().filter(|c| !self.rows.contains_key(c)).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.kind.required_codes().all(|c| self.rows.contains_key(c))
    }

    /// Emit the canonical section in fixed code order with totals computed,
    /// or `None` if any required code is missing.
    pub fn finish(mut self) -> Option<CanonicalSection> {
        if !self.is_complete() {
            return None;
        }
        let kind = self.kind;
        let present = kind.rows().iter().filter_map(|spec| Some((spec, self.rows.remove(spec.code)?)));

        let section = match kind {
            SectionKind::CensusBeginning | SectionKind::CensusEnd => {
                let rows = present
                    .filter_map(|(spec, v)| match v {
                        RowValues::Census(bands) => Some(CensusRow::new(spec.code, spec.label, bands)),
                        _ => None,
                    })
                    .collect();
                CanonicalSection::Census(CensusSection { kind, rows })
            }
            SectionKind::ClaimsByMemberType => {
                let rows = present
                    .filter_map(|(spec, v)| match v {
                        RowValues::Claims { categories, reported_total } => {
                            Some(MemberClaimsRow::new(spec.code, spec.label, categories, reported_total))
                        }
                        _ => None,
                    })
                    .collect();
                CanonicalSection::MemberClaims(MemberClaimsSection { rows })
            }
            SectionKind::ClaimsByServiceMonth => {
                let rows = present
                    .filter_map(|(spec, v)| match v {
                        RowValues::Month { month, year, value } => {
                            Some(MonthRow { code: spec.code.to_string(), month, year, value })
                        }
                        _ => None,
                    })
                    .collect();
                CanonicalSection::MonthlyClaims(MonthlyClaimsSection::new(rows))
            }
        };
        Some(section)
    }
}

/// Assemble `kind` from one candidate table.
///
/// Rows are read top to bottom. A row carrying a code of this section is
/// read through the most recent header row with sufficient column coverage;
/// coded rows seen before any such header are ignored.
pub fn assemble(kind: SectionKind, table: &RawTable) -> Option<CanonicalSection> {
    let codes = kind.codes();
    let mut partial = PartialSection::new(kind);
    let mut mapping: Option<ColumnMapping> = None;

    for row in &table.rows {
        if let Some(anchor) = match_row_code(row, &codes) {
            if let Some(m) = &mapping {
                partial.insert(anchor.code, row_values(kind, m, row, &anchor));
            }
            continue;
        }
        let candidate = map_columns(kind, row);
        if candidate.is_sufficient(kind) {
            mapping = Some(candidate);
        }
    }

    if !partial.is_empty() && !partial.is_complete() {
        tracing::trace!(
            table = %table.origin(),
            section = %kind,
            missing = ?partial.missing_codes(),
            "incomplete candidate"
        );
    }
    partial.finish()
}

fn row_values(kind: SectionKind, mapping: &ColumnMapping, row: &[String], anchor: &AnchorMatch) -> RowValues {
    let cell = |key: ColumnKey| mapping.index(key).and_then(|i| row.get(i)).map(String::as_str);
    let number = |key: ColumnKey| cell(key).and_then(parse_number);

    match kind {
        SectionKind::CensusBeginning | SectionKind::CensusEnd => RowValues::Census(AGE_BANDS.map(number)),
        SectionKind::ClaimsByMemberType => RowValues::Claims {
            categories: CLAIM_CATEGORIES.map(number),
            reported_total: number(ColumnKey::ClaimsTotal),
        },
        SectionKind::ClaimsByServiceMonth => {
            let month_cell = cell(ColumnKey::Month).map(str::trim).unwrap_or_default();
            let parsed = parse_month(month_cell).or_else(|| parse_month(&anchor.label));
            let month = match parsed {
                Some((m, _)) => month_name(m).map(str::to_string),
                None if !month_cell.is_empty() => Some(month_cell.to_string()),
                None => None,
            };
            let year = cell(ColumnKey::Year)
                .and_then(parse_year_cell)
                .or_else(|| parsed.and_then(|(_, y)| y));
            RowValues::Month { month, year, value: number(ColumnKey::Value) }
        }
    }
}

fn parse_year_cell(text: &str) -> Option<i32> {
    let t = text.trim();
    if let Some(y) = parse_year_token(t) {
        return Some(y);
    }
    match t.parse::<i32>() {
        Ok(y) if (0..100).contains(&y) && t.len() == 2 => Some(expand_year(y)),
        _ => None,
    }
}

/// Month number and, when present, year from a month cell: `"January"`,
/// `"Jan-23"`, `"March 2023"`, `"31/01/2023"` (day first) or `"2023-01-31"`.
pub(crate) fn parse_month(text: &str) -> Option<(u32, Option<i32>)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(c) = re_iso_date().captures(text) {
        let month: u32 = c[2].parse().ok()?;
        if (1..=12).contains(&month) {
            return Some((month, c[1].parse().ok()));
        }
    }
    if let Some(c) = re_dmy_date().captures(text) {
        let month: u32 = c[2].parse().ok()?;
        if (1..=12).contains(&month) {
            return Some((month, c[3].parse().ok().map(expand_year)));
        }
    }

    let tokens: Vec<&str> = text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).collect();
    let pos = tokens.iter().position(|t| month_from_name(t).is_some())?;
    let month = month_from_name(tokens[pos])?;
    let year = tokens.iter().find_map(|t| parse_year_token(t)).or_else(|| {
        let next = tokens.get(pos + 1)?;
        (next.len() == 2).then(|| next.parse().ok().map(expand_year)).flatten()
    });
    Some((month, year))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn census_table(rows: &[[&str; 7]]) -> RawTable {
        let mut all = vec![vec!["code", "0-15", "16-25", "26-35", "36-50", "51-65", "Over 65"]];
        all.extend(rows.iter().map(|r| r.to_vec()));
        RawTable::from_rows("test", 1, all)
    }

    const MALE: [&str; 7] = ["6a male", "10", "20", "30", "40", "50", "60"];
    const SINGLE: [&str; 7] = ["6b single females", "1", "2", "3", "4", "5", "6"];
    const MARRIED: [&str; 7] = ["6c married females", "7", "8", "9", "10", "11", "12"];

    #[test]
    fn census_end_to_end() {
        let table = census_table(&[MALE, SINGLE, MARRIED]);
        let Some(CanonicalSection::Census(s)) = assemble(SectionKind::CensusBeginning, &table) else {
            panic!("census not assembled");
        };
        assert_eq!(s.rows.len(), 3);
        assert_eq!(s.rows[0].label, "Male");
        assert_eq!(s.rows[0].total, 210.0);
        assert_eq!(s.rows[1].total, 21.0);
        assert_eq!(s.rows[2].total, 57.0);
    }

    #[test]
    fn output_order_ignores_source_order() {
        let table = census_table(&[MARRIED, MALE, SINGLE]);
        let section = assemble(SectionKind::CensusBeginning, &table).unwrap();
        assert_eq!(section.codes(), ["6a", "6b", "6c"]);
    }

    #[test]
    fn missing_required_code_is_not_found() {
        let table = census_table(&[MALE, MARRIED]);
        assert_eq!(assemble(SectionKind::CensusBeginning, &table), None);
        assert_eq!(assemble(SectionKind::CensusEnd, &table), None);
    }

    #[test]
    fn rows_before_a_header_are_ignored() {
        let table = RawTable::from_rows(
            "test",
            1,
            [
                MALE.to_vec(),
                vec!["code", "0-15", "16-25", "26-35", "36-50", "51-65", "Over 65"],
                SINGLE.to_vec(),
                MARRIED.to_vec(),
            ],
        );
        assert_eq!(assemble(SectionKind::CensusBeginning, &table), None);
    }

    #[test]
    fn malformed_cells_become_none() {
        let row = ["6a male", "10", "n/a", "-", "", "50", "1,000"];
        let table = census_table(&[row, SINGLE, MARRIED]);
        let Some(CanonicalSection::Census(s)) = assemble(SectionKind::CensusBeginning, &table) else {
            panic!("census not assembled");
        };
        assert_eq!(s.rows[0].bands, [Some(10.0), None, None, None, Some(50.0), Some(1000.0)]);
        assert_eq!(s.rows[0].total, 1060.0);
    }

    #[test]
    fn claims_keep_reported_total() {
        let table = RawTable::from_rows(
            "test",
            1,
            [
                vec!["", "", "IP", "OP", "Pharmacy", "Dental", "Optical", "Totals"],
                vec!["8a", "Employee", "100", "50", "25", "0", "5", "180"],
                vec!["8b", "Spouse", "10", "10", "10", "10", "10", "55"],
                vec!["8c", "Dependents", "1", "1", "1", "1", "1", "5"],
                vec!["8d", "Totals", "111", "61", "36", "11", "16", "235"],
            ],
        );
        let Some(CanonicalSection::MemberClaims(s)) = assemble(SectionKind::ClaimsByMemberType, &table) else {
            panic!("claims not assembled");
        };
        assert_eq!(s.rows[0].total, 180.0);
        assert_eq!(s.rows[1].total, 50.0);
        assert_eq!(s.rows[1].reported_total, Some(55.0));
        assert_eq!(s.rows[3].label, "Totals");
    }

    #[test]
    fn month_series_with_optional_thirteenth_month() {
        let mut rows = vec![vec!["Code".to_string(), "Month ending date".into(), "Year".into(), "Value (AED)".into()]];
        for (i, name) in ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"]
            .iter()
            .enumerate()
        {
            let code = format!("17{}", (b'a' + i as u8) as char);
            rows.push(vec![code, name.to_string(), "2023".into(), format!("{}", (i + 1) * 100)]);
        }
        let table = RawTable::new("test", 1, 0, rows.clone());
        let Some(CanonicalSection::MonthlyClaims(s)) = assemble(SectionKind::ClaimsByServiceMonth, &table) else {
            panic!("months not assembled");
        };
        assert_eq!(s.rows.len(), 12);
        assert_eq!(s.rows[0].month.as_deref(), Some("January"));
        assert_eq!(s.rows[11].year, Some(2023));
        assert_eq!(s.total, 7800.0);

        rows.push(vec!["17m".into(), "31/01/2024".into(), "".into(), "50".into()]);
        let table = RawTable::new("test", 1, 0, rows);
        let Some(CanonicalSection::MonthlyClaims(s)) = assemble(SectionKind::ClaimsByServiceMonth, &table) else {
            panic!("months not assembled");
        };
        assert_eq!(s.rows.len(), 13);
        assert_eq!(s.rows[12].month.as_deref(), Some("January"));
        assert_eq!(s.rows[12].year, Some(2024));
        assert_eq!(s.total, 7850.0);
    }

    #[test]
    fn first_occurrence_of_a_code_wins() {
        let mut partial = PartialSection::new(SectionKind::CensusEnd);
        assert!(partial.insert("7a", RowValues::Census([Some(1.0); 6])));
        assert!(!partial.insert("7a", RowValues::Census([Some(2.0); 6])));
        assert!(!partial.insert("6a", RowValues::Census([Some(2.0); 6])));
        assert!(!partial.insert("7b", RowValues::Month { month: None, year: None, value: None }));
        assert_eq!(partial.missing_codes(), ["7b", "7c"]);
    }

    #[test]
    fn month_cell_formats() {
        assert_eq!(parse_month("January"), Some((1, None)));
        assert_eq!(parse_month("Jan-23"), Some((1, Some(2023))));
        assert_eq!(parse_month("March 2023"), Some((3, Some(2023))));
        assert_eq!(parse_month("31/01/2023"), Some((1, Some(2023))));
        assert_eq!(parse_month("2023-02-28"), Some((2, Some(2023))));
        assert_eq!(parse_month("31-Dec-2022"), Some((12, Some(2022))));
        assert_eq!(parse_month("TOTAL"), None);
        assert_eq!(parse_month(""), None);
    }
}
