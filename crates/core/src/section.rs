//! Finished, fixed-shape output tables. Values are only ever built through
//! the constructors here so totals stay consistent with their rows.

use serde::{Deserialize, Serialize};

use crate::normalize::format_number;
use crate::schema::{SectionKind, AGE_BANDS, CLAIM_CATEGORIES};

fn sum_present(values: &[Option<f64>]) -> f64 {
    values.iter().map(|v| v.unwrap_or(0.0)).sum()
}

fn cell(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_default()
}

// ── Population census ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusRow {
    pub code: String,
    pub label: String,
    /// Member counts in [`AGE_BANDS`] order.
    pub bands: [Option<f64>; 6],
    pub total: f64,
}

impl CensusRow {
    pub fn new(code: impl Into<String>, label: impl Into<String>, bands: [Option<f64>; 6]) -> Self {
        let total = sum_present(&bands);
        Self { code: code.into(), label: label.into(), bands, total }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusSection {
    pub kind: SectionKind,
    pub rows: Vec<CensusRow>,
}

impl CensusSection {
    /// Members across all rows and bands.
    pub fn member_total(&self) -> f64 {
        self.rows.iter().map(|r| r.total).sum()
    }
}

// ── Claims by member type ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberClaimsRow {
    pub code: String,
    pub label: String,
    /// Claim values in [`CLAIM_CATEGORIES`] order.
    pub categories: [Option<f64>; 5],
    /// The "Totals" column as printed in the source, kept for validation.
    pub reported_total: Option<f64>,
    pub total: f64,
}

impl MemberClaimsRow {
    pub fn new(
        code: impl Into<String>,
        label: impl Into<String>,
        categories: [Option<f64>; 5],
        reported_total: Option<f64>,
    ) -> Self {
        let total = sum_present(&categories);
        Self { code: code.into(), label: label.into(), categories, reported_total, total }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberClaimsSection {
    pub rows: Vec<MemberClaimsRow>,
}

// ── Claims per service month ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRow {
    pub code: String,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyClaimsSection {
    pub rows: Vec<MonthRow>,
    /// Synthetic TOTAL row: sum of every month's value.
    pub total: f64,
}

impl MonthlyClaimsSection {
    pub fn new(rows: Vec<MonthRow>) -> Self {
        let total = rows.iter().map(|r| r.value.unwrap_or(0.0)).sum();
        Self { rows, total }
    }
}

// ── Section enum ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalSection {
    Census(CensusSection),
    MemberClaims(MemberClaimsSection),
    MonthlyClaims(MonthlyClaimsSection),
}

impl CanonicalSection {
    pub fn kind(&self) -> SectionKind {
        match self {
            CanonicalSection::Census(s) => s.kind,
            CanonicalSection::MemberClaims(_) => SectionKind::ClaimsByMemberType,
            CanonicalSection::MonthlyClaims(_) => SectionKind::ClaimsByServiceMonth,
        }
    }

    /// Row codes in output order (the synthetic TOTAL row has no code).
    pub fn codes(&self) -> Vec<&str> {
        match self {
            CanonicalSection::Census(s) => s.rows.iter().map(|r| r.code.as_str()).collect(),
            CanonicalSection::MemberClaims(s) => s.rows.iter().map(|r| r.code.as_str()).collect(),
            CanonicalSection::MonthlyClaims(s) => s.rows.iter().map(|r| r.code.as_str()).collect(),
        }
    }

    /// Fixed column header for export.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["Code".to_string()];
        match self {
            CanonicalSection::Census(_) => {
                header.push("Category".into());
                header.extend(AGE_BANDS.iter().map(|b| b.label().to_string()));
                header.push("Total".into());
            }
            CanonicalSection::MemberClaims(_) => {
                header.push("Member type".into());
                header.extend(CLAIM_CATEGORIES.iter().map(|c| c.label().to_string()));
                header.push("Totals".into());
            }
            CanonicalSection::MonthlyClaims(_) => {
                header.extend(["Month".to_string(), "Year".to_string(), "Value".to_string()]);
            }
        }
        header
    }

    /// Rows rendered as strings, in the same order as [`header`](Self::header).
    pub fn records(&self) -> Vec<Vec<String>> {
        match self {
            CanonicalSection::Census(s) => s
                .rows
                .iter()
                .map(|r| {
                    let mut rec = vec![r.code.clone(), r.label.clone()];
                    rec.extend(r.bands.iter().map(|v| cell(*v)));
                    rec.push(format_number(r.total));
                    rec
                })
                .collect(),
            CanonicalSection::MemberClaims(s) => s
                .rows
                .iter()
                .map(|r| {
                    let mut rec = vec![r.code.clone(), r.label.clone()];
                    rec.extend(r.categories.iter().map(|v| cell(*v)));
                    rec.push(format_number(r.total));
                    rec
                })
                .collect(),
            CanonicalSection::MonthlyClaims(s) => {
                let mut recs: Vec<Vec<String>> = s
                    .rows
                    .iter()
                    .map(|r| {
                        vec![
                            r.code.clone(),
                            r.month.clone().unwrap_or_default(),
                            r.year.map(|y| y.to_string()).unwrap_or_default(),
                            cell(r.value),
                        ]
                    })
                    .collect();
                recs.push(vec![
                    String::new(),
                    "TOTAL".to_string(),
                    String::new(),
                    format_number(s.total),
                ]);
                recs
            }
        }
    }
}
