//! Fixed schemas of the four DHA report sections: which row codes anchor
//! each section and which canonical columns it carries.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    CensusBeginning,
    CensusEnd,
    ClaimsByMemberType,
    ClaimsByServiceMonth,
}

/// One logical row of a section, identified by its permanent code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpec {
    pub code: &'static str,
    pub label: &'static str,
    /// A section is found only once every required code has been located.
    pub required: bool,
}

const fn row(code: &'static str, label: &'static str) -> RowSpec {
    RowSpec { code, label, required: true }
}

static CENSUS_BEGINNING_ROWS: [RowSpec; 3] = [
    row("6a", "Male"),
    row("6b", "Single females"),
    row("6c", "Married females"),
];

static CENSUS_END_ROWS: [RowSpec; 3] = [
    row("7a", "Male"),
    row("7b", "Single females"),
    row("7c", "Married females"),
];

static MEMBER_TYPE_ROWS: [RowSpec; 4] = [
    row("8a", "Employee"),
    row("8b", "Spouse"),
    row("8c", "Dependents"),
    row("8d", "Totals"),
];

static SERVICE_MONTH_ROWS: [RowSpec; 13] = [
    row("17a", "Month 1"),
    row("17b", "Month 2"),
    row("17c", "Month 3"),
    row("17d", "Month 4"),
    row("17e", "Month 5"),
    row("17f", "Month 6"),
    row("17g", "Month 7"),
    row("17h", "Month 8"),
    row("17i", "Month 9"),
    row("17j", "Month 10"),
    row("17k", "Month 11"),
    row("17l", "Month 12"),
    RowSpec { code: "17m", label: "Month 13", required: false },
];

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::CensusBeginning,
        SectionKind::CensusEnd,
        SectionKind::ClaimsByMemberType,
        SectionKind::ClaimsByServiceMonth,
    ];

    pub fn title(self) -> &'static str {
        match self {
            SectionKind::CensusBeginning => "Population census (at beginning of reporting period)",
            SectionKind::CensusEnd => "Population census (at end of reporting period)",
            SectionKind::ClaimsByMemberType => "Claims data by member type (value AED)",
            SectionKind::ClaimsByServiceMonth => "Total claims processed per service month",
        }
    }

    /// File-name friendly identifier, also accepted by [`FromStr`](std::str::FromStr).
    pub fn slug(self) -> &'static str {
        match self {
            SectionKind::CensusBeginning => "census_beginning",
            SectionKind::CensusEnd => "census_end",
            SectionKind::ClaimsByMemberType => "claims_by_member_type",
            SectionKind::ClaimsByServiceMonth => "claims_by_service_month",
        }
    }

    /// Rows in canonical output order.
    pub fn rows(self) -> &'static [RowSpec] {
        match self {
            SectionKind::CensusBeginning => &CENSUS_BEGINNING_ROWS,
            SectionKind::CensusEnd => &CENSUS_END_ROWS,
            SectionKind::ClaimsByMemberType => &MEMBER_TYPE_ROWS,
            SectionKind::ClaimsByServiceMonth => &SERVICE_MONTH_ROWS,
        }
    }

    pub fn codes(self) -> Vec<&'static str> {
        self.rows().iter().map(|r| r.code).collect()
    }

    pub fn required_codes(self) -> impl Iterator<Item = &'static str> {
        self.rows().iter().filter(|r| r.required).map(|r| r.code)
    }

    pub fn row_spec(self, code: &str) -> Option<&'static RowSpec> {
        self.rows().iter().find(|r| r.code == code)
    }

    /// Canonical columns a source table is mapped onto.
    pub fn columns(self) -> &'static [ColumnKey] {
        match self {
            SectionKind::CensusBeginning | SectionKind::CensusEnd => &AGE_BANDS,
            SectionKind::ClaimsByMemberType => &CLAIM_COLUMNS,
            SectionKind::ClaimsByServiceMonth => &MONTH_COLUMNS,
        }
    }

    /// Minimum number of mapped columns for a table to be usable.
    pub fn min_column_coverage(self) -> usize {
        match self {
            SectionKind::CensusBeginning | SectionKind::CensusEnd => 5,
            SectionKind::ClaimsByMemberType => 3,
            SectionKind::ClaimsByServiceMonth => 3,
        }
    }

    pub fn is_census(self) -> bool {
        matches!(self, SectionKind::CensusBeginning | SectionKind::CensusEnd)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for SectionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| format!("Unknown section: '{s}'"))
    }
}

// ── Columns ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKey {
    Age0To15,
    Age16To25,
    Age26To35,
    Age36To50,
    Age51To65,
    AgeOver65,
    Inpatient,
    Outpatient,
    Pharmacy,
    Dental,
    Optical,
    ClaimsTotal,
    Month,
    Year,
    Value,
}

pub const AGE_BANDS: [ColumnKey; 6] = [
    ColumnKey::Age0To15,
    ColumnKey::Age16To25,
    ColumnKey::Age26To35,
    ColumnKey::Age36To50,
    ColumnKey::Age51To65,
    ColumnKey::AgeOver65,
];

pub const CLAIM_CATEGORIES: [ColumnKey; 5] = [
    ColumnKey::Inpatient,
    ColumnKey::Outpatient,
    ColumnKey::Pharmacy,
    ColumnKey::Dental,
    ColumnKey::Optical,
];

const CLAIM_COLUMNS: [ColumnKey; 6] = [
    ColumnKey::Inpatient,
    ColumnKey::Outpatient,
    ColumnKey::Pharmacy,
    ColumnKey::Dental,
    ColumnKey::Optical,
    ColumnKey::ClaimsTotal,
];

pub const MONTH_COLUMNS: [ColumnKey; 3] = [ColumnKey::Month, ColumnKey::Year, ColumnKey::Value];

impl ColumnKey {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKey::Age0To15 => "0-15",
            ColumnKey::Age16To25 => "16-25",
            ColumnKey::Age26To35 => "26-35",
            ColumnKey::Age36To50 => "36-50",
            ColumnKey::Age51To65 => "51-65",
            ColumnKey::AgeOver65 => "Over 65",
            ColumnKey::Inpatient => "IP",
            ColumnKey::Outpatient => "OP",
            ColumnKey::Pharmacy => "Pharmacy",
            ColumnKey::Dental => "Dental",
            ColumnKey::Optical => "Optical",
            ColumnKey::ClaimsTotal => "Totals",
            ColumnKey::Month => "Month",
            ColumnKey::Year => "Year",
            ColumnKey::Value => "Value",
        }
    }

    /// Inclusive age range of a band; `None` upper bound for the open band.
    pub fn age_range(self) -> Option<(u32, Option<u32>)> {
        match self {
            ColumnKey::Age0To15 => Some((0, Some(15))),
            ColumnKey::Age16To25 => Some((16, Some(25))),
            ColumnKey::Age26To35 => Some((26, Some(35))),
            ColumnKey::Age36To50 => Some((36, Some(50))),
            ColumnKey::Age51To65 => Some((51, Some(65))),
            ColumnKey::AgeOver65 => Some((65, None)),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
