//! Plausibility checks on resolved sections. Issues are warnings only; a
//! section with issues is still reported.

use chrono::{Days, Months, NaiveDate};
use gmpricing_core::{
    month_from_name, CanonicalSection, CensusSection, MemberClaimsSection, MonthRow, ReportingPeriod, SectionKind,
    CLAIM_CATEGORIES,
};
use serde::Serialize;

use crate::orchestrator::ResolvedSections;

/// Largest accepted gap between a printed total and the computed one.
const TOTAL_TOLERANCE: f64 = 1.0;
/// Census change between beginning and end of period flagged above this share.
const CENSUS_MOVEMENT_LIMIT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub section: SectionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    fn new(section: SectionKind, code: Option<&str>, message: impl Into<String>) -> Self {
        Self { section, code: code.map(str::to_string), message: message.into() }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} {}: {}", self.section, code, self.message),
            None => write!(f, "{}: {}", self.section, self.message),
        }
    }
}

pub fn validate(sections: &ResolvedSections) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (kind, resolved) in sections {
        match &resolved.section {
            CanonicalSection::Census(census) => check_census(*kind, census, &mut issues),
            CanonicalSection::MemberClaims(claims) => {
                for row in &claims.rows {
                    if row.categories.iter().flatten().any(|v| *v < 0.0) {
                        issues.push(ValidationIssue::new(*kind, Some(&row.code), "negative claim value"));
                    }
                    if let Some(reported) = row.reported_total {
                        if (reported - row.total).abs() > TOTAL_TOLERANCE {
                            issues.push(ValidationIssue::new(
                                *kind,
                                Some(&row.code),
                                format!("reported total {reported} differs from computed total {}", row.total),
                            ));
                        }
                    }
                }
                check_totals_row(*kind, claims, &mut issues);
            }
            CanonicalSection::MonthlyClaims(months) => {
                for row in &months.rows {
                    if row.value.is_some_and(|v| v < 0.0) {
                        issues.push(ValidationIssue::new(*kind, Some(&row.code), "negative monthly value"));
                    }
                }
                for pair in months.rows.windows(2) {
                    if let (Some(a), Some(b)) = (pair[0].year, pair[1].year) {
                        if b < a {
                            issues.push(ValidationIssue::new(
                                *kind,
                                Some(&pair[1].code),
                                format!("year {b} follows {a}"),
                            ));
                        }
                    }
                }
            }
        }
    }

    let begin = census(sections, SectionKind::CensusBeginning);
    let end = census(sections, SectionKind::CensusEnd);
    if let (Some(begin), Some(end)) = (begin, end) {
        let (b, e) = (begin.member_total(), end.member_total());
        if b > 0.0 && ((e - b) / b).abs() > CENSUS_MOVEMENT_LIMIT {
            issues.push(ValidationIssue::new(
                SectionKind::CensusEnd,
                None,
                format!("membership moved from {b} to {e} over the period"),
            ));
        }
    }
    issues
}

/// Month rows against the reporting period: more rows than months in the
/// period, or a month lying wholly outside it.
pub fn validate_period(period: ReportingPeriod, sections: &ResolvedSections) -> Vec<ValidationIssue> {
    let kind = SectionKind::ClaimsByServiceMonth;
    let Some(CanonicalSection::MonthlyClaims(months)) = sections.get(&kind).map(|r| &r.section) else {
        return Vec::new();
    };
    let mut issues = Vec::new();
    let span = period.month_span() as usize;
    if months.rows.len() > span {
        issues.push(ValidationIssue::new(
            kind,
            None,
            format!("{} monthly rows for a {span}-month reporting period", months.rows.len()),
        ));
    }
    for row in &months.rows {
        let Some((first, last)) = month_bounds(row) else { continue };
        if !period.contains(first) && !period.contains(last) {
            issues.push(ValidationIssue::new(kind, Some(&row.code), format!("month outside reporting period {period}")));
        }
    }
    issues
}

fn month_bounds(row: &MonthRow) -> Option<(NaiveDate, NaiveDate)> {
    let month = month_from_name(row.month.as_deref()?)?;
    let first = NaiveDate::from_ymd_opt(row.year?, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.checked_sub_days(Days::new(1))?;
    Some((first, last))
}

fn census(sections: &ResolvedSections, kind: SectionKind) -> Option<&CensusSection> {
    match &sections.get(&kind)?.section {
        CanonicalSection::Census(c) => Some(c),
        _ => None,
    }
}

fn check_census(kind: SectionKind, census: &CensusSection, issues: &mut Vec<ValidationIssue>) {
    for row in &census.rows {
        if row.bands.iter().flatten().any(|v| *v < 0.0) {
            issues.push(ValidationIssue::new(kind, Some(&row.code), "negative member count"));
        }
    }
}

/// 8d should equal 8a + 8b + 8c in every category.
fn check_totals_row(
    kind: SectionKind,
    claims: &MemberClaimsSection,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some((totals, members)) = claims.rows.split_last() else {
        return;
    };
    for (i, printed) in totals.categories.iter().enumerate() {
        let Some(printed) = printed else { continue };
        let sum: f64 = members.iter().filter_map(|r| r.categories[i]).sum();
        if (printed - sum).abs() > TOTAL_TOLERANCE {
            issues.push(ValidationIssue::new(
                kind,
                Some(&totals.code),
                format!("{} total {printed} differs from member rows sum {sum}", CLAIM_CATEGORIES[i].label()),
            ));
        }
    }
}
