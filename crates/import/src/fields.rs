//! Report header fields: report date and reporting period.

use chrono::NaiveDate;
use gmpricing_core::ReportingPeriod;
use serde::Serialize;

macro_rules! date_pattern {
    () => {
        r"\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}|[A-Za-z]{3,9}\.?\s+\d{1,2},?\s+\d{4}|\d{1,2}\s+[A-Za-z]{3,9}\.?,?\s+\d{4}"
    };
}

re!(
    re_report_date,
    concat!(r"(?i)report(?:ing)?\s+date\s*[:\-]?\s*(", date_pattern!(), ")")
);
re!(
    re_period,
    concat!(
        r"(?i)(?:from|period\s*[:\-]?)\s*(",
        date_pattern!(),
        r")\s*(?:to|until|through|-|–)\s*(",
        date_pattern!(),
        ")"
    )
);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportFields {
    pub report_date: Option<NaiveDate>,
    pub period: Option<ReportingPeriod>,
}

impl ReportFields {
    /// Fill whatever is still unknown from `other`.
    pub fn or(self, other: ReportFields) -> ReportFields {
        ReportFields {
            report_date: self.report_date.or(other.report_date),
            period: self.period.or(other.period),
        }
    }
}

pub fn extract_fields(text: &str) -> ReportFields {
    let report_date = re_report_date()
        .captures(text)
        .and_then(|c| parse_date(&c[1]));
    let period = re_period().captures(text).and_then(|c| {
        let period = ReportingPeriod::new(parse_date(&c[1])?, parse_date(&c[2])?);
        if period.is_none() {
            tracing::debug!(from = &c[1], to = &c[2], "reporting period ends before it starts");
        }
        period
    });
    ReportFields { report_date, period }
}

/// Parse the date spellings found in report headers. Numeric dates with
/// the year last are read day first.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    // "Mar. 31, 2024" → "Mar 31 2024"; dots between digits stay.
    let text = text.replace(',', " ").replace(". ", " ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    const FORMATS: &[&str] = &[
        "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%y", "%d-%m-%y", "%d.%m.%y",
        "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%B %d %Y", "%d %B %Y",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(&text, f).ok())
}
