use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive date range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl ReportingPeriod {
    /// Returns `None` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(ReportingPeriod { start, end })
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar months touched by the period, counting both ends.
    pub fn month_span(self) -> u32 {
        let months = (self.end.year() - self.start.year()) * 12 + self.end.month() as i32
            - self.start.month() as i32;
        months.max(0) as u32 + 1
    }
}

const MONTH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// Resolve a month name or three-letter abbreviation (`"Sept"`, `"jan."`)
/// to its number.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.trim().trim_end_matches('.').to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|m| *m == lower || (lower.len() <= m.len() && m.starts_with(lower.as_str())))
        .map(|i| i as u32 + 1)
}

/// Canonical display name of a month number (1–12).
pub fn month_name(month: u32) -> Option<&'static str> {
    const DISPLAY: [&str; 12] = [
        "January", "February", "March", "April", "May", "June",
        "July", "August", "September", "October", "November", "December",
    ];
    DISPLAY.get(month.checked_sub(1)? as usize).copied()
}

/// Expand a two-digit year the way report templates write them (`"23"` → 2023).
pub fn expand_year(y: i32) -> i32 {
    if y < 100 { 2000 + y } else { y }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn period_rejects_inverted_range() {
        assert!(ReportingPeriod::new(d(2024, 1, 1), d(2023, 12, 31)).is_none());
        assert!(ReportingPeriod::new(d(2024, 1, 1), d(2024, 1, 1)).is_some());
    }

    #[test]
    fn period_contains_is_inclusive() {
        let p = ReportingPeriod::new(d(2023, 1, 1), d(2023, 12, 31)).unwrap();
        assert!(p.contains(d(2023, 1, 1)));
        assert!(p.contains(d(2023, 12, 31)));
        assert!(!p.contains(d(2024, 1, 1)));
    }

    #[test]
    fn period_month_span() {
        let p = ReportingPeriod::new(d(2023, 1, 1), d(2023, 12, 31)).unwrap();
        assert_eq!(p.month_span(), 12);
        let p = ReportingPeriod::new(d(2023, 1, 15), d(2024, 1, 14)).unwrap();
        assert_eq!(p.month_span(), 13);
    }

    #[test]
    fn period_display() {
        let p = ReportingPeriod::new(d(2023, 1, 1), d(2023, 12, 31)).unwrap();
        assert_eq!(p.to_string(), "2023-01-01 to 2023-12-31");
    }

    #[test]
    fn month_names_and_abbreviations() {
        assert_eq!(month_from_name("January"), Some(1));
        assert_eq!(month_from_name("sep"), Some(9));
        assert_eq!(month_from_name("Sept."), Some(9));
        assert_eq!(month_from_name("DEC"), Some(12));
        assert_eq!(month_from_name("ma"), None);
        assert_eq!(month_from_name("male"), None);
        assert_eq!(month_from_name("total"), None);
    }

    #[test]
    fn month_name_display() {
        assert_eq!(month_name(1), Some("January"));
        assert_eq!(month_name(12), Some("December"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn two_digit_years_expand() {
        assert_eq!(expand_year(23), 2023);
        assert_eq!(expand_year(2023), 2023);
    }
}
