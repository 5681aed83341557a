//! A synthetic DHA annual report in plain text, laid out the way the text
//! layer of a real report reads, plus a matching price table.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Days, NaiveDate};

pub const REPORT_FILE: &str = "dha_sample.txt";
pub const PRICES_FILE: &str = "prices_sample.toml";

const YEAR: i32 = 2023;

const CENSUS_BEGINNING: [(&str, &str, [u32; 6]); 3] = [
    ("6a", "Male", [42, 18, 65, 71, 23, 4]),
    ("6b", "Single females", [39, 21, 30, 12, 6, 2]),
    ("6c", "Married females", [0, 9, 48, 40, 15, 3]),
];

const CENSUS_END: [(&str, &str, [u32; 6]); 3] = [
    ("7a", "Male", [45, 20, 68, 70, 25, 5]),
    ("7b", "Single females", [40, 19, 33, 13, 6, 2]),
    ("7c", "Married females", [0, 10, 50, 41, 16, 3]),
];

const MEMBER_CLAIMS: [(&str, &str, [u32; 5]); 3] = [
    ("8a", "Employee", [412_300, 268_450, 131_200, 22_800, 9_400]),
    ("8b", "Spouse", [198_750, 142_100, 70_300, 11_950, 5_200]),
    ("8c", "Dependents", [96_400, 118_900, 44_650, 8_100, 3_750]),
];

const MONTHLY: [u32; 12] = [
    118_400, 121_950, 132_700, 127_300, 119_800, 98_650, 88_400, 91_250, 125_600, 134_900, 129_350, 141_820,
];

pub const PRICE_TABLE: &str = r#"currency = "AED"
default_price = 1200

[prices]
"6a:0-15" = 950
"6a:16-25" = 1100
"6a:26-35" = 1350
"6a:36-50" = 1800
"6a:51-65" = 2900
"6a:Over 65" = 4800
"6b:0-15" = 950
"6b:16-25" = 1250
"6b:26-35" = 1600
"6b:36-50" = 2000
"6b:51-65" = 3000
"6b:Over 65" = 4900
"6c:16-25" = 2400
"6c:26-35" = 2700
"6c:36-50" = 2300
"6c:51-65" = 3100

[multipliers]
"6c" = 1.05
"#;

pub fn report_text() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dubai Health Authority");
    let _ = writeln!(out, "Health Insurance Annual Report");
    let _ = writeln!(out, "Report date: 31/03/{}", YEAR + 1);
    let _ = writeln!(out, "Reporting period from 01/01/{YEAR} to 31/12/{YEAR}");

    census(&mut out, "Population census (at beginning of reporting period)", &CENSUS_BEGINNING);
    census(&mut out, "Population census (at end of reporting period)", &CENSUS_END);

    let _ = writeln!(out, "\nClaims data by member type (value AED)");
    let _ = writeln!(
        out,
        "{:<6}{:<18}{:>10}{:>10}{:>10}{:>10}{:>10}{:>10}",
        "Code", "Member type", "IP", "OP", "Pharmacy", "Dental", "Optical", "Totals"
    );
    let mut totals = [0u32; 5];
    for (code, label, values) in MEMBER_CLAIMS {
        for (t, v) in totals.iter_mut().zip(values) {
            *t += v;
        }
        claims_line(&mut out, code, label, values);
    }
    claims_line(&mut out, "8d", "Totals", totals);

    let _ = writeln!(out, "\nTotal claims processed per service month");
    let _ = writeln!(out, "{:<6}{:<22}{:<8}{:>14}", "Code", "Month ending date", "Year", "Value (AED)");
    for (i, value) in MONTHLY.iter().enumerate() {
        let code = format!("17{}", char::from(b'a' + i as u8));
        let ending = month_end(YEAR, i as u32 + 1).map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default();
        let _ = writeln!(out, "{code:<6}{ending:<22}{YEAR:<8}{:>14}", thousands(*value));
    }
    out
}

fn census(out: &mut String, title: &str, rows: &[(&str, &str, [u32; 6])]) {
    let _ = writeln!(out, "\n{title}");
    let _ = writeln!(
        out,
        "{:<6}{:<18}{:>8}{:>8}{:>8}{:>8}{:>8}{:>9}",
        "Code", "Category", "0-15", "16-25", "26-35", "36-50", "51-65", "Over 65"
    );
    for (code, label, bands) in rows {
        let _ = write!(out, "{code:<6}{label:<18}");
        for (i, n) in bands.iter().enumerate() {
            let width = if i == 5 { 9 } else { 8 };
            let _ = write!(out, "{n:>width$}");
        }
        out.push('\n');
    }
}

fn claims_line(out: &mut String, code: &str, label: &str, values: [u32; 5]) {
    let _ = write!(out, "{code:<6}{label:<18}");
    for v in values {
        let _ = write!(out, "{:>10}", thousands(v));
    }
    let _ = writeln!(out, "{:>10}", thousands(values.iter().sum()));
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next?.checked_sub_days(Days::new(1))
}

/// `1234567` as `1,234,567`.
fn thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Write the report and price table into `dir`.
pub fn write_sample(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut written = Vec::new();
    for (name, content) in [(REPORT_FILE, report_text()), (PRICES_FILE, PRICE_TABLE.to_string())] {
        let path = dir.join(name);
        std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
