//! DHA extraction template saved as Excel 2003 XML (SpreadsheetML).
//!
//! The template keeps its figures in the external-reference cell cache: one
//! `x:Crn` element per row, with `x:Text` / `x:Number` children per cell.
//! Row labels carry no codes there, so codes are restored from the section
//! title above each block and the canonical row label.

use chrono::NaiveDate;
use gmpricing_core::{normalize_text, RawTable, SectionKind};
use roxmltree::Node;

use super::{EngineError, ExtractionEngine};
use crate::document::{Document, DocumentKind};

const NS_EXCEL: &str = "urn:schemas-microsoft-com:office:excel";
const NS_OFFICE: &str = "urn:schemas-microsoft-com:office:office";

/// Column header the template omits for the month series.
const MONTH_HEADER: [&str; 4] = ["Code", "Year", "Month ending date", "Value"];

pub struct XmlEngine;

impl XmlEngine {
    pub const NAME: &'static str = "xml";
}

impl ExtractionEngine for XmlEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports(&self, doc: &Document) -> bool {
        doc.kind() == DocumentKind::SpreadsheetXml
    }

    fn extract(&self, doc: &Document) -> Result<Vec<RawTable>, EngineError> {
        let xml = doc.text()?;
        let tree = roxmltree::Document::parse(xml)?;
        let rows = cached_rows(&tree);
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![RawTable::new(Self::NAME, 1, 0, restore_codes(rows))])
    }
}

fn cached_rows(tree: &roxmltree::Document) -> Vec<Vec<String>> {
    tree.descendants()
        .filter(|n| n.has_tag_name((NS_EXCEL, "Crn")))
        .map(|crn| {
            crn.children()
                .filter(|c| is_cell(c))
                .map(|c| c.text().unwrap_or_default().trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect()
}

fn is_cell(node: &Node) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(NS_EXCEL)
        && matches!(node.tag_name().name(), "Text" | "Number" | "Boolean")
}

fn section_for_title(cell: &str) -> Option<SectionKind> {
    let norm = normalize_text(cell);
    SectionKind::ALL.into_iter().find(|k| {
        let title = normalize_text(k.title());
        !norm.is_empty() && (norm.starts_with(&title) || (norm.len() > 20 && title.starts_with(&norm)))
    })
}

/// Prefix each row with its code cell. Title rows become header rows; the
/// month series gets its missing header and sequential codes.
fn restore_codes(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut out = Vec::with_capacity(rows.len());
    let mut current: Option<SectionKind> = None;
    let mut next_month = 0usize;

    for row in rows {
        let first = row.first().map(String::as_str).unwrap_or_default();
        if let Some(kind) = section_for_title(first) {
            current = Some(kind);
            if kind == SectionKind::ClaimsByServiceMonth {
                next_month = 0;
                out.push(MONTH_HEADER.iter().map(|s| s.to_string()).collect());
            } else {
                out.push(prefixed("Code", row));
            }
            continue;
        }

        let code = match current {
            Some(SectionKind::ClaimsByServiceMonth) => {
                // Month rows are `[year, month ending, value]`; the TOTAL row is skipped.
                let is_month_row = row.len() == 3 && row[0].chars().all(|c| c.is_ascii_digit());
                if !is_month_row {
                    if !first.eq_ignore_ascii_case("total") {
                        out.push(row);
                    }
                    continue;
                }
                let codes = SectionKind::ClaimsByServiceMonth.codes();
                let code = codes.get(next_month).copied();
                next_month += 1;
                code
            }
            Some(kind) => code_for_label(kind, first),
            None => None,
        };

        match code {
            Some(code) => out.push(prefixed(code, row)),
            None => out.push(row),
        }
    }
    out
}

fn code_for_label(kind: SectionKind, label: &str) -> Option<&'static str> {
    let norm = normalize_text(label);
    if norm.is_empty() {
        return None;
    }
    kind.rows()
        .iter()
        .find(|spec| {
            let canon = normalize_text(spec.label);
            norm == canon || norm.starts_with(&format!("{canon} "))
        })
        .map(|spec| spec.code)
}

fn prefixed(first: &str, row: Vec<String>) -> Vec<String> {
    std::iter::once(first.to_string()).chain(row).collect()
}

/// The template's `o:Created` document property, date part only.
pub fn created_date(xml: &str) -> Option<NaiveDate> {
    let tree = roxmltree::Document::parse(xml).ok()?;
    let created = tree
        .descendants()
        .find(|n| n.has_tag_name((NS_OFFICE, "Created")))?
        .text()?;
    let date = created.trim().split('T').next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::assemble::assemble;
    use gmpricing_core::CanonicalSection;

    fn crn(cells: &[&str]) -> String {
        let inner: String = cells
            .iter()
            .map(|c| {
                if !c.is_empty() && c.chars().all(|ch| ch.is_ascii_digit() || ch == '.') {
                    format!("<Number>{c}</Number>")
                } else {
                    format!("<Text>{c}</Text>")
                }
            })
            .collect();
        format!("<Crn><Row>0</Row><ColFirst>0</ColFirst><ColLast>{}</ColLast>{inner}</Crn>", cells.len())
    }

    pub(crate) fn template() -> String {
        let mut crns = vec![
            crn(&["Population census (at beginning of reporting period)", "0-15", "16-25", "26-35", "36-50", "51-65", "Over 65"]),
            crn(&["Male", "10", "20", "30", "40", "50", "60"]),
            crn(&["Single Females", "1", "2", "3", "4", "5", "6"]),
            crn(&["Married Females", "7", "8", "9", "10", "11", "12"]),
            crn(&["Population census (at end of reporting period)", "0-15", "16-25", "26-35", "36-50", "51-65", "Over 65"]),
            crn(&["Male", "11", "21", "31", "41", "51", "61"]),
            crn(&["Single Females", "2", "3", "4", "5", "6", "7"]),
            crn(&["Married Females", "8", "9", "10", "11", "12", "13"]),
            crn(&["Total claims Processed per service month"]),
        ];
        for m in 1..=12 {
            crns.push(crn(&["2023", &format!("2023-{m:02}-28"), &format!("{}", m * 1000)]));
        }
        crns.push(crn(&["TOTAL", "78000"]));
        crns.extend([
            crn(&["Claims data by member type (value AED)", "IP", "OP", "Pharmacy", "Dental", "Optical", "Totals"]),
            crn(&["Employee", "100", "50", "25", "0", "5", "180"]),
            crn(&["Spouse", "10", "10", "10", "10", "10", "50"]),
            crn(&["Dependents", "1", "1", "1", "1", "1", "5"]),
            crn(&["Totals", "111", "61", "36", "11", "16", "235"]),
        ]);
        format!(
            r#"<?xml version="1.0"?>
<Workbook xmlns="urn:schemas-microsoft-com:office:spreadsheet"
 xmlns:o="urn:schemas-microsoft-com:office:office"
 xmlns:x="urn:schemas-microsoft-com:office:excel">
 <o:DocumentProperties><o:Created>2024-03-31T08:15:00Z</o:Created></o:DocumentProperties>
 <x:ExternalLink><x:SupBook><x:Xct><x:Count>1</x:Count>
 {}
 </x:Xct></x:SupBook></x:ExternalLink>
</Workbook>"#,
            crns.join("\n").replace('<', "<x:").replace("<x:/", "</x:")
        )
    }

    fn doc(xml: &str) -> Document {
        Document::from_bytes("template.xml", DocumentKind::SpreadsheetXml, xml.as_bytes().to_vec())
    }

    #[test]
    fn reads_all_four_sections_from_cell_cache() {
        let tables = XmlEngine.extract(&doc(&template())).unwrap();
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.rows[1][..2], ["6a".to_string(), "Male".to_string()]);

        for kind in SectionKind::ALL {
            assert!(assemble(kind, t).is_some(), "{kind} not assembled");
        }
        let Some(CanonicalSection::Census(end)) = assemble(SectionKind::CensusEnd, t) else {
            panic!("census end missing");
        };
        assert_eq!(end.rows[0].total, 216.0);
        let Some(CanonicalSection::MonthlyClaims(months)) = assemble(SectionKind::ClaimsByServiceMonth, t) else {
            panic!("months missing");
        };
        assert_eq!(months.rows.len(), 12);
        assert_eq!(months.rows[11].month.as_deref(), Some("December"));
        assert_eq!(months.total, 78000.0);
    }

    #[test]
    fn created_property_is_report_date() {
        assert_eq!(created_date(&template()), NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(created_date("<Workbook/>"), None);
    }

    #[test]
    fn malformed_xml_is_an_engine_error() {
        let err = XmlEngine.extract(&doc("<Workbook><x:Crn>")).unwrap_err();
        assert!(matches!(err, EngineError::Xml(_)));
    }

    #[test]
    fn only_spreadsheet_documents_are_supported() {
        assert!(XmlEngine.supports(&doc("<a/>")));
        assert!(!XmlEngine.supports(&Document::from_text("r.txt", "")));
    }
}
