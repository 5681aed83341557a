use gmpricing_core::{CanonicalSection, CensusSection, AGE_BANDS, CLAIM_CATEGORIES};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::money::Money;
use crate::table::PriceTable;

/// One priced quantity, keyed by a table code such as `"6a:16-25"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingLine {
    pub code: String,
    pub quantity: Decimal,
}

impl PricingLine {
    pub fn new(code: impl Into<String>, quantity: Decimal) -> Self {
        Self { code: code.into(), quantity }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedLine {
    pub code: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub multiplier: Decimal,
    pub amount: Money,
    /// False when the default price was used.
    pub known: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingResult {
    pub currency: String,
    pub lines: Vec<PricedLine>,
    pub total: Money,
    /// Share of the priced quantity that came from known codes, 0-100.
    pub confidence: f64,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct PricingCalculator {
    table: PriceTable,
}

impl PricingCalculator {
    pub fn new(table: PriceTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PriceTable {
        &self.table
    }

    pub fn calculate(&self, lines: &[PricingLine]) -> PricingResult {
        let mut priced = Vec::with_capacity(lines.len());
        let mut warnings = Vec::new();
        let mut known_quantity = Decimal::ZERO;
        let mut total_quantity = Decimal::ZERO;

        for line in lines {
            if line.quantity.is_sign_negative() {
                warnings.push(format!("{}: negative quantity {} ignored", line.code, line.quantity));
                continue;
            }
            let (unit_price, known) = match self.table.price(&line.code) {
                Some(p) => (p, true),
                None => {
                    tracing::debug!(code = %line.code, "no price, using default");
                    (self.table.default_price, false)
                }
            };
            let multiplier = self.table.multiplier(&line.code);
            total_quantity += line.quantity;
            if known {
                known_quantity += line.quantity;
            }
            priced.push(PricedLine {
                code: line.code.clone(),
                quantity: line.quantity,
                unit_price,
                multiplier,
                amount: Money::from_decimal(line.quantity * unit_price * multiplier),
                known,
            });
        }

        let unknown: Vec<&str> = priced.iter().filter(|l| !l.known).map(|l| l.code.as_str()).collect();
        if !unknown.is_empty() {
            warnings.push(format!(
                "{} code(s) priced at the default {}: {}",
                unknown.len(),
                self.table.default_price,
                unknown.join(", ")
            ));
        }

        let mut notes = Vec::new();
        if priced.is_empty() {
            notes.push("Nothing to price".to_string());
        }
        if priced.iter().any(|l| l.multiplier != Decimal::ONE) {
            notes.push("Multipliers applied".to_string());
        }

        let confidence = if total_quantity.is_zero() {
            0.0
        } else {
            (known_quantity / total_quantity * Decimal::ONE_HUNDRED).round_dp(1).to_f64().unwrap_or(0.0)
        };

        PricingResult {
            currency: self.table.currency.clone(),
            total: priced.iter().map(|l| l.amount).sum(),
            lines: priced,
            confidence,
            notes,
            warnings,
        }
    }
}

/// Pricing lines for a section: census counts keyed `"<code>:<age band>"`,
/// claim values keyed `"<code>:<category>"`, monthly values keyed by code.
/// Empty cells produce no line.
pub fn section_lines(section: &CanonicalSection) -> Vec<PricingLine> {
    let line = |code: String, value: f64| Decimal::from_f64(value).map(|q| PricingLine::new(code, q));
    match section {
        CanonicalSection::Census(census) => census
            .rows
            .iter()
            .flat_map(|row| {
                AGE_BANDS
                    .iter()
                    .zip(row.bands)
                    .filter_map(move |(band, v)| line(format!("{}:{}", row.code, band.label()), v?))
            })
            .collect(),
        CanonicalSection::MemberClaims(claims) => claims
            .rows
            .iter()
            // 8d repeats the member rows.
            .filter(|row| row.code != "8d")
            .flat_map(|row| {
                CLAIM_CATEGORIES
                    .iter()
                    .zip(row.categories)
                    .filter_map(move |(cat, v)| line(format!("{}:{}", row.code, cat.label()), v?))
            })
            .collect(),
        CanonicalSection::MonthlyClaims(months) => months
            .rows
            .iter()
            .filter_map(|row| line(row.code.clone(), row.value?))
            .collect(),
    }
}

/// Census lines only, the usual basis for a premium quote.
pub fn census_lines(census: &CensusSection) -> Vec<PricingLine> {
    section_lines(&CanonicalSection::Census(census.clone()))
}
