//! Price table: externally supplied lookup data, loaded once and injected
//! into the calculator.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceTableError {
    #[error("IO error reading price table: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid price table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Negative price for '{0}'")]
    NegativePrice(String),
    #[error("Negative multiplier for '{0}'")]
    NegativeMultiplier(String),
}

fn default_currency() -> String {
    "AED".to_string()
}

/// ```toml
/// currency = "AED"
/// default_price = 100.0
///
/// [prices]
/// "6a:0-15" = 850.0
/// "8a:IP" = 0.12
///
/// [multipliers]
/// "7" = 1.05
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Unit price for codes not in `prices`.
    pub default_price: Decimal,
    #[serde(default)]
    pub prices: BTreeMap<String, Decimal>,
    /// Keyed by code prefix; the longest matching prefix applies.
    #[serde(default)]
    pub multipliers: BTreeMap<String, Decimal>,
}

impl PriceTable {
    pub fn from_toml(text: &str) -> Result<Self, PriceTableError> {
        let table: PriceTable = toml::from_str(text)?;
        table.check()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, PriceTableError> {
        let table = Self::from_toml(&std::fs::read_to_string(path)?)?;
        tracing::debug!(
            path = %path.display(),
            prices = table.prices.len(),
            multipliers = table.multipliers.len(),
            "loaded price table"
        );
        Ok(table)
    }

    fn check(&self) -> Result<(), PriceTableError> {
        if self.default_price.is_sign_negative() {
            return Err(PriceTableError::NegativePrice("default_price".into()));
        }
        if let Some((code, _)) = self.prices.iter().find(|(_, p)| p.is_sign_negative()) {
            return Err(PriceTableError::NegativePrice(code.clone()));
        }
        if let Some((prefix, _)) = self.multipliers.iter().find(|(_, m)| m.is_sign_negative()) {
            return Err(PriceTableError::NegativeMultiplier(prefix.clone()));
        }
        Ok(())
    }

    pub fn price(&self, code: &str) -> Option<Decimal> {
        self.prices.get(code).copied()
    }

    pub fn multiplier(&self, code: &str) -> Decimal {
        self.multipliers
            .iter()
            .filter(|(prefix, _)| code.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, m)| *m)
            .unwrap_or(Decimal::ONE)
    }
}
