pub mod calculator;
pub mod money;
pub mod table;

pub use calculator::{census_lines, section_lines, PricedLine, PricingCalculator, PricingLine, PricingResult};
pub use money::Money;
pub use table::{PriceTable, PriceTableError};
