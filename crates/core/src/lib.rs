pub mod normalize;
pub mod period;
pub mod schema;
pub mod section;
pub mod table;

pub use normalize::{format_number, is_placeholder, normalize_opt, normalize_text, parse_number};
pub use period::{expand_year, month_from_name, month_name, ReportingPeriod};
pub use schema::{ColumnKey, RowSpec, SectionKind, AGE_BANDS, CLAIM_CATEGORIES, MONTH_COLUMNS};
pub use section::{
    CanonicalSection, CensusRow, CensusSection, MemberClaimsRow, MemberClaimsSection, MonthRow,
    MonthlyClaimsSection,
};
pub use table::RawTable;
