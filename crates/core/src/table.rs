use serde::{Deserialize, Serialize};

/// A table as produced by one extraction engine from one page.
///
/// Identity is only `engine` + `page` + `index`; tables are discarded once the
/// column mapper and anchor matcher have looked at them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub engine: String,
    /// 1-based page number (text inputs are a single page).
    pub page: usize,
    /// Position of this table among those the engine found on `page`.
    pub index: usize,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(engine: impl Into<String>, page: usize, index: usize, rows: Vec<Vec<String>>) -> Self {
        Self { engine: engine.into(), page, index, rows }
    }

    /// Build a table from string slices; mostly useful for fixtures.
    pub fn from_rows<R, C>(engine: &str, page: usize, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(Into::into).collect())
            .collect();
        Self::new(engine, page, 0, rows)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(|c| c.trim().is_empty()))
    }

    /// Short identifier used in logs and provenance records.
    pub fn origin(&self) -> String {
        format!("{}#p{}t{}", self.engine, self.page, self.index)
    }
}
