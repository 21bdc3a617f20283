use crate::domain::request::SortDirection;

/// Database-facing description of one page read, built from a
/// `DataTablesQuery` after column names were checked against the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    /// Term matched against any of the columns (OR).
    pub global_search: Option<GlobalSearch>,
    /// Per-column terms (AND).
    pub column_searches: Vec<(String, String)>,
    pub order: Vec<(String, SortDirection)>,
    /// `(offset, limit)`
    pub paging: Option<(i64, i64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSearch {
    pub term: String,
    pub columns: Vec<String>,
}

impl QueryPlan {
    pub fn is_filtered(&self) -> bool {
        self.global_search.is_some() || !self.column_searches.is_empty()
    }
}
