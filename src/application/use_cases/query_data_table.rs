use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::domain::envelope::PageEnvelope;
use crate::domain::error::Result;
use crate::domain::query::{GlobalSearch, QueryPlan};
use crate::domain::request::DataTablesQuery;
use crate::domain::row::Row;
use crate::infrastructure::db::table_source::TableSource;

pub type ColumnFn = Arc<dyn Fn(&Row) -> Value + Send + Sync>;

pub const ROW_INDEX_COLUMN: &str = "DT_RowIndex";

/// Server-side processing over one table: counts, search, ordering and
/// paging run in SQL, column transforms run on the fetched rows.
pub struct QueryDataTable {
    source: TableSource,
    query: DataTablesQuery,
    added: Vec<(String, ColumnFn)>,
    edited: Vec<(String, ColumnFn)>,
    removed: Vec<String>,
    index_column: bool,
    skip_paging: bool,
    extra: Map<String, Value>,
}

impl QueryDataTable {
    pub fn new(source: TableSource, query: DataTablesQuery) -> Self {
        Self {
            source,
            query,
            added: Vec::new(),
            edited: Vec::new(),
            removed: Vec::new(),
            index_column: false,
            skip_paging: false,
            extra: Map::new(),
        }
    }

    /// Appends a computed column; registering the same name twice keeps
    /// the last definition.
    pub fn add_column<F>(&mut self, name: &str, compute: F) -> &mut Self
    where
        F: Fn(&Row) -> Value + Send + Sync + 'static,
    {
        self.added.retain(|(existing, _)| existing != name);
        self.added.push((name.to_string(), Arc::new(compute)));
        self
    }

    /// Replaces the value of an existing column.
    pub fn edit_column<F>(&mut self, name: &str, compute: F) -> &mut Self
    where
        F: Fn(&Row) -> Value + Send + Sync + 'static,
    {
        self.edited.push((name.to_string(), Arc::new(compute)));
        self
    }

    pub fn remove_column(&mut self, name: &str) -> &mut Self {
        self.removed.push(name.to_string());
        self
    }

    pub fn add_index_column(&mut self) -> &mut Self {
        self.index_column = true;
        self
    }

    /// Extra top-level key in the JSON envelope.
    pub fn with(&mut self, key: &str, value: Value) -> &mut Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn skip_paging(&mut self) -> &mut Self {
        self.skip_paging = true;
        self
    }

    pub fn request(&self) -> &DataTablesQuery {
        &self.query
    }

    pub fn source(&self) -> &TableSource {
        &self.source
    }

    pub fn plan(&self) -> QueryPlan {
        let mut plan = QueryPlan::default();

        if !self.query.search.is_empty() {
            let columns: Vec<String> = if self.query.columns.is_empty() {
                self.source.columns().to_vec()
            } else {
                self.query
                    .columns
                    .iter()
                    .filter(|c| c.searchable && self.source.has_column(c.source_name()))
                    .map(|c| c.source_name().to_string())
                    .collect()
            };
            if !columns.is_empty() {
                plan.global_search = Some(GlobalSearch {
                    term: self.query.search.value.clone(),
                    columns,
                });
            }
        }

        for column in &self.query.columns {
            if column.searchable && !column.search.is_empty() {
                if self.source.has_column(column.source_name()) {
                    plan.column_searches
                        .push((column.source_name().to_string(), column.search.value.clone()));
                } else {
                    debug!(column = %column.source_name(), "Skipping search on non-source column");
                }
            }
        }

        for order in &self.query.order {
            // Without `columns[]`, order indexes refer to the source columns.
            let target = match self.query.column(order.column) {
                Some(column) => column.orderable.then(|| column.source_name()),
                None if self.query.columns.is_empty() => {
                    self.source.columns().get(order.column).map(String::as_str)
                }
                None => None,
            };
            match target {
                Some(name) if self.source.has_column(name) => {
                    plan.order.push((name.to_string(), order.dir));
                }
                _ => debug!(index = order.column, "Skipping order on non-orderable column"),
            }
        }

        if !self.skip_paging {
            plan.paging = self.query.paging();
        }

        plan
    }

    pub async fn make(&self) -> Result<PageEnvelope> {
        let plan = self.plan();

        let records_total = self.source.count(None).await?;
        let records_filtered = if plan.is_filtered() {
            self.source.count(Some(&plan)).await?
        } else {
            records_total
        };

        let rows = self.source.fetch(&plan).await?;
        let offset = plan.paging.map(|(offset, _)| offset).unwrap_or(0);
        let data = self.transform(rows, offset);

        debug!(
            table = %self.source.table(),
            records_total,
            records_filtered,
            returned = data.len(),
            "Data table page built"
        );

        let mut envelope =
            PageEnvelope::new(self.query.draw, records_total, records_filtered, data);
        envelope.extra = self.extra.clone();
        Ok(envelope)
    }

    fn transform(&self, rows: Vec<Row>, offset: i64) -> Vec<Row> {
        rows.into_iter()
            .enumerate()
            .map(|(i, mut row)| {
                for (name, compute) in &self.edited {
                    let value = compute(&row);
                    row.insert(name.clone(), value);
                }
                for (name, compute) in &self.added {
                    let value = compute(&row);
                    row.insert(name.clone(), value);
                }
                if self.index_column {
                    row.insert(
                        ROW_INDEX_COLUMN.to_string(),
                        Value::from(offset + i as i64 + 1),
                    );
                }
                for name in &self.removed {
                    row.shift_remove(name);
                }
                row
            })
            .collect()
    }
}
