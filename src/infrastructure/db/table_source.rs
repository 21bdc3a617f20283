use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column, QueryBuilder, Row as _, Sqlite, TypeInfo, ValueRef};

use crate::domain::error::{AppError, Result};
use crate::domain::query::QueryPlan;
use crate::domain::row::Row;

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// A single table plus the columns a data table may read from it.
#[derive(Clone)]
pub struct TableSource {
    pool: SqlitePool,
    table: String,
    columns: Vec<String>,
}

impl TableSource {
    pub fn new(pool: SqlitePool, table: &str, columns: &[&str]) -> Result<Self> {
        ensure_identifier(table)?;
        for column in columns {
            ensure_identifier(column)?;
        }
        if columns.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Table source {} has no columns",
                table
            )));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub async fn count(&self, plan: Option<&QueryPlan>) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
        builder.push(quote_identifier(&self.table));
        if let Some(plan) = plan {
            push_filters(&mut builder, plan);
        }

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to count {}: {}", self.table, e))
            })
    }

    pub async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        let selected = self
            .columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        builder.push(selected);
        builder.push(" FROM ");
        builder.push(quote_identifier(&self.table));

        push_filters(&mut builder, plan);

        if !plan.order.is_empty() {
            let order = plan
                .order
                .iter()
                .map(|(column, dir)| format!("{} {}", quote_identifier(column), dir.as_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            builder.push(" ORDER BY ");
            builder.push(order);
        }

        if let Some((offset, limit)) = plan.paging {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
            builder.push(" OFFSET ");
            builder.push_bind(offset);
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to fetch {}: {}", self.table, e))
            })?;

        rows.iter().map(row_to_json).collect()
    }
}

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(name)
}

fn ensure_identifier(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "Invalid identifier: {:?}",
            name
        )))
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name)
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, plan: &QueryPlan) {
    let mut conditions = 0;

    if let Some(global) = &plan.global_search {
        if !global.columns.is_empty() {
            builder.push(" WHERE (");
            for (i, column) in global.columns.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                push_like(builder, column, &global.term);
            }
            builder.push(")");
            conditions += 1;
        }
    }

    for (column, term) in &plan.column_searches {
        builder.push(if conditions == 0 { " WHERE " } else { " AND " });
        push_like(builder, column, term);
        conditions += 1;
    }
}

fn push_like(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, term: &str) {
    builder.push(format!(
        "LOWER(CAST({} AS TEXT)) LIKE ",
        quote_identifier(column)
    ));
    builder.push("LOWER(");
    builder.push_bind(like_pattern(term));
    builder.push(") ESCAPE '\\'");
}

/// `%term%` with LIKE wildcards in the term taken literally. Case folding
/// happens in SQL so the term and the column are folded the same way.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn row_to_json(row: &SqliteRow) -> Result<Row> {
    let mut map = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row
            .try_get_raw(index)
            .map_err(|e| AppError::DatabaseError(format!("Failed to read column: {}", e)))?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            decode_value(row, index, &type_name)
                .map_err(|e| AppError::DatabaseError(format!("Failed to decode column: {}", e)))?
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn decode_value(row: &SqliteRow, index: usize, type_name: &str) -> sqlx::Result<Value> {
    Ok(match type_name {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => serde_json::Number::from_f64(row.try_get_unchecked::<f64, _>(index)?)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => Value::String(
            base64::engine::general_purpose::STANDARD
                .encode(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        ),
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    })
}
