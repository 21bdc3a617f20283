use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::row::Row;

/// JSON page returned to a DataTables grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope {
    pub draw: i64,
    pub records_total: i64,
    pub records_filtered: i64,
    pub data: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Keys appended with `with(..)`, flattened into the top-level object.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PageEnvelope {
    pub fn new(draw: i64, records_total: i64, records_filtered: i64, data: Vec<Row>) -> Self {
        Self {
            draw,
            records_total,
            records_filtered,
            data,
            error: None,
            extra: Map::new(),
        }
    }

    /// Envelope the DataTables client expects when the server failed.
    pub fn error(draw: i64, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(draw, 0, 0, Vec::new())
        }
    }
}
