use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static COLUMN_PARAM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^columns\[(\d+)\]\[(\w+)\](?:\[(\w+)\])?$").unwrap());

static ORDER_PARAM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^order\[(\d+)\]\[(\w+)\]$").unwrap());

/// Framework-independent view of an incoming table request.
#[derive(Debug, Clone, Default)]
pub struct TableRequest {
    params: Vec<(String, String)>,
    ajax: bool,
}

impl TableRequest {
    pub fn new(params: Vec<(String, String)>, ajax: bool) -> Self {
        Self { params, ajax }
    }

    pub fn from_query_string(query: &str, ajax: bool) -> Self {
        let params = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self::new(params, ajax)
    }

    pub fn is_ajax(&self) -> bool {
        self.ajax
    }

    pub fn input(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn action(&self) -> Option<&str> {
        self.input("action").filter(|action| !action.is_empty())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn query(&self) -> DataTablesQuery {
        DataTablesQuery::parse(&self.params)
    }
}

/// `X-Requested-With: XMLHttpRequest`, or a client asking for JSON.
pub fn is_ajax_signal(requested_with: Option<&str>, accept: Option<&str>) -> bool {
    let xhr = requested_with
        .map(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false);
    let wants_json = accept
        .map(|value| value.contains("application/json") || value.contains("+json"))
        .unwrap_or(false);
    xhr || wants_json
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchValue {
    pub value: String,
    pub regex: bool,
}

impl SearchValue {
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRequest {
    /// Index the client sent in `columns[i]`; `order[j][column]` refers to it.
    pub index: usize,
    pub data: String,
    pub name: String,
    pub searchable: bool,
    pub orderable: bool,
    pub search: SearchValue,
}

impl Default for ColumnRequest {
    fn default() -> Self {
        Self {
            index: 0,
            data: String::new(),
            name: String::new(),
            searchable: true,
            orderable: true,
            search: SearchValue::default(),
        }
    }
}

impl ColumnRequest {
    /// Source column the client refers to: `name` wins over `data`.
    pub fn source_name(&self) -> &str {
        if self.name.is_empty() {
            &self.data
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub column: usize,
    pub dir: SortDirection,
}

/// Parsed DataTables server-side processing parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTablesQuery {
    pub draw: i64,
    pub start: Option<i64>,
    pub length: Option<i64>,
    pub search: SearchValue,
    pub columns: Vec<ColumnRequest>,
    pub order: Vec<OrderRequest>,
}

impl DataTablesQuery {
    pub fn parse(params: &[(String, String)]) -> Self {
        let mut query = DataTablesQuery::default();
        let mut columns: BTreeMap<usize, ColumnRequest> = BTreeMap::new();
        let mut order: BTreeMap<usize, (Option<usize>, SortDirection)> = BTreeMap::new();

        for (key, value) in params {
            match key.as_str() {
                "draw" => query.draw = value.trim().parse().unwrap_or(0),
                "start" => query.start = value.trim().parse().ok(),
                "length" => query.length = value.trim().parse().ok(),
                "search[value]" => query.search.value = value.clone(),
                "search[regex]" => query.search.regex = parse_flag(value),
                _ => {
                    if let Some(caps) = COLUMN_PARAM_PATTERN.captures(key) {
                        let Ok(index) = caps[1].parse::<usize>() else {
                            continue;
                        };
                        let column = columns.entry(index).or_insert_with(|| ColumnRequest {
                            index,
                            ..ColumnRequest::default()
                        });
                        match (&caps[2], caps.get(3).map(|m| m.as_str())) {
                            ("data", None) => column.data = value.clone(),
                            ("name", None) => column.name = value.clone(),
                            ("searchable", None) => column.searchable = parse_flag(value),
                            ("orderable", None) => column.orderable = parse_flag(value),
                            ("search", Some("value")) => column.search.value = value.clone(),
                            ("search", Some("regex")) => column.search.regex = parse_flag(value),
                            _ => {}
                        }
                    } else if let Some(caps) = ORDER_PARAM_PATTERN.captures(key) {
                        let Ok(index) = caps[1].parse::<usize>() else {
                            continue;
                        };
                        let entry = order.entry(index).or_insert((None, SortDirection::Asc));
                        match &caps[2] {
                            "column" => entry.0 = value.trim().parse().ok(),
                            "dir" => entry.1 = SortDirection::parse(value),
                            _ => {}
                        }
                    }
                }
            }
        }

        query.columns = columns.into_values().collect();
        query.order = order
            .into_values()
            .filter_map(|(column, dir)| column.map(|column| OrderRequest { column, dir }))
            .collect();
        query
    }

    /// Column the client sent as `columns[index]`.
    pub fn column(&self, index: usize) -> Option<&ColumnRequest> {
        self.columns.iter().find(|column| column.index == index)
    }

    /// Paging applies only when the client sent both bounds and did not
    /// ask for every row with `length=-1`.
    pub fn paging(&self) -> Option<(i64, i64)> {
        match (self.start, self.length) {
            (Some(start), Some(length)) if length != -1 => Some((start.max(0), length.max(0))),
            _ => None,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "true" | "1" | "on" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str) -> TableRequest {
        TableRequest::from_query_string(query, true)
    }

    #[test]
    fn test_defaults_without_params() {
        let query = request("").query();
        assert_eq!(query.draw, 0);
        assert!(query.columns.is_empty());
        assert_eq!(query.paging(), None);
    }

    #[test]
    fn test_parse_full_request() {
        let query = request(
            "draw=4&start=10&length=5&search%5Bvalue%5D=ann&search%5Bregex%5D=false\
             &columns%5B0%5D%5Bdata%5D=id&columns%5B0%5D%5Bsearchable%5D=false\
             &columns%5B1%5D%5Bdata%5D=name&columns%5B1%5D%5Bsearch%5D%5Bvalue%5D=User\
             &order%5B0%5D%5Bcolumn%5D=1&order%5B0%5D%5Bdir%5D=desc",
        )
        .query();

        assert_eq!(query.draw, 4);
        assert_eq!(query.paging(), Some((10, 5)));
        assert_eq!(query.search.value, "ann");
        assert_eq!(query.columns.len(), 2);
        assert!(!query.columns[0].searchable);
        assert_eq!(query.columns[1].search.value, "User");
        assert_eq!(
            query.order,
            vec![OrderRequest {
                column: 1,
                dir: SortDirection::Desc
            }]
        );
    }

    #[test]
    fn test_order_targets_sparse_column_index() {
        let query = request(
            "columns%5B0%5D%5Bdata%5D=id&columns%5B5%5D%5Bdata%5D=email\
             &order%5B0%5D%5Bcolumn%5D=5&order%5B0%5D%5Bdir%5D=desc",
        )
        .query();

        assert_eq!(query.columns.len(), 2);
        assert_eq!(query.columns[1].index, 5);
        assert_eq!(query.column(5).map(|c| c.source_name()), Some("email"));
        assert!(query.column(1).is_none());
    }

    #[test]
    fn test_length_minus_one_disables_paging() {
        let query = request("start=0&length=-1").query();
        assert_eq!(query.paging(), None);
    }

    #[test]
    fn test_non_numeric_draw_is_zero() {
        assert_eq!(request("draw=abc").query().draw, 0);
    }

    #[test]
    fn test_source_name_prefers_name() {
        let column = ColumnRequest {
            data: "display".into(),
            name: "users.name".into(),
            ..Default::default()
        };
        assert_eq!(column.source_name(), "users.name");
    }

    #[test]
    fn test_action_and_ajax_signal() {
        let req = TableRequest::from_query_string("action=csv&draw=1", false);
        assert_eq!(req.action(), Some("csv"));
        assert_eq!(
            req.params(),
            &[
                ("action".to_string(), "csv".to_string()),
                ("draw".to_string(), "1".to_string())
            ]
        );
        assert!(!req.is_ajax());
        assert_eq!(TableRequest::from_query_string("action=", false).action(), None);

        assert!(is_ajax_signal(Some("XMLHttpRequest"), None));
        assert!(is_ajax_signal(None, Some("application/json")));
        assert!(!is_ajax_signal(None, Some("text/html")));
    }
}
