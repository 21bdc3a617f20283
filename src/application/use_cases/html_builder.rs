use serde_json::{json, Map, Value};

use crate::domain::column::Column;
use crate::domain::request::SortDirection;
use crate::infrastructure::response::escape_html;

pub const DEFAULT_NAMESPACE: &str = "LaravelDataTables";

/// Builds the `<table>` markup and the bootstrap script of a client grid.
#[derive(Debug, Clone)]
pub struct HtmlBuilder {
    table_id: String,
    namespace: String,
    columns: Vec<Column>,
    ajax: Option<Value>,
    parameters: Map<String, Value>,
    table_class: String,
}

impl Default for HtmlBuilder {
    fn default() -> Self {
        Self {
            table_id: "dataTableBuilder".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            columns: Vec::new(),
            ajax: None,
            parameters: Map::new(),
            table_class: "table".to_string(),
        }
    }
}

impl HtmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table_id(mut self, id: &str) -> Self {
        self.table_id = id.to_string();
        self
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn get_columns(&self) -> &[Column] {
        &self.columns
    }

    /// Same-URL AJAX source, the usual setup for a service table.
    pub fn min_ajax(mut self) -> Self {
        self.ajax = Some(json!(""));
        self
    }

    pub fn ajax(mut self, url: &str) -> Self {
        self.ajax = Some(json!(url));
        self
    }

    pub fn parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn dom(self, dom: &str) -> Self {
        self.parameter("dom", json!(dom))
    }

    pub fn page_length(self, length: i64) -> Self {
        self.parameter("pageLength", json!(length))
    }

    pub fn order_by(mut self, column: usize, dir: SortDirection) -> Self {
        let dir = match dir {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        let order = self
            .parameters
            .entry("order")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = order {
            items.push(json!([column, dir]));
        }
        self
    }

    pub fn buttons(self, buttons: &[&str]) -> Self {
        let buttons: Vec<Value> = buttons.iter().map(|b| json!(b)).collect();
        self.parameter("buttons", Value::Array(buttons))
    }

    pub fn table_class(mut self, class: &str) -> Self {
        self.table_class = class.to_string();
        self
    }

    fn parameter(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    /// Options object handed to `$(..).DataTable(..)`.
    pub fn options(&self) -> Value {
        let mut options = Map::new();
        options.insert("serverSide".into(), json!(true));
        options.insert("processing".into(), json!(true));
        if let Some(ajax) = &self.ajax {
            options.insert("ajax".into(), ajax.clone());
        }
        options.insert(
            "columns".into(),
            serde_json::to_value(&self.columns).unwrap_or(Value::Array(Vec::new())),
        );
        for (key, value) in &self.parameters {
            options.insert(key.clone(), value.clone());
        }
        Value::Object(options)
    }

    pub fn table(&self) -> String {
        let headers: String = self
            .columns
            .iter()
            .map(|c| match &c.class_name {
                Some(class) => format!(
                    "<th class=\"{}\">{}</th>",
                    escape_html(class),
                    escape_html(&c.title)
                ),
                None => format!("<th>{}</th>", escape_html(&c.title)),
            })
            .collect();

        let footer = if self.columns.iter().any(|c| c.footer.is_some()) {
            let cells: String = self
                .columns
                .iter()
                .map(|c| format!("<th>{}</th>", escape_html(c.footer.as_deref().unwrap_or(""))))
                .collect();
            format!("<tfoot><tr>{}</tr></tfoot>", cells)
        } else {
            String::new()
        };

        format!(
            "<table id=\"{}\" class=\"{}\"><thead><tr>{}</tr></thead>{}</table>",
            escape_html(&self.table_id),
            escape_html(&self.table_class),
            headers,
            footer
        )
    }

    pub fn scripts(&self) -> String {
        format!(
            "<script type=\"text/javascript\">{}</script>",
            self.generate_scripts()
        )
    }

    pub fn generate_scripts(&self) -> String {
        // serde_json does not escape "</", which would end the script tag.
        let options = self.options().to_string().replace("</", "<\\/");
        let ns = js_identifier(&self.namespace);
        let id = serde_json::to_string(&self.table_id).unwrap_or_else(|_| "\"\"".into());
        let selector =
            serde_json::to_string(&format!("#{}", self.table_id)).unwrap_or_else(|_| "\"\"".into());
        format!(
            "$(function(){{window.{ns}=window.{ns}||{{}};window.{ns}[{id}]=$({selector}).DataTable({options});}});",
            ns = ns,
            id = id,
            selector = selector,
            options = options
        )
    }
}

fn js_identifier(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    if cleaned.is_empty() {
        DEFAULT_NAMESPACE.to_string()
    } else {
        cleaned
    }
}
