use chrono::Local;
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::html_builder::HtmlBuilder;
use super::macro_registry::MacroRegistry;
use super::query_data_table::QueryDataTable;
use crate::domain::column::Column;
use crate::domain::envelope::PageEnvelope;
use crate::domain::error::{AppError, Result};
use crate::domain::export::TableAction;
use crate::domain::request::TableRequest;
use crate::domain::row::RowExt;
use crate::infrastructure::config::DataTablesConfig;
use crate::infrastructure::db::sqlite::Database;
use crate::infrastructure::db::table_source::TableSource;
use crate::infrastructure::export::{ExportFile, ExportTable, Exporter};
use crate::infrastructure::response::strip_tags;
use crate::infrastructure::view::{ViewRenderer, PRINT_VIEW};

const GENERIC_ERROR: &str = "Server Error";

/// A table definition: where rows come from, how the engine is configured
/// and how the client grid is described.
pub trait DataTableService: Send + Sync {
    fn source(&self, pool: &SqlitePool) -> Result<TableSource>;

    /// Engine configuration (computed columns, extra keys, ...).
    fn data_table(&self, _table: &mut QueryDataTable) {}

    fn columns(&self) -> Vec<Column>;

    fn html(&self, builder: HtmlBuilder) -> HtmlBuilder {
        builder.columns(self.columns()).min_ajax()
    }

    /// Base name of export files; a timestamp and the extension are appended.
    fn filename(&self) -> String;

    fn actions(&self) -> Vec<TableAction> {
        TableAction::ALL.to_vec()
    }

    /// View used when the table is bound directly as a route action.
    fn view(&self) -> Option<&str> {
        None
    }

    fn view_data(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// Shared resources every responder is built from.
#[derive(Clone)]
pub struct DataTableContext {
    pub database: Database,
    pub views: Arc<ViewRenderer>,
    pub macros: Arc<MacroRegistry>,
    pub config: DataTablesConfig,
}

impl DataTableContext {
    pub fn new(database: Database, config: DataTablesConfig) -> Result<Self> {
        let glob = config.template_dir.as_ref().map(|dir| format!("{}/**/*", dir));
        let views = ViewRenderer::new(glob.as_deref())?;
        Ok(Self {
            database,
            views: Arc::new(views),
            macros: Arc::new(MacroRegistry::new()),
            config,
        })
    }

    pub fn table<S: DataTableService>(&self, service: S) -> DataTable<S> {
        DataTable::new(service, self.clone())
    }
}

/// Outcome of a dispatch, before it is turned into an HTTP response.
#[derive(Debug)]
pub enum Rendered {
    Json(PageEnvelope),
    Html(String),
    Export(ExportFile),
}

type BeforeHook = Box<dyn Fn(&mut QueryDataTable) + Send + Sync>;
type ResponseHook = Box<dyn Fn(PageEnvelope) -> PageEnvelope + Send + Sync>;

/// Answers a table request with JSON, an export or the HTML view.
pub struct DataTable<S> {
    service: S,
    context: DataTableContext,
    before: Option<BeforeHook>,
    response: Option<ResponseHook>,
}

impl<S: DataTableService> DataTable<S> {
    pub fn new(service: S, context: DataTableContext) -> Self {
        Self {
            service,
            context,
            before: None,
            response: None,
        }
    }

    /// Runs on the configured engine before rows are fetched.
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut QueryDataTable) + Send + Sync + 'static,
    {
        self.before = Some(Box::new(hook));
        self
    }

    /// Runs on the finished envelope right before it is sent.
    pub fn response<F>(mut self, hook: F) -> Self
    where
        F: Fn(PageEnvelope) -> PageEnvelope + Send + Sync + 'static,
    {
        self.response = Some(Box::new(hook));
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn macros(&self) -> &MacroRegistry {
        &self.context.macros
    }

    pub fn call_macro(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.context.macros.call(name, args)
    }

    pub fn html_builder(&self) -> HtmlBuilder {
        self.service
            .html(HtmlBuilder::new().namespace(&self.context.config.namespace))
    }

    /// Route-action entry point: the service's own view and view data.
    pub async fn invoke(&self, request: &TableRequest) -> Result<Rendered> {
        let view = self
            .service
            .view()
            .ok_or_else(|| AppError::NotFound("No view configured for data table".to_string()))?
            .to_string();
        self.render(request, &view, self.service.view_data()).await
    }

    pub async fn render(
        &self,
        request: &TableRequest,
        view: &str,
        data: Map<String, Value>,
    ) -> Result<Rendered> {
        if request.is_ajax() {
            return Ok(Rendered::Json(self.json(request).await));
        }

        if let Some(action) = self.requested_action(request) {
            return self.export(request, action).await;
        }

        let builder = self.html_builder();
        let mut context = data;
        context.insert("table".to_string(), json!(builder.table()));
        context.insert("scripts".to_string(), json!(builder.scripts()));
        Ok(Rendered::Html(self.context.views.render(view, &context)?))
    }

    /// JSON envelope for the grid. Failures become a DataTables error
    /// envelope rather than an HTTP error.
    pub async fn json(&self, request: &TableRequest) -> PageEnvelope {
        match self.ajax(request).await {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(error = %err, "Data table request failed");
                let message = if self.context.config.error_detail {
                    err.to_string()
                } else {
                    GENERIC_ERROR.to_string()
                };
                PageEnvelope::error(request.query().draw, message)
            }
        }
    }

    pub async fn ajax(&self, request: &TableRequest) -> Result<PageEnvelope> {
        let table = self.engine(request)?;
        self.materialize(&table).await
    }

    fn engine(&self, request: &TableRequest) -> Result<QueryDataTable> {
        let source = self.service.source(self.context.database.pool())?;
        let mut table = QueryDataTable::new(source, request.query());
        self.service.data_table(&mut table);
        if let Some(hook) = &self.before {
            hook(&mut table);
        }
        Ok(table)
    }

    async fn materialize(&self, table: &QueryDataTable) -> Result<PageEnvelope> {
        let envelope = table.make().await?;
        Ok(match &self.response {
            Some(hook) => hook(envelope),
            None => envelope,
        })
    }

    fn requested_action(&self, request: &TableRequest) -> Option<TableAction> {
        let action = TableAction::parse(request.action()?)?;
        if self.service.actions().contains(&action) {
            Some(action)
        } else {
            debug!(action = action.as_str(), "Action not allowed, rendering view");
            None
        }
    }

    async fn export(&self, request: &TableRequest, action: TableAction) -> Result<Rendered> {
        let mut table = self.engine(request)?;
        table.skip_paging();
        let envelope = self.materialize(&table).await?;
        let columns = self.service.columns();

        if action == TableAction::Print {
            let printable: Vec<&Column> = columns.iter().filter(|c| c.printable).collect();
            let rows: Vec<Vec<String>> = envelope
                .data
                .iter()
                .map(|row| printable.iter().map(|c| strip_tags(&row.text(&c.data))).collect())
                .collect();
            let mut data = Map::new();
            data.insert("title".to_string(), json!(self.service.filename()));
            data.insert(
                "headers".to_string(),
                json!(printable.iter().map(|c| c.title.as_str()).collect::<Vec<_>>()),
            );
            data.insert("rows".to_string(), json!(rows));
            return Ok(Rendered::Html(self.context.views.render(PRINT_VIEW, &data)?));
        }

        let filename = format!(
            "{}_{}",
            self.service.filename(),
            Local::now().format("%Y%m%d%H%M%S")
        );
        let export = ExportTable::from_rows(
            &self.service.filename(),
            columns.iter().filter(|c| c.exportable),
            &envelope.data,
        );
        let exporter = Exporter::new(self.context.config.export_dir());

        let file = tokio::task::spawn_blocking(move || exporter.export(action, &filename, &export))
            .await
            .map_err(|e| AppError::Internal(format!("Export task failed: {}", e)))??;

        info!(
            action = action.as_str(),
            filename = %file.filename,
            rows = envelope.data.len(),
            "Data table exported"
        );
        Ok(Rendered::Export(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::row::RowExt;

    struct People {
        table: &'static str,
        actions: Vec<TableAction>,
    }

    impl Default for People {
        fn default() -> Self {
            Self {
                table: "users",
                actions: TableAction::ALL.to_vec(),
            }
        }
    }

    impl DataTableService for People {
        fn source(&self, pool: &SqlitePool) -> Result<TableSource> {
            TableSource::new(pool.clone(), self.table, &["id", "name", "email"])
        }

        fn columns(&self) -> Vec<Column> {
            vec![
                Column::make("id"),
                Column::make("name"),
                Column::make("email").printable(false),
            ]
        }

        fn filename(&self) -> String {
            "people".to_string()
        }

        fn actions(&self) -> Vec<TableAction> {
            self.actions.clone()
        }
    }

    async fn context(error_detail: bool) -> DataTableContext {
        let database = Database::in_memory().await.unwrap();
        database.seed_users(20).await.unwrap();
        let config = DataTablesConfig {
            error_detail,
            ..DataTablesConfig::default()
        };
        DataTableContext::new(database, config).unwrap()
    }

    fn ajax(query: &str) -> TableRequest {
        TableRequest::from_query_string(query, true)
    }

    fn page(query: &str) -> TableRequest {
        TableRequest::from_query_string(query, false)
    }

    #[tokio::test]
    async fn test_ajax_returns_envelope() {
        let table = context(false).await.table(People::default());
        match table.render(&ajax(""), "users", Map::new()).await.unwrap() {
            Rendered::Json(envelope) => {
                assert_eq!(envelope.records_total, 20);
                assert_eq!(envelope.records_filtered, 20);
                assert_eq!(envelope.data.len(), 20);
            }
            other => panic!("expected json, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hooks() {
        let table = context(false)
            .await
            .table(People::default())
            .before(|dt| {
                dt.add_column("nameX", |row| json!(format!("{}X", row.text("name"))));
            })
            .response(|mut envelope| {
                envelope.records_total = 2;
                envelope.records_filtered = 1;
                envelope
            });

        let envelope = table.json(&ajax("")).await;
        assert_eq!(envelope.records_total, 2);
        assert_eq!(envelope.records_filtered, 1);
        for row in &envelope.data {
            assert_eq!(row.text("nameX"), format!("{}X", row.text("name")));
        }
    }

    #[tokio::test]
    async fn test_view_without_action() {
        let table = context(false).await.table(People::default());
        let rendered = table.render(&page(""), "users", Map::new()).await.unwrap();
        match rendered {
            Rendered::Html(html) => {
                assert!(html.contains("No description"));
                assert!(html.contains("LaravelDataTables"));
                assert!(html.contains("dataTableBuilder"));
            }
            other => panic!("expected html, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disallowed_action_falls_back_to_view() {
        let service = People {
            actions: vec![TableAction::Csv],
            ..People::default()
        };
        let table = context(false).await.table(service);
        let rendered = table
            .render(&page("action=pdf"), "users", Map::new())
            .await
            .unwrap();
        assert!(matches!(rendered, Rendered::Html(_)));
    }

    #[tokio::test]
    async fn test_csv_export_is_unpaged() {
        let table = context(false).await.table(People::default());
        let rendered = table
            .render(&page("action=csv&start=0&length=5"), "users", Map::new())
            .await
            .unwrap();
        match rendered {
            Rendered::Export(file) => {
                assert_eq!(file.action, TableAction::Csv);
                assert!(file.filename.starts_with("people_"));
                assert!(file.filename.ends_with(".csv"));
                let body = String::from_utf8(file.body).unwrap();
                assert_eq!(body.lines().count(), 21);
                assert!(body.starts_with("Id,Name,Email"));
            }
            other => panic!("expected export, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_export_runs_hooks_with_search_and_order() {
        let table = context(false)
            .await
            .table(People::default())
            .before(|dt| {
                dt.edit_column("name", |row| json!(format!("{}X", row.text("name"))));
            })
            .response(|mut envelope| {
                for row in envelope.data.iter_mut() {
                    row.insert("email".to_string(), json!("hidden"));
                }
                envelope
            });

        let request = page(
            "action=csv&search%5Bvalue%5D=record-2\
             &order%5B0%5D%5Bcolumn%5D=0&order%5B0%5D%5Bdir%5D=desc",
        );
        match table.render(&request, "users", Map::new()).await.unwrap() {
            Rendered::Export(file) => {
                let body = String::from_utf8(file.body).unwrap();
                let lines: Vec<&str> = body.lines().collect();
                assert_eq!(
                    lines,
                    vec!["Id,Name,Email", "20,Record-20X,hidden", "2,Record-2X,hidden"]
                );
            }
            other => panic!("expected export, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pdf_export() {
        let table = context(false).await.table(People::default());
        match table.render(&page("action=pdf"), "users", Map::new()).await.unwrap() {
            Rendered::Export(file) => {
                assert_eq!(file.action, TableAction::Pdf);
                assert!(file.last_modified.is_none());
                assert!(file.body.starts_with(b"%PDF"));
            }
            other => panic!("expected export, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_print_uses_printable_columns() {
        let table = context(false).await.table(People::default());
        match table.render(&page("action=print"), "users", Map::new()).await.unwrap() {
            Rendered::Html(html) => {
                assert!(html.contains("<th>Name</th>"));
                assert!(html.contains("Record-20"));
                assert!(!html.contains("<th>Email</th>"));
            }
            other => panic!("expected html, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_becomes_error_envelope() {
        let service = People {
            table: "missing_table",
            ..People::default()
        };
        let table = context(false).await.table(service);
        let envelope = table.json(&ajax("draw=3")).await;
        assert_eq!(envelope.draw, 3);
        assert_eq!(envelope.records_total, 0);
        assert!(envelope.data.is_empty());
        assert_eq!(envelope.error.as_deref(), Some(GENERIC_ERROR));

        let service = People {
            table: "missing_table",
            ..People::default()
        };
        let table = context(true).await.table(service);
        let envelope = table.json(&ajax("")).await;
        assert!(envelope.error.unwrap().contains("missing_table"));
    }

    #[tokio::test]
    async fn test_invoke_requires_view() {
        let table = context(false).await.table(People::default());
        assert!(matches!(
            table.invoke(&page("")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_macros_are_shared_across_tables() {
        let context = context(false).await;
        context.macros.register("greet", |_| Ok(json!("hi")));

        let first = context.table(People::default());
        let second = context.table(People::default());
        assert_eq!(first.call_macro("greet", &[]).unwrap(), json!("hi"));
        assert_eq!(second.call_macro("greet", &[]).unwrap(), json!("hi"));
        assert!(matches!(
            second.call_macro("nope", &[]),
            Err(AppError::MethodNotFound(_))
        ));
    }
}
