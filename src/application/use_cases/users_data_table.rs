use serde_json::{json, Map, Value};
use sqlx::SqlitePool;

use super::data_table::DataTableService;
use super::html_builder::HtmlBuilder;
use crate::domain::column::Column;
use crate::domain::error::Result;
use crate::domain::request::SortDirection;
use crate::infrastructure::db::table_source::TableSource;
use crate::infrastructure::view::USERS_VIEW;

pub const USERS_TABLE_ID: &str = "users-table";

/// The `users` grid.
#[derive(Debug, Clone, Default)]
pub struct UsersDataTable;

impl DataTableService for UsersDataTable {
    fn source(&self, pool: &SqlitePool) -> Result<TableSource> {
        TableSource::new(
            pool.clone(),
            "users",
            &["id", "name", "email", "created_at", "updated_at"],
        )
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            Column::make("id").title("ID"),
            Column::make("name"),
            Column::make("email"),
            Column::make("created_at"),
            Column::make("updated_at"),
        ]
    }

    fn html(&self, builder: HtmlBuilder) -> HtmlBuilder {
        builder
            .set_table_id(USERS_TABLE_ID)
            .columns(self.columns())
            .min_ajax()
            .dom("Bfrtip")
            .order_by(0, SortDirection::Asc)
            .buttons(&["csv", "excel", "pdf", "print", "reset", "reload"])
    }

    fn filename(&self) -> String {
        "users".to_string()
    }

    fn view(&self) -> Option<&str> {
        Some(USERS_VIEW)
    }

    fn view_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("description".to_string(), json!("This is a test description"));
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_builder_uses_users_table_id() {
        let builder = UsersDataTable.html(HtmlBuilder::new());
        assert_eq!(builder.table_id(), USERS_TABLE_ID);
        assert_eq!(builder.get_columns().len(), 5);
        assert!(builder.table().contains("<th>Created At</th>"));
    }

    #[test]
    fn test_route_view_data() {
        assert_eq!(UsersDataTable.view(), Some("users"));
        assert_eq!(
            UsersDataTable.view_data()["description"],
            "This is a test description"
        );
    }
}
