pub mod use_cases;

pub use use_cases::data_table::{DataTable, DataTableContext, DataTableService, Rendered};
pub use use_cases::html_builder::HtmlBuilder;
pub use use_cases::macro_registry::{MacroRegistry, Mixin};
pub use use_cases::query_data_table::QueryDataTable;
pub use use_cases::users_data_table::UsersDataTable;
