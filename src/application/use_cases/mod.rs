pub mod data_table;
pub mod html_builder;
pub mod macro_registry;
pub mod query_data_table;
pub mod users_data_table;
