pub mod sqlite;
pub mod table_source;
