pub mod column;
pub mod envelope;
pub mod error;
pub mod export;
pub mod query;
pub mod request;
pub mod row;
