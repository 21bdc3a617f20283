pub mod config;
pub mod db;
pub mod export;
pub mod response;
pub mod view;
