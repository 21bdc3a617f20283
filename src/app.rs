use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::DataTableContext;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::ConfigService;
use crate::infrastructure::db::sqlite::Database;
use crate::interfaces::http::start_server;

pub async fn run() -> Result<()> {
    let config = ConfigService::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.filter.as_str()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let database = Database::connect(&config.database.url, config.database.max_connections).await?;
    let seeded = database.seed_users(config.database.seed_users).await?;
    info!(url = %config.database.url, seeded, "Database ready");

    let context = DataTableContext::new(database, config.datatables.clone())?;
    let server = start_server(context, &config.server)?;
    server
        .await
        .map_err(|e| AppError::Internal(format!("HTTP server stopped: {}", e)))
}
