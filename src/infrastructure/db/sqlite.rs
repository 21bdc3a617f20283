use crate::domain::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const USERS_SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    created_at TEXT,
    updated_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_users_name ON users (name);
";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // Each in-memory connection is its own database, so keep exactly one
        // connection alive for the lifetime of the pool.
        let pool = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .acquire_timeout(Duration::from_secs(5))
                .connect_with(options)
                .await
        }
        .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        let database = Self { pool };
        database.apply_migrations().await?;
        Ok(database)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn apply_migrations(&self) -> Result<()> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to read user_version: {}", e)))?;

        if version < 1 {
            for statement in USERS_SCHEMA_V1.split(';') {
                let stmt = statement.trim();
                if stmt.is_empty() {
                    continue;
                }
                sqlx::query(stmt).execute(&self.pool).await.map_err(|e| {
                    AppError::DatabaseError(format!("Failed to apply users schema: {}", e))
                })?;
            }
            sqlx::query("PRAGMA user_version = 1")
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to set user_version: {}", e))
                })?;
        }

        Ok(())
    }

    /// Inserts `Record-1 .. Record-N` when the users table is empty.
    /// Returns the number of rows written.
    pub async fn seed_users(&self, count: u32) -> Result<u64> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count users: {}", e)))?;
        if existing > 0 || count == 0 {
            return Ok(0);
        }

        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin seed: {}", e)))?;

        for i in 1..=count {
            sqlx::query(
                "INSERT INTO users (name, email, created_at, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(format!("Record-{}", i))
            .bind(format!("Email-{}@example.com", i))
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to seed user {}: {}", i, e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit seed: {}", e)))?;

        info!(count, "Seeded users table");
        Ok(count as u64)
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
