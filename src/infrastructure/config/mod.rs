use crate::domain::error::{AppError, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "datatables.toml";
pub const ENV_PREFIX: &str = "DATATABLES_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub datatables: DataTablesConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allow cross-origin grid requests from any origin.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Rows written to an empty `users` table at startup.
    pub seed_users: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 4,
            seed_users: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataTablesConfig {
    /// JS global the grids register themselves under.
    pub namespace: String,
    /// Put the underlying error message into AJAX error envelopes.
    pub error_detail: bool,
    /// Where file exports are staged; the system temp dir when unset.
    pub export_dir: Option<PathBuf>,
    /// Extra tera templates, e.g. `templates/**/*.html`.
    pub template_dir: Option<String>,
}

impl Default for DataTablesConfig {
    fn default() -> Self {
        Self {
            namespace: "LaravelDataTables".to_string(),
            error_detail: false,
            export_dir: None,
            template_dir: None,
        }
    }
}

impl DataTablesConfig {
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

pub struct ConfigService;

impl ConfigService {
    /// Defaults, then `datatables.toml`, then `DATATABLES_*` variables
    /// (`DATATABLES_SERVER__PORT=9000`).
    pub fn load() -> Result<AppConfig> {
        let _ = dotenvy::dotenv();
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<AppConfig> {
        Self::figment(path)
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
