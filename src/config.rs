use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::adapter::{DEFAULT_MAX_STATEMENT_BYTES, SqlDialect};
use crate::ingest::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, IngestOptions, RetryPolicy};

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageConfig {
    pub database: String,
    pub bind: String,
    pub port: u16,
    pub workers: usize,
    pub queue_capacity: usize,
    /// Total write attempts per statement, the first one included
    #[serde(alias = "max_retries")]
    pub max_attempts: u32,
    pub dialect: SqlDialect,
    pub max_statement_bytes: usize,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
    /// Directory of a static visualization frontend to serve at `/`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            database: default_database_path().to_string_lossy().into_owned(),
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_attempts: RetryPolicy::default().max_attempts,
            dialect: SqlDialect::default(),
            max_statement_bytes: DEFAULT_MAX_STATEMENT_BYTES,
            cors_origins: Vec::new(),
            static_dir: None,
        }
    }
}

impl LineageConfig {
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            retry: RetryPolicy::new(self.max_attempts),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database)
    }

    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let addr = format!("{}:{}", self.bind, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address {}: {}", addr, e))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("sqlineage.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from(".sqlineage").join("lineage.db")
}

/// Load the config file. A missing file yields defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<LineageConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(LineageConfig::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: LineageConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    Ok(config)
}

pub fn write_config(path: &Path, config: &LineageConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
