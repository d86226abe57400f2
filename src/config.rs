//! Configuration loading and management.
//!
//! Lookup order: explicit path, `TASKDECK_CONFIG`, `./taskdeck.yaml`, then
//! built-in defaults. Environment variables are applied on top:
//! - `TASKDECK_DB_PATH` - Database path
//! - `TASKDECK_STATIC_DIR` - Writable static directory (uploads live below it)
//! - `TASKDECK_PORT` - HTTP port

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::imaging::DEFAULT_MAX_WIDTH;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "taskdeck.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// HTTP server and database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> PathBuf {
    PathBuf::from("todos.db")
}

/// Upload storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Writable static directory. Covers go to `<static_dir>/uploads/tasks`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Covers wider than this are scaled down.
    #[serde(default = "default_max_cover_width")]
    pub max_cover_width: u32,

    /// Maximum accepted request body for form submissions.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
            max_cover_width: default_max_cover_width(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_max_cover_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

fn default_max_upload_bytes() -> usize {
    10 << 20
}

impl StorageConfig {
    /// Root served at `/static/uploads`.
    pub fn uploads_root(&self) -> PathBuf {
        self.static_dir.join("uploads")
    }

    /// Directory holding task covers.
    pub fn covers_dir(&self) -> PathBuf {
        self.uploads_root().join("tasks")
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Resolve the configuration file and apply environment overrides.
    ///
    /// An explicit path must exist; the implicit locations are optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit {
            Self::load(path)?
        } else if let Ok(path) = std::env::var("TASKDECK_CONFIG") {
            Self::load(path)?
        } else if Path::new(DEFAULT_CONFIG_FILE).is_file() {
            Self::load(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `TASKDECK_*` overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup("TASKDECK_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Some(static_dir) = lookup("TASKDECK_STATIC_DIR") {
            self.storage.static_dir = PathBuf::from(static_dir);
        }

        if let Some(port) = lookup("TASKDECK_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid TASKDECK_PORT"),
            }
        }
    }

    /// Ensure the database directory and the covers directory exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::create_dir_all(self.storage.covers_dir())?;
        Ok(())
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
