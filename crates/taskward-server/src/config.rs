//! Application configuration, read from `config/<ENV>.yaml`.
//!
//! Every section has defaults, so a partial file (or none at all) is valid.
//! The inference limits are validated later, when the manager is built.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use taskward_core::ManagerConfig;

const DEFAULT_ENV: &str = "local";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_name: String,
    pub api: ApiConfig,
    pub inference: ManagerConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "taskward".to_string(),
            api: ApiConfig::default(),
            inference: ManagerConfig::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub title: String,
    pub description: String,
    pub version: String,
    /// Path prefix for the task routes. Empty mounts them at the root.
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            title: "Taskward API".to_string(),
            description: "Asynchronous inference task service".to_string(),
            version: "1.0.0".to_string(),
            prefix: "/api/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
    /// Also write to a file that rolls over daily.
    pub file_enabled: bool,
    /// Base path of the log file; the date is appended on rotation.
    pub file_path: PathBuf,
    /// Rotated files to keep.
    pub file_max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file_enabled: false,
            file_path: PathBuf::from("logs/taskward.log"),
            file_max_files: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// `config/<env>.yaml`, with `env` falling back to `local`.
pub fn default_path(env: Option<&str>) -> PathBuf {
    let env = env.map(str::trim).filter(|e| !e.is_empty()).unwrap_or(DEFAULT_ENV);
    Path::new("config").join(format!("{env}.yaml"))
}

/// Read and parse `path`. `Ok(None)` means the file does not exist.
pub fn load(path: &Path) -> Result<Option<AppConfig>, LoadError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse(&text)
        .map(Some)
        .map_err(|source| LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })
}

fn parse(text: &str) -> Result<AppConfig, serde_yaml::Error> {
    // An empty document deserializes as unit, not as an empty mapping.
    if text.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(text)
}
