//! Configuration management for the file server

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::storage::{StoreOptions, DEFAULT_MAX_NAME_ATTEMPTS};

/// Default upload ceiling: 3MB
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 3 * 1024 * 1024;

/// Rolled log files kept per appender
pub const DEFAULT_MAX_LOG_FILES: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub web: WebConfig,
    pub logging: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding the stored files
    pub data_dir: PathBuf,
    /// Cap on `name_N.ext` candidates tried per upload
    pub max_name_attempts: usize,
}

impl StorageConfig {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_name_attempts: self.max_name_attempts.max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Largest accepted file, in bytes
    pub max_size: u64,
    /// Required prefix of the uploaded part's content type
    pub allowed_content_prefix: String,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub static_dir: PathBuf,
    pub templates_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for rolling log files; `None` logs to stdout only
    pub dir: Option<PathBuf>,
    /// Rolled files kept per appender before the oldest is deleted
    pub max_files: usize,
}

/// Error reading configuration from the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("app/data"),
                max_name_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
            },
            upload: UploadConfig {
                max_size: DEFAULT_MAX_UPLOAD_SIZE,
                allowed_content_prefix: "image/".to_string(),
            },
            web: WebConfig {
                static_dir: PathBuf::from("app/static"),
                templates_dir: PathBuf::from("app/static/templates"),
            },
            logging: LogConfig {
                dir: Some(PathBuf::from("app/logs")),
                max_files: DEFAULT_MAX_LOG_FILES,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            storage: StorageConfig {
                data_dir: env::var("STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.data_dir),
                max_name_attempts: parse_var(
                    "MAX_NAME_ATTEMPTS",
                    defaults.storage.max_name_attempts,
                )?,
            },
            upload: UploadConfig {
                max_size: parse_var("MAX_UPLOAD_SIZE", defaults.upload.max_size)?,
                allowed_content_prefix: env::var("ALLOWED_CONTENT_PREFIX")
                    .unwrap_or(defaults.upload.allowed_content_prefix),
            },
            web: WebConfig {
                static_dir: env::var("STATIC_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.web.static_dir),
                templates_dir: env::var("TEMPLATES_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.web.templates_dir),
            },
            logging: LogConfig {
                dir: match env::var("LOG_DIR") {
                    Ok(dir) if dir.is_empty() => None,
                    Ok(dir) => Some(PathBuf::from(dir)),
                    Err(_) => defaults.logging.dir,
                },
                max_files: parse_var("LOG_MAX_FILES", defaults.logging.max_files)?,
            },
        })
    }
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}
