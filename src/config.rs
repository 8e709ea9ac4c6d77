//! Configuration management for the Dilemma Machine
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! The resulting [`Config`] is built once at startup and passed to the
//! storage and service constructors.

use crate::error::{DilemmaError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application identity
    #[serde(default)]
    pub app: AppConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Database settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Application identity and deployment environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Display name, returned by the root endpoint
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_description")]
    pub description: String,

    /// Deployment environment ("development", "production", ...)
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_app_name() -> String {
    "AI Dilemma Machine".to_string()
}

fn default_app_description() -> String {
    "AI Dilemma Machine API".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            description: default_app_description(),
            environment: default_environment(),
        }
    }
}

impl AppConfig {
    /// Whether the service runs in production mode
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Prefix the game routes are mounted under (empty for `/`)
    #[serde(default = "default_root_path")]
    pub root_path: String,

    /// Upper bound on a single request's storage work (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_root_path() -> String {
    "/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            root_path: default_root_path(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file; defaults to the user's data directory
    #[serde(default)]
    pub database_path: Option<String>,

    /// How long a connection waits on a locked database (milliseconds)
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON-formatted log lines
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DilemmaError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| DilemmaError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(environment) = std::env::var("DILEMMA_ENVIRONMENT") {
            self.app.environment = environment;
        }

        if let Ok(bind) = std::env::var("DILEMMA_BIND") {
            self.server.bind = bind;
        }

        if let Ok(root_path) = std::env::var("DILEMMA_ROOT_PATH") {
            self.server.root_path = root_path;
        }

        if let Ok(db_path) = std::env::var("DILEMMA_DATABASE_PATH") {
            tracing::debug!(db_path = %db_path, "Env override: DILEMMA_DATABASE_PATH");
            self.storage.database_path = Some(db_path);
        }

        if let Ok(timeout) = std::env::var("DILEMMA_BUSY_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse() {
                self.storage.busy_timeout_ms = value;
            } else {
                tracing::warn!("Invalid DILEMMA_BUSY_TIMEOUT_MS: {}", timeout);
            }
        }

        if let Ok(json) = std::env::var("DILEMMA_JSON_LOGS") {
            match json.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.logging.json = true,
                "0" | "false" | "no" | "off" => self.logging.json = false,
                _ => tracing::warn!("Invalid DILEMMA_JSON_LOGS: {}", json),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(db_path) = &cli.database {
            self.storage.database_path = Some(db_path.clone());
        }

        if cli.json_logs {
            self.logging.json = true;
        }

        if let crate::cli::Commands::Serve {
            bind: Some(bind), ..
        } = &cli.command
        {
            self.server.bind = bind.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `DilemmaError::Config` naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.app.name.trim().is_empty() {
            return Err(DilemmaError::Config("app.name cannot be empty".to_string()).into());
        }

        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(DilemmaError::Config(format!(
                "server.bind is not a valid socket address: {}",
                self.server.bind
            ))
            .into());
        }

        let root = &self.server.root_path;
        if !root.is_empty() && (!root.starts_with('/') || root.ends_with('/')) {
            return Err(DilemmaError::Config(format!(
                "server.root_path must be empty or start with '/' and not end with '/': {}",
                root
            ))
            .into());
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(DilemmaError::Config(
                "server.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if let Some(path) = &self.storage.database_path {
            if path.trim().is_empty() {
                return Err(DilemmaError::Config(
                    "storage.database_path cannot be empty".to_string(),
                )
                .into());
            }
        }

        if self.storage.busy_timeout_ms == 0 {
            return Err(DilemmaError::Config(
                "storage.busy_timeout_ms must be greater than 0".to_string(),
            )
            .into());
        }

        let request_timeout_ms = self.server.request_timeout_seconds.saturating_mul(1000);
        if self.storage.busy_timeout_ms >= request_timeout_ms {
            return Err(DilemmaError::Config(format!(
                "storage.busy_timeout_ms ({}) must be shorter than server.request_timeout_seconds ({}s)",
                self.storage.busy_timeout_ms, self.server.request_timeout_seconds
            ))
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use serial_test::serial;

    fn serve_cli() -> Cli {
        Cli {
            config: None,
            verbose: false,
            json_logs: false,
            database: None,
            command: Commands::Serve { bind: None },
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app.name, "AI Dilemma Machine");
        assert_eq!(config.app.environment, "development");
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.server.root_path, "/api");
        assert_eq!(config.storage.busy_timeout_ms, 5_000);
        assert!(config.storage.database_path.is_none());
        assert!(!config.logging.json);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_bind() {
        let mut config = Config::default();
        config.server.bind = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_root_path_shapes() {
        let mut config = Config::default();

        config.server.root_path = String::new();
        assert!(config.validate().is_ok());

        config.server.root_path = "api".to_string();
        assert!(config.validate().is_err());

        config.server.root_path = "/api/".to_string();
        assert!(config.validate().is_err());

        config.server.root_path = "/v1/api".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_timeouts() {
        let mut config = Config::default();
        config.storage.busy_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.request_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_busy_timeout_below_request_timeout() {
        let mut config = Config::default();
        config.server.request_timeout_seconds = 1;
        config.storage.busy_timeout_ms = 1_000;
        assert!(config.validate().is_err());

        config.storage.busy_timeout_ms = 5_000;
        assert!(config.validate().is_err());

        config.storage.busy_timeout_ms = 999;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_database_path() {
        let mut config = Config::default();
        config.storage.database_path = Some("  ".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("database_path"));
    }

    #[test]
    fn test_production_detection() {
        let mut app = AppConfig::default();
        assert!(!app.is_production());
        app.environment = "Production".to_string();
        assert!(app.is_production());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
app:
  name: Dilemma Test
  environment: production
server:
  bind: 0.0.0.0:9000
  root_path: ""
storage:
  database_path: /tmp/dilemma-test.db
logging:
  json: true
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.app.name, "Dilemma Test");
        assert!(config.app.is_production());
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.root_path, "");
        assert_eq!(config.server.request_timeout_seconds, 30);
        assert_eq!(
            config.storage.database_path.as_deref(),
            Some("/tmp/dilemma-test.db")
        );
        assert_eq!(config.storage.busy_timeout_ms, 5_000);
        assert!(config.logging.json);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("server:\n  bind: 127.0.0.1:1234\n").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:1234");
        assert_eq!(config.server.root_path, "/api");
        assert_eq!(config.app.name, "AI Dilemma Machine");
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let config = Config::load("nonexistent.yaml", &serve_cli()).unwrap();
        assert_eq!(config.app.name, "AI Dilemma Machine");
    }

    #[test]
    #[serial]
    fn test_load_invalid_yaml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server: [unclosed").unwrap();

        let err = Config::load(path.to_str().unwrap(), &serve_cli()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DilemmaError>(),
            Some(DilemmaError::Config(_))
        ));
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_fields() {
        std::env::set_var("DILEMMA_ENVIRONMENT", "production");
        std::env::set_var("DILEMMA_BIND", "0.0.0.0:8080");
        std::env::set_var("DILEMMA_ROOT_PATH", "");
        std::env::set_var("DILEMMA_DATABASE_PATH", "/tmp/env.db");
        std::env::set_var("DILEMMA_BUSY_TIMEOUT_MS", "750");
        std::env::set_var("DILEMMA_JSON_LOGS", "true");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("DILEMMA_ENVIRONMENT");
        std::env::remove_var("DILEMMA_BIND");
        std::env::remove_var("DILEMMA_ROOT_PATH");
        std::env::remove_var("DILEMMA_DATABASE_PATH");
        std::env::remove_var("DILEMMA_BUSY_TIMEOUT_MS");
        std::env::remove_var("DILEMMA_JSON_LOGS");

        assert!(config.app.is_production());
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.server.root_path, "");
        assert_eq!(config.storage.database_path.as_deref(), Some("/tmp/env.db"));
        assert_eq!(config.storage.busy_timeout_ms, 750);
        assert!(config.logging.json);
    }

    #[test]
    #[serial]
    fn test_invalid_env_timeout_is_ignored() {
        std::env::set_var("DILEMMA_BUSY_TIMEOUT_MS", "soon");
        let mut config = Config::default();
        config.apply_env_vars();
        std::env::remove_var("DILEMMA_BUSY_TIMEOUT_MS");

        assert_eq!(config.storage.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let cli = Cli {
            config: None,
            verbose: false,
            json_logs: true,
            database: Some("/tmp/cli.db".to_string()),
            command: Commands::Serve {
                bind: Some("127.0.0.1:9999".to_string()),
            },
        };

        let mut config = Config::default();
        config.storage.database_path = Some("/tmp/file.db".to_string());
        config.apply_cli_overrides(&cli);

        assert_eq!(config.storage.database_path.as_deref(), Some("/tmp/cli.db"));
        assert_eq!(config.server.bind, "127.0.0.1:9999");
        assert!(config.logging.json);
    }
}
