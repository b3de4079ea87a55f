//! Configuration module for the edge-echo server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::runtime::{EchoMode, DEFAULT_EVENTS_CAPACITY};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the echo server
#[derive(Parser, Debug)]
#[command(name = "edge-echo")]
#[command(author = "edge-echo authors")]
#[command(version = "0.1.0")]
#[command(about = "An edge-triggered echo server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:8888)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen backlog (defaults to the platform maximum)
    #[arg(long)]
    pub backlog: Option<i32>,

    /// Maximum number of simultaneous connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Ready slots filled per poll
    #[arg(long)]
    pub max_events: Option<usize>,

    /// Poll timeout in milliseconds (-1 blocks indefinitely)
    #[arg(long, allow_hyphen_values = true)]
    pub poll_timeout_ms: Option<i32>,

    /// Read buffer size in bytes
    #[arg(short = 'b', long)]
    pub buffer_size: Option<usize>,

    /// What to send back for each chunk read
    #[arg(short = 'e', long, value_enum)]
    pub echo_mode: Option<EchoMode>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub reactor: ReactorConfig,
    #[serde(default)]
    pub echo: EchoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listening socket configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Listen backlog; platform maximum when unset
    pub backlog: Option<i32>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Poll loop configuration
#[derive(Debug, Deserialize)]
pub struct ReactorConfig {
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: i32,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            poll_timeout_ms: default_poll_timeout_ms(),
            buffer_size: default_buffer_size(),
        }
    }
}

/// Echo handler configuration
#[derive(Debug, Deserialize, Default)]
pub struct EchoConfig {
    #[serde(default)]
    pub mode: EchoMode,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8888".to_string()
}

fn default_max_connections() -> usize {
    10_000
}

fn default_max_events() -> usize {
    DEFAULT_EVENTS_CAPACITY
}

fn default_poll_timeout_ms() -> i32 {
    -1
}

fn default_buffer_size() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub backlog: Option<i32>,
    pub max_connections: usize,
    pub max_events: usize,
    pub poll_timeout_ms: i32,
    pub buffer_size: usize,
    pub echo_mode: EchoMode,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::merge(cli, toml_config)
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let config = Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            backlog: cli.backlog.or(toml_config.server.backlog),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            max_events: cli.max_events.unwrap_or(toml_config.reactor.max_events),
            poll_timeout_ms: cli
                .poll_timeout_ms
                .unwrap_or(toml_config.reactor.poll_timeout_ms),
            buffer_size: cli.buffer_size.unwrap_or(toml_config.reactor.buffer_size),
            echo_mode: cli.echo_mode.unwrap_or(toml_config.echo.mode),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size must be positive"));
        }
        if self.max_events == 0 {
            return Err(ConfigError::Invalid("max_events must be positive"));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be positive"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: default_listen(),
            backlog: None,
            max_connections: default_max_connections(),
            max_events: default_max_events(),
            poll_timeout_ms: default_poll_timeout_ms(),
            buffer_size: default_buffer_size(),
            echo_mode: EchoMode::default(),
            log_level: default_log_level(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    Invalid(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("edge-echo").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "127.0.0.1:8888");
        assert_eq!(config.server.backlog, None);
        assert_eq!(config.reactor.max_events, 1000);
        assert_eq!(config.reactor.poll_timeout_ms, -1);
        assert_eq!(config.reactor.buffer_size, 1024);
        assert_eq!(config.echo.mode, EchoMode::Exact);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "0.0.0.0:9999"
            backlog = 128
            max_connections = 64

            [reactor]
            max_events = 256
            poll_timeout_ms = 500
            buffer_size = 4096

            [echo]
            mode = "padded"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:9999");
        assert_eq!(config.server.backlog, Some(128));
        assert_eq!(config.server.max_connections, 64);
        assert_eq!(config.reactor.max_events, 256);
        assert_eq!(config.reactor.poll_timeout_ms, 500);
        assert_eq!(config.reactor.buffer_size, 4096);
        assert_eq!(config.echo.mode, EchoMode::Padded);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [server]
            listen = "0.0.0.0:9999"
            [echo]
            mode = "padded"
            [logging]
            level = "warn"
        "#,
        )
        .unwrap();

        let args = cli(&[
            "-l",
            "127.0.0.1:7000",
            "--poll-timeout-ms",
            "-1",
            "--echo-mode",
            "exact",
        ]);
        let config = Config::merge(args, toml_config).unwrap();
        assert_eq!(config.listen, "127.0.0.1:7000");
        assert_eq!(config.poll_timeout_ms, -1);
        assert_eq!(config.echo_mode, EchoMode::Exact);
        // CLI left the level at its default, so the file wins
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::merge(cli(&["-b", "0"]), TomlConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_args(cli(&["-c", "/nonexistent/edge-echo.toml"])).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_, _)));
    }
}
