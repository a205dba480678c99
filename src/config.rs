//! Configuration for the counter CLI, the TCP connection and the server.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | REDIS_COUNTER_ADDR | 127.0.0.1:6379 | Store address the client connects to |
//! | REDIS_COUNTER_CONNECT_TIMEOUT_MS | 1000 | TCP connect timeout |
//! | REDIS_COUNTER_IO_TIMEOUT_MS | 5000 | Read/write timeout, 0 disables |
//! | REDIS_COUNTER_LISTEN | 127.0.0.1:6379 | Address `counter-server` binds |
//! | REDIS_COUNTER_LOG | info | Default log filter (RUST_LOG wins) |
//! | REDIS_COUNTER_LOG_JSON | false | Emit JSON log lines |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub addr: String,
    pub connect_timeout_ms: u64,
    /// 0 means block forever.
    pub io_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            addr: "127.0.0.1:6379".to_string(),
            connect_timeout_ms: 1000,
            io_timeout_ms: 5000,
        }
    }
}

impl RedisConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        (self.io_timeout_ms > 0).then(|| Duration::from_millis(self.io_timeout_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen: "127.0.0.1:6379".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    InvalidEnv { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "invalid config file: {}", e),
            ConfigError::InvalidEnv { var, value } => {
                write!(f, "invalid value for {}: '{}'", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::InvalidEnv { .. } => None,
        }
    }
}

impl CounterConfig {
    /// File (if any) first, environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => CounterConfig::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("REDIS_COUNTER_ADDR") {
            self.redis.addr = addr;
        }
        if let Some(value) = lookup("REDIS_COUNTER_CONNECT_TIMEOUT_MS") {
            self.redis.connect_timeout_ms = parse_env("REDIS_COUNTER_CONNECT_TIMEOUT_MS", value)?;
        }
        if let Some(value) = lookup("REDIS_COUNTER_IO_TIMEOUT_MS") {
            self.redis.io_timeout_ms = parse_env("REDIS_COUNTER_IO_TIMEOUT_MS", value)?;
        }
        if let Some(listen) = lookup("REDIS_COUNTER_LISTEN") {
            self.server.listen = listen;
        }
        if let Some(level) = lookup("REDIS_COUNTER_LOG") {
            self.log.level = level;
        }
        if let Some(value) = lookup("REDIS_COUNTER_LOG_JSON") {
            self.log.json = value == "true" || value == "1";
        }
        Ok(())
    }
}

fn parse_env(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CounterConfig::default();
        assert_eq!(config.redis.addr, "127.0.0.1:6379");
        assert_eq!(config.redis.io_timeout(), Some(Duration::from_millis(5000)));
        assert_eq!(config.log.level, "info");
        assert!(!config.log.json);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CounterConfig::from_toml(
            r#"
            [redis]
            addr = "10.0.0.5:6380"
            io_timeout_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.redis.addr, "10.0.0.5:6380");
        assert_eq!(config.redis.io_timeout(), None);
        assert_eq!(config.redis.connect_timeout_ms, 1000);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[log]\nlevel = \"warn\"\njson = true").unwrap();
        let mut config = CounterConfig::from_file(file.path()).unwrap();

        let env: HashMap<&str, &str> = [
            ("REDIS_COUNTER_ADDR", "redis.internal:6379"),
            ("REDIS_COUNTER_IO_TIMEOUT_MS", "250"),
            ("REDIS_COUNTER_LOG", "debug"),
        ]
        .into_iter()
        .collect();
        config
            .apply_env(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.redis.addr, "redis.internal:6379");
        assert_eq!(config.redis.io_timeout_ms, 250);
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = CounterConfig::default();
        let err = config
            .apply_env(|var| (var == "REDIS_COUNTER_CONNECT_TIMEOUT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for REDIS_COUNTER_CONNECT_TIMEOUT_MS: 'soon'"
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            CounterConfig::from_toml("[redis]\naddr = 5"),
            Err(ConfigError::Parse(_))
        ));
    }
}
