//! Configuration management for the pool proxy

use crate::core::Network;
use crate::error::{Error, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Highest instance id that still fits the extra-nonce seed
pub const MAX_INSTANCE_ID: u32 = 31;

/// Command-line arguments
#[derive(Parser, Debug, Default)]
#[clap(
    name = "pool-proxy",
    about = "Work distribution and share validation proxy for Equihash pools",
    version,
    author
)]
pub struct Args {
    /// Configuration file path
    #[clap(short, long, value_name = "FILE", env = "POOL_PROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Upstream node RPC URL (replaces upstreams from the config file)
    #[clap(short, long, env = "POOL_PROXY_UPSTREAM")]
    pub upstream: Option<String>,

    /// RPC user for the upstream given on the command line
    #[clap(long, env = "POOL_PROXY_RPC_USER")]
    pub rpc_user: Option<String>,

    /// RPC password for the upstream given on the command line
    #[clap(long, env = "POOL_PROXY_RPC_PASSWORD")]
    pub rpc_password: Option<String>,

    /// Share difficulty
    #[clap(short, long)]
    pub difficulty: Option<i64>,

    /// Network (main or test)
    #[clap(short, long)]
    pub network: Option<Network>,

    /// Log level
    #[clap(short, long)]
    pub log_level: Option<String>,

    /// Log format (plain, json)
    #[clap(long)]
    pub log_format: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[clap(long)]
    pub print_config: bool,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Proxy configuration
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Upstream nodes, the first is used
    #[serde(default, rename = "upstream")]
    pub upstreams: Vec<UpstreamConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Proxy behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Stratum listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Share difficulty handed to miners
    #[serde(default = "default_difficulty")]
    pub difficulty: i64,

    /// Template poll interval, e.g. "1s" or "500ms"
    #[serde(default = "default_block_refresh_interval")]
    pub block_refresh_interval: String,

    /// Network whose proof-of-work limit applies
    #[serde(default)]
    pub network: Network,

    /// Instance id, seeds extra-nonce allocation
    #[serde(default)]
    pub instance_id: u32,

    /// Invalid shares allowed per IP before a ban
    #[serde(default = "default_max_fails")]
    pub max_fails: u32,

    /// Broadcast jobs to stratum sessions
    #[serde(default = "default_true")]
    pub stratum_enabled: bool,
}

/// Upstream node connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Name used in logs
    pub name: String,

    /// JSON-RPC endpoint
    pub url: String,

    /// RPC user
    #[serde(default)]
    pub user: Option<String>,

    /// RPC password
    #[serde(default)]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (plain, json)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log to file
    pub file: Option<PathBuf>,
}

fn default_listen() -> String {
    "0.0.0.0:3333".to_string()
}

fn default_difficulty() -> i64 {
    1
}

fn default_block_refresh_interval() -> String {
    "1s".to_string()
}

fn default_max_fails() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "plain".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            difficulty: default_difficulty(),
            block_refresh_interval: default_block_refresh_interval(),
            network: Network::default(),
            instance_id: 0,
            max_fails: default_max_fails(),
            stratum_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl ProxyConfig {
    /// Parsed template poll interval
    pub fn refresh_interval(&self) -> Result<Duration> {
        humantime::parse_duration(&self.block_refresh_interval).map_err(|e| {
            Error::config(format!(
                "Invalid block_refresh_interval '{}': {}",
                self.block_refresh_interval, e
            ))
        })
    }
}

impl UpstreamConfig {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from command-line arguments, applying them over
    /// the config file when one is given
    pub fn from_args(args: Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        if let Some(url) = args.upstream {
            config.upstreams = vec![UpstreamConfig {
                name: "cli".to_string(),
                url,
                user: args.rpc_user,
                password: args.rpc_password,
                timeout_secs: default_timeout(),
            }];
        }
        if let Some(difficulty) = args.difficulty {
            config.proxy.difficulty = difficulty;
        }
        if let Some(network) = args.network {
            config.proxy.network = network;
        }
        if let Some(level) = args.log_level {
            config.logging.level = level;
        }
        if let Some(format) = args.log_format {
            config.logging.format = format;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.proxy.difficulty <= 0 {
            return Err(Error::config("Difficulty must be greater than 0"));
        }

        if self.proxy.refresh_interval()?.is_zero() {
            return Err(Error::config("block_refresh_interval must be greater than 0"));
        }

        if self.proxy.instance_id > MAX_INSTANCE_ID {
            return Err(Error::config(format!(
                "instance_id must be between 0 and {}",
                MAX_INSTANCE_ID
            )));
        }

        if self.upstreams.is_empty() {
            return Err(Error::config("At least one upstream is required"));
        }

        for upstream in &self.upstreams {
            url::Url::parse(&upstream.url).map_err(|e| {
                Error::config(format!(
                    "Invalid URL for upstream '{}': {}",
                    upstream.name, e
                ))
            })?;
            if upstream.timeout_secs == 0 {
                return Err(Error::config(format!(
                    "Timeout for upstream '{}' must be greater than 0",
                    upstream.name
                )));
            }
        }

        match self.logging.format.as_str() {
            "plain" | "json" => {}
            other => return Err(Error::config(format!("Unknown log format: {}", other))),
        }

        Ok(())
    }

    /// Upstream used for templates and block submission
    pub fn primary_upstream(&self) -> Result<&UpstreamConfig> {
        self.upstreams
            .first()
            .ok_or_else(|| Error::config("At least one upstream is required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn upstream() -> UpstreamConfig {
        UpstreamConfig {
            name: "main".to_string(),
            url: "http://127.0.0.1:8232".to_string(),
            user: None,
            password: None,
            timeout_secs: 10,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.proxy.difficulty, 1);
        assert_eq!(config.proxy.network, Network::Test);
        assert_eq!(config.proxy.max_fails, 100);
        assert!(config.proxy.stratum_enabled);
        assert_eq!(
            config.proxy.refresh_interval().unwrap(),
            Duration::from_secs(1)
        );
        // no upstream configured
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config {
            upstreams: vec![upstream()],
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        config.proxy.difficulty = 0;
        assert!(config.validate().is_err());
        config.proxy.difficulty = 8;

        config.proxy.block_refresh_interval = "soon".to_string();
        assert!(config.validate().is_err());
        config.proxy.block_refresh_interval = "250ms".to_string();
        assert!(config.validate().is_ok());

        config.proxy.instance_id = 32;
        assert!(config.validate().is_err());
        config.proxy.instance_id = 31;

        config.upstreams[0].url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.upstreams[0].url = "http://node:8232".to_string();

        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[proxy]
difficulty = 16
block_refresh_interval = "2s"
network = "main"
instance_id = 3

[[upstream]]
name = "main"
url = "http://127.0.0.1:8232"
user = "rpc"
password = "secret"

[[upstream]]
name = "backup"
url = "http://127.0.0.1:18232"
timeout_secs = 5

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.proxy.difficulty, 16);
        assert_eq!(config.proxy.network, Network::Main);
        assert_eq!(config.proxy.instance_id, 3);
        assert_eq!(config.proxy.max_fails, 100);
        assert_eq!(config.upstreams.len(), 2);
        assert_eq!(config.primary_upstream().unwrap().user.as_deref(), Some("rpc"));
        assert_eq!(config.upstreams[1].timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_from_file_errors() {
        let err = Config::from_file(Path::new("/nonexistent/proxy.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[proxy]\ndifficulty = \"high\"\n").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_args_override() {
        let args = Args {
            upstream: Some("http://10.0.0.1:8232".to_string()),
            rpc_user: Some("u".to_string()),
            difficulty: Some(4),
            network: Some(Network::Main),
            log_level: Some("trace".to_string()),
            ..Args::default()
        };

        let config = Config::from_args(args).unwrap();
        assert_eq!(config.upstreams[0].url, "http://10.0.0.1:8232");
        assert_eq!(config.upstreams[0].user.as_deref(), Some("u"));
        assert_eq!(config.proxy.difficulty, 4);
        assert_eq!(config.proxy.network, Network::Main);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            upstreams: vec![upstream()],
            ..Config::default()
        };
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("[proxy]"));
        assert!(toml.contains("[[upstream]]"));
        assert!(toml.contains("[logging]"));
    }
}
