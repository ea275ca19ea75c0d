// Configuration management for the whois daemon
// Supports CLI arguments, environment variables and a config file (TOML)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use crate::store::tls::TlsMode;

/// BGP prefix whois daemon - answers whois lookups from the OpenBMP database
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "bgp-whoisd")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, env = "WHOISD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listening port
    #[arg(short, long, env = "WHOISD_PORT")]
    pub port: Option<u16>,

    /// Listening address
    #[arg(long, env = "WHOISD_BIND")]
    pub bind: Option<String>,

    /// Max number of connections handled at once
    #[arg(short = 't', long, env = "WHOISD_THREADS")]
    pub threads: Option<usize>,

    /// How long a connection waits for a free slot before being rejected (ms)
    #[arg(long)]
    pub slot_wait_ms: Option<u64>,

    /// Time given to in-flight connections on shutdown (ms)
    #[arg(long)]
    pub grace_ms: Option<u64>,

    /// Postgres hostname
    #[arg(long, env = "PGHOST")]
    pub pghost: Option<String>,

    /// Postgres port
    #[arg(long, env = "PGPORT")]
    pub pgport: Option<u16>,

    /// Postgres database name
    #[arg(long, env = "PGDATABASE")]
    pub pgdb: Option<String>,

    /// Postgres username
    #[arg(long, env = "PGUSER")]
    pub pguser: Option<String>,

    /// Postgres password
    #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
    pub pgpassword: Option<String>,

    /// Postgres TLS mode (disable, prefer, require)
    #[arg(long, env = "PGSSLMODE")]
    pub pgsslmode: Option<String>,

    /// Log filename
    #[arg(long, env = "WHOISD_LOGFILE")]
    pub logfile: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(short, long, env = "WHOISD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Debug logging to stdout
    #[arg(long)]
    pub debug: bool,
}

/// Configuration file structure (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default: 0.0.0.0)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Max connections handled at once, also the store pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Wait for a free connection slot in milliseconds
    #[serde(default = "default_slot_wait_ms")]
    pub slot_wait_ms: u64,

    /// Grace period on shutdown in milliseconds
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_pg_host")]
    pub host: String,

    #[serde(default = "default_pg_port")]
    pub port: u16,

    #[serde(default = "default_pg_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_pg_dbname")]
    pub dbname: String,

    #[serde(default = "default_sslmode")]
    pub sslmode: TlsMode,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Client identifier reported to the server
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

// Default value functions
fn default_port() -> u16 {
    43
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    10
}
fn default_slot_wait_ms() -> u64 {
    2000
}
fn default_shutdown_grace_ms() -> u64 {
    500
}
fn default_pg_host() -> String {
    "localhost".to_string()
}
fn default_pg_port() -> u16 {
    5432
}
fn default_pg_user() -> String {
    "postgres".to_string()
}
fn default_pg_dbname() -> String {
    "openbmp".to_string()
}
fn default_sslmode() -> TlsMode {
    TlsMode::Require
}
fn default_connect_timeout() -> u64 {
    4
}
fn default_application_name() -> String {
    "obmp-whoisd".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> PathBuf {
    PathBuf::from("/var/log/whoisd.log")
}

const MAX_SLOT_WAIT_MS: u64 = 60_000;

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            bind_address: default_bind_address(),
            max_connections: default_max_connections(),
            slot_wait_ms: default_slot_wait_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            host: default_pg_host(),
            port: default_pg_port(),
            user: default_pg_user(),
            password: String::new(),
            dbname: default_pg_dbname(),
            sslmode: default_sslmode(),
            connect_timeout_secs: default_connect_timeout(),
            application_name: default_application_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl ServerConfig {
    pub fn slot_wait(&self) -> Duration {
        Duration::from_millis(self.slot_wait_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Where log output goes
#[derive(Debug, Clone, PartialEq)]
pub enum LogOutput {
    Stdout,
    File(PathBuf),
}

/// Merged configuration from all sources, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub log_level: Level,
    pub log_output: LogOutput,
}

impl Config {
    /// Load configuration from all sources (CLI args, env, config file, defaults)
    /// Priority: CLI args > Environment variables > Config file > Defaults
    pub fn load() -> anyhow::Result<Self> {
        let cli_args = CliArgs::parse();
        let config_file = load_config_file(&cli_args)?;
        Self::merge(cli_args, config_file)
    }

    /// Overlay CLI/env values on top of the config file
    pub fn merge(cli_args: CliArgs, config_file: ConfigFile) -> anyhow::Result<Self> {
        let ConfigFile {
            mut server,
            mut database,
            logging,
        } = config_file;

        if let Some(port) = cli_args.port {
            server.port = port;
        }
        if let Some(bind) = cli_args.bind {
            server.bind_address = bind;
        }
        if let Some(threads) = cli_args.threads {
            server.max_connections = threads;
        }
        if let Some(slot_wait_ms) = cli_args.slot_wait_ms {
            server.slot_wait_ms = slot_wait_ms;
        }
        if let Some(grace_ms) = cli_args.grace_ms {
            server.shutdown_grace_ms = grace_ms;
        }

        if let Some(host) = cli_args.pghost {
            database.host = host;
        }
        if let Some(port) = cli_args.pgport {
            database.port = port;
        }
        if let Some(dbname) = cli_args.pgdb {
            database.dbname = dbname;
        }
        if let Some(user) = cli_args.pguser {
            database.user = user;
        }
        if let Some(password) = cli_args.pgpassword {
            database.password = password;
        }
        if let Some(mode) = cli_args.pgsslmode {
            database.sslmode = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }

        let (log_level, log_output) = if cli_args.debug {
            (Level::DEBUG, LogOutput::Stdout)
        } else {
            let level = cli_args.log_level.unwrap_or(logging.level);
            let file = cli_args.logfile.unwrap_or(logging.file);
            (parse_log_level(&level)?, LogOutput::File(file))
        };

        let config = Config {
            server,
            database,
            log_level,
            log_output,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.server.max_connections == 0 {
            anyhow::bail!("max connections must be at least 1");
        }
        if self.server.slot_wait_ms > MAX_SLOT_WAIT_MS {
            anyhow::bail!(
                "slot wait of {}ms exceeds the maximum of {}ms",
                self.server.slot_wait_ms,
                MAX_SLOT_WAIT_MS
            );
        }
        if self.database.host.is_empty() {
            anyhow::bail!("Postgres host is not set");
        }
        Ok(())
    }
}

fn load_config_file(cli_args: &CliArgs) -> anyhow::Result<ConfigFile> {
    if let Some(config_path) = &cli_args.config {
        let config_content = std::fs::read_to_string(config_path)?;
        return Ok(toml::from_str::<ConfigFile>(&config_content)?);
    }

    // Try loading from default locations
    let mut default_paths = vec![PathBuf::from("whoisd.toml")];
    if let Some(home) = std::env::var_os("HOME") {
        default_paths.push(PathBuf::from(home).join(".whoisd.toml"));
    }

    for path in default_paths {
        if path.exists() {
            let config_content = std::fs::read_to_string(&path)?;
            return Ok(toml::from_str::<ConfigFile>(&config_content)?);
        }
    }

    Ok(ConfigFile::default())
}

fn parse_log_level(level_str: &str) -> anyhow::Result<Level> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(anyhow::anyhow!("Invalid log level: {}", level_str)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.server.port, 43);
        assert_eq!(config.server.max_connections, 10);
        assert_eq!(config.server.slot_wait(), Duration::from_secs(2));
        assert_eq!(config.server.shutdown_grace(), Duration::from_millis(500));
        assert_eq!(config.database.sslmode, TlsMode::Require);
        assert_eq!(config.database.application_name, "obmp-whoisd");
    }

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("DEBUG"), Ok(Level::DEBUG)));
        assert!(parse_log_level("invalid").is_err());
    }

    #[test]
    fn test_parse_config_file() {
        let config: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 4343
            max_connections = 25

            [database]
            host = "db.example.net"
            sslmode = "disable"

            [logging]
            level = "warn"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 4343);
        assert_eq!(config.server.max_connections, 25);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.database.host, "db.example.net");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.sslmode, TlsMode::Disable);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = ConfigFile::default();
        file.server.port = 4343;
        file.database.host = "file-host".to_string();

        let cli = CliArgs {
            port: Some(10043),
            threads: Some(3),
            pghost: Some("cli-host".to_string()),
            pgsslmode: Some("prefer".to_string()),
            ..CliArgs::default()
        };

        let config = Config::merge(cli, file).unwrap();
        assert_eq!(config.server.port, 10043);
        assert_eq!(config.server.max_connections, 3);
        assert_eq!(config.server.listen_address(), "0.0.0.0:10043");
        assert_eq!(config.database.host, "cli-host");
        assert_eq!(config.database.sslmode, TlsMode::Prefer);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.log_output, LogOutput::File(PathBuf::from("/var/log/whoisd.log")));
    }

    #[test]
    fn test_debug_logs_to_stdout() {
        let cli = CliArgs {
            debug: true,
            log_level: Some("error".to_string()),
            ..CliArgs::default()
        };

        let config = Config::merge(cli, ConfigFile::default()).unwrap();
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.log_output, LogOutput::Stdout);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cli = CliArgs {
            threads: Some(0),
            ..CliArgs::default()
        };
        assert!(Config::merge(cli, ConfigFile::default()).is_err());

        let cli = CliArgs {
            pgsslmode: Some("verify-full".to_string()),
            ..CliArgs::default()
        };
        assert!(Config::merge(cli, ConfigFile::default()).is_err());

        let cli = CliArgs {
            slot_wait_ms: Some(120_000),
            ..CliArgs::default()
        };
        assert!(Config::merge(cli, ConfigFile::default()).is_err());
    }
}
