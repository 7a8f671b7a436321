//! Configuration module
//!
//! Layered configuration: optional `config.toml` file, `SERVER_`-prefixed
//! environment overrides, and compiled-in defaults. Immutable once loaded.

use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;

/// Default listening port when neither file nor environment sets one.
pub const DEFAULT_PORT: u16 = 3003;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_MAX_BODY_SIZE: u64 = 1_048_576; // 1 MiB

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// Port 0 requests an OS-assigned ephemeral port
    pub port: u16,
    /// Worker threads; absent means a current-thread runtime
    pub workers: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    /// Access log format: "common" or "json"
    pub format: String,
    pub access_log_file: Option<String>,
    pub error_log_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Upper bound on buffered POST bodies, in bytes
    pub max_body_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// 0 disables HTTP/1.1 keep-alive
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("SERVER"))
            .set_default("server.host", DEFAULT_HOST)?
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("logging.access_log", true)?
            .set_default("logging.format", "common")?
            .set_default("http.max_body_size", DEFAULT_MAX_BODY_SIZE)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    /// Configuration with defaults everywhere except the port. Port 0
    /// yields an ephemeral port, used for isolated test runs.
    #[must_use]
    pub fn with_port(port: u16) -> Self {
        let mut cfg = Self::default();
        cfg.server.port = port;
        cfg
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                workers: None,
            },
            logging: LoggingConfig {
                access_log: true,
                format: "common".to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            http: HttpConfig {
                max_body_size: DEFAULT_MAX_BODY_SIZE,
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
                max_connections: None,
            },
        }
    }
}

/// Shared state handed to every connection task.
pub struct AppState {
    pub config: Config,
    /// Cached so the per-request hot path skips config lookups
    pub cached_access_log: AtomicBool,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let access_log = config.logging.access_log;
        Self {
            config,
            cached_access_log: AtomicBool::new(access_log),
        }
    }
}
