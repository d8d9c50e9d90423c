//! Configuration handling for the Mongo MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use clap::{Parser, ValueEnum};

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";

// Connection defaults
pub const DEFAULT_MONGODB_HOST: &str = "localhost";
pub const DEFAULT_MONGODB_PORT: u16 = 27017;
pub const DEFAULT_MONGODB_DATABASE: &str = "test";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Connection parameters the connect tool falls back to when the caller
/// omits a field.
#[derive(Debug, Clone)]
pub struct ConnectDefaults {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Configuration for the Mongo MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mongo-mcp-server",
    about = "MCP server for MongoDB - enables AI assistants to inspect and query a live database",
    version,
    author
)]
pub struct Config {
    /// Full MongoDB connection string. When set, the server connects on
    /// startup; the connect tool can still replace the connection later.
    /// Sensitive - never logged.
    #[arg(long, value_name = "URI", env = "MONGODB_URI")]
    pub uri: Option<String>,

    /// MongoDB host used as the connect tool's default
    #[arg(long, default_value = DEFAULT_MONGODB_HOST, env = "MONGODB_HOST")]
    pub host: String,

    /// MongoDB port used as the connect tool's default
    #[arg(long, default_value_t = DEFAULT_MONGODB_PORT, env = "MONGODB_PORT")]
    pub port: u16,

    /// Default database targeted by tools
    #[arg(long, default_value = DEFAULT_MONGODB_DATABASE, env = "MONGODB_DATABASE")]
    pub database: String,

    /// Username for authentication (sensitive - never logged)
    #[arg(long, env = "MONGODB_USER")]
    pub user: Option<String>,

    /// Password for authentication (sensitive - never logged)
    #[arg(long, env = "MONGODB_PASSWORD")]
    pub password: Option<String>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output (disabled by default to avoid interfering with stdio transport)
    #[arg(long, env = "MCP_ENABLE_LOGS")]
    pub enable_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            uri: None,
            host: DEFAULT_MONGODB_HOST.to_string(),
            port: DEFAULT_MONGODB_PORT,
            database: DEFAULT_MONGODB_DATABASE.to_string(),
            user: None,
            password: None,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Defaults for the connect tool, drawn from CLI/env configuration.
    pub fn connect_defaults(&self) -> ConnectDefaults {
        ConnectDefaults {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.http_host, DEFAULT_HTTP_HOST);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 27017);
        assert_eq!(config.database, "test");
        assert!(config.uri.is_none());
    }

    #[test]
    fn test_http_bind_addr() {
        let config = Config {
            http_host: "0.0.0.0".to_string(),
            http_port: 3000,
            ..Config::default()
        };
        assert_eq!(config.http_bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_connect_defaults_carry_credentials() {
        let config = Config {
            user: Some("svc".to_string()),
            password: Some("pw".to_string()),
            database: "inventory".to_string(),
            ..Config::default()
        };
        let defaults = config.connect_defaults();
        assert_eq!(defaults.user.as_deref(), Some("svc"));
        assert_eq!(defaults.password.as_deref(), Some("pw"));
        assert_eq!(defaults.database, "inventory");
    }

    #[test]
    fn test_transport_mode_display() {
        assert_eq!(TransportMode::Stdio.to_string(), "stdio");
        assert_eq!(TransportMode::Http.to_string(), "http");
    }
}
