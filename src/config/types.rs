// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub health: HealthConfig,
    pub function: FunctionConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub workers: Option<usize>,
    /// Listen backlog passed to `listen(2)`
    pub backlog: i32,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// One of `error`, `warn`, `info`, `debug`
    pub level: String,
    pub access_log: bool,
    /// Access log format (`combined`, `common` or `json`)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Upper bound on the lifetime of a single connection, in seconds
    pub connection_timeout: u64,
    /// How long shutdown waits for in-flight connections, in seconds
    pub shutdown_grace: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

/// Health check configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    pub enabled: bool,
    pub liveness_path: String,
    pub readiness_path: String,
}

/// The hosted function's registration
#[derive(Debug, Deserialize, Clone)]
pub struct FunctionConfig {
    /// Name used in invocation log lines
    pub name: String,
    /// Path the function is mounted on
    pub route: String,
    pub compose: ComposeMode,
    /// Top-level field to extract when `compose = "json"`
    #[serde(default)]
    pub json_field: Option<String>,
    /// Largest upstream body accepted, in bytes
    pub upstream_max_body: u64,
}

/// How upstream data is folded into the greeting
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComposeMode {
    /// Append the raw upstream body
    #[default]
    Text,
    /// Parse the upstream body as JSON and append it (or one of its fields)
    Json,
}
