// Configuration module entry point
// Loads application configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{ComposeMode, Config, FunctionConfig, HttpConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension).
    /// A missing file is not an error; environment variables prefixed with
    /// `TRIGGER` override file values (`TRIGGER_SERVER__PORT=9090`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("TRIGGER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 7071)?
            .set_default("server.backlog", 128)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 30)?
            .set_default("performance.shutdown_grace", 5)?
            .set_default("http.server_name", "http-trigger/0.1")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("health.enabled", true)?
            .set_default("health.liveness_path", "/healthz")?
            .set_default("health.readiness_path", "/readyz")?
            .set_default("function.name", "HttpTrigger")?
            .set_default("function.route", "/api/HttpTrigger")?
            .set_default("function.compose", "text")?
            .set_default("function.upstream_max_body", 8_388_608)? // 8MB
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/trigger").unwrap();
        assert_eq!(cfg.function.route, "/api/HttpTrigger");
        assert_eq!(cfg.function.compose, ComposeMode::Text);
        assert!(cfg.function.json_field.is_none());
        assert!(cfg.health.enabled);
        assert_eq!(cfg.http.max_body_size, 1_048_576);
        assert_eq!(cfg.server.backlog, 128);
        assert_eq!(cfg.function.upstream_max_body, 8_388_608);
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load_from("does-not-exist/trigger").unwrap();
        cfg.server.host = "0.0.0.0".to_string();
        cfg.server.port = 9090;
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 9090);

        cfg.server.host = "not an ip".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
