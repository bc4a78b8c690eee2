// Configuration module entry point
// Loads settings from config.toml, environment, and built-in defaults

mod types;

use std::net::SocketAddr;

// Re-export public types
pub use types::{Config, CorsConfig, LoggingConfig, PerformanceConfig, ServerConfig};

impl Config {
    /// Load configuration from "config.toml" in the working directory
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; environment variables prefixed with `CORSD`
    /// override it, and built-in defaults fill the rest. The defaults
    /// serve the working directory on port 8000 with wide-open CORS.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("CORSD"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.root", ".")?
            .set_default("cors.allow_origin", "*")?
            .set_default("cors.allow_methods", "GET, POST, OPTIONS")?
            .set_default("cors.allow_headers", "Content-Type")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
