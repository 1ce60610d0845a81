// Configuration module entry point
// Layers the config file, NANO_* environment variables and defaults

mod types;

use std::net::SocketAddr;

// Re-export public types
pub use types::{AppConfig, Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

impl Config {
    /// Load configuration from specified file path (without extension)
    /// A missing file is not an error; defaults and environment apply.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("NANO").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "nanotools/0.4")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
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
        let cfg = Config::load_from("does-not-exist/nanotools").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.http.max_body_size, 10_485_760);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.app.action_field, "action");
        assert_eq!(cfg.app.default_action, "index");
        assert_eq!(cfg.app.view_dirs, vec!["views".to_string()]);
        assert_eq!(cfg.app.max_forward_depth, 8);
        assert_eq!(cfg.app.session_ttl, 1440);
    }

    #[test]
    fn test_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9090\n\n[app]\ndefault_action = \"home\"\nlayout = \"base\"\n",
        )
        .unwrap();

        let base = dir.path().join("site");
        let cfg = Config::load_from(base.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.app.default_action, "home");
        assert_eq!(cfg.app.layout, "base");
        // Untouched app fields keep their defaults
        assert_eq!(cfg.app.session_cookie, "NANOSESSID");
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 9090);
    }
}
