// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub app: AppConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// Application (router, views, sessions) configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Query field selecting the action
    #[serde(default = "default_action_field")]
    pub action_field: String,
    /// Action dispatched when the request names none
    #[serde(default = "default_action")]
    pub default_action: String,
    /// Script name appended to the directory in redirect locations
    #[serde(default)]
    pub entry_script: String,
    /// View directories, searched in order
    #[serde(default = "default_view_dirs")]
    pub view_dirs: Vec<String>,
    /// View file extension (without the dot)
    #[serde(default = "default_view_extension")]
    pub view_extension: String,
    /// Layout script wrapping rendered views
    #[serde(default = "default_layout")]
    pub layout: String,
    /// Session cookie name
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Seconds a session may stay idle before it expires
    #[serde(default = "default_session_ttl")]
    pub session_ttl: u64,
    /// Maximum nesting of forwarded actions
    #[serde(default = "default_max_forward_depth")]
    pub max_forward_depth: usize,
}

#[allow(clippy::missing_const_for_fn)]
fn default_action_field() -> String {
    "action".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_action() -> String {
    "index".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_view_dirs() -> Vec<String> {
    vec!["views".to_string()]
}

#[allow(clippy::missing_const_for_fn)]
fn default_view_extension() -> String {
    "html".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_layout() -> String {
    "layout".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_session_cookie() -> String {
    "NANOSESSID".to_string()
}

const fn default_session_ttl() -> u64 {
    1440
}

const fn default_max_forward_depth() -> usize {
    8
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            action_field: default_action_field(),
            default_action: default_action(),
            entry_script: String::new(),
            view_dirs: default_view_dirs(),
            view_extension: default_view_extension(),
            layout: default_layout(),
            session_cookie: default_session_cookie(),
            session_ttl: default_session_ttl(),
            max_forward_depth: default_max_forward_depth(),
        }
    }
}
