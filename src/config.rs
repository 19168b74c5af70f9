//! Configuration management for session-keeper.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values
//!
//! Session options use the `SESSION_*` keys both in the JSON file (inside the
//! `session` section) and as environment variables. [`SessionSettings`] holds
//! them as given; [`SessionSettings::resolve`] validates them once into
//! [`SessionOptions`]. `SESSION_TYPE` and `SESSION_EXPIRES` have no defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::error::SessionError;

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "session.id";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Session configuration.
    pub session: SessionSettings,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Cookie lifetime policy.
///
/// In configuration this is `true` (cookie dies with the browser session),
/// `false` (persistent cookie) or a number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ExpiryValue", into = "ExpiryValue")]
pub enum CookieExpiry {
    /// No `Max-Age`; the browser drops the cookie when it closes.
    BrowserSession,
    /// Long-lived cookie.
    Never,
    /// Cookie lives for the given duration.
    After(Duration),
}

impl CookieExpiry {
    /// Parse the textual form used by environment variables and CLI flags.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Self::BrowserSession),
            "false" => Some(Self::Never),
            other => other
                .parse::<u64>()
                .ok()
                .map(|secs| Self::After(Duration::from_secs(secs))),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ExpiryValue {
    Flag(bool),
    Seconds(u64),
}

impl From<ExpiryValue> for CookieExpiry {
    fn from(value: ExpiryValue) -> Self {
        match value {
            ExpiryValue::Flag(true) => Self::BrowserSession,
            ExpiryValue::Flag(false) => Self::Never,
            ExpiryValue::Seconds(secs) => Self::After(Duration::from_secs(secs)),
        }
    }
}

impl From<CookieExpiry> for ExpiryValue {
    fn from(value: CookieExpiry) -> Self {
        match value {
            CookieExpiry::BrowserSession => Self::Flag(true),
            CookieExpiry::Never => Self::Flag(false),
            CookieExpiry::After(duration) => Self::Seconds(duration.as_secs()),
        }
    }
}

/// Session options as given by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Store backend selector: `file`, `memory`, or an external store name.
    #[serde(rename = "SESSION_TYPE")]
    pub session_type: Option<String>,
    /// Cookie lifetime policy.
    #[serde(rename = "SESSION_EXPIRES")]
    pub expires: Option<CookieExpiry>,
    /// Directory for the file store.
    #[serde(rename = "SESSION_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
    /// Idle timeout in seconds.
    #[serde(rename = "SESSION_TIMEOUT")]
    pub timeout: Option<u64>,
    /// Allow out-of-band session access.
    #[serde(rename = "SESSION_TESTING")]
    pub testing: bool,
    #[serde(rename = "SESSION_COOKIE_NAME")]
    pub cookie_name: Option<String>,
    #[serde(rename = "SESSION_COOKIE_PATH")]
    pub cookie_path: Option<String>,
    #[serde(rename = "SESSION_COOKIE_DOMAIN")]
    pub cookie_domain: Option<String>,
    #[serde(rename = "SESSION_COOKIE_SECURE")]
    pub cookie_secure: bool,
    #[serde(rename = "SESSION_COOKIE_HTTPONLY")]
    pub cookie_http_only: Option<bool>,
    /// Rewrite bound sessions on every request to refresh their idle expiry.
    #[serde(rename = "SESSION_SAVE_ACCESSED_TIME")]
    pub save_accessed_time: Option<bool>,
}

/// Which backing store to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreType {
    /// One file per session under `SESSION_DATA_DIR`.
    File,
    /// Process-local map.
    Memory,
    /// A backend supplied by the caller (cache server, database, ...).
    External(String),
}

impl StoreType {
    fn parse(value: &str) -> Result<Self, SessionError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" => Err(SessionError::Configuration("SESSION_TYPE is empty".into())),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Ok(Self::External(other.to_string())),
        }
    }
}

/// Attributes forwarded onto the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
        }
    }
}

/// Validated session options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Backing store selector.
    pub store: StoreType,
    /// Cookie lifetime policy.
    pub cookie_expiry: CookieExpiry,
    /// Data directory for the file store.
    pub data_dir: Option<PathBuf>,
    /// Idle timeout; `None` means sessions never idle out.
    pub idle_timeout: Option<Duration>,
    /// Whether out-of-band access through the restoration path is allowed.
    pub testing: bool,
    /// Cookie attributes.
    pub cookie: CookieOptions,
    /// Rewrite bound sessions even when clean.
    pub save_accessed_time: bool,
}

impl SessionOptions {
    /// Options with the two mandatory values and documented defaults for
    /// everything else.
    pub fn new(store: StoreType, cookie_expiry: CookieExpiry) -> Self {
        Self {
            store,
            cookie_expiry,
            data_dir: None,
            idle_timeout: None,
            testing: false,
            cookie: CookieOptions::default(),
            save_accessed_time: true,
        }
    }
}

impl SessionSettings {
    /// Validate the settings into [`SessionOptions`].
    pub fn resolve(&self) -> Result<SessionOptions, SessionError> {
        let store = self
            .session_type
            .as_deref()
            .ok_or_else(|| SessionError::Configuration("SESSION_TYPE is required".into()))
            .and_then(StoreType::parse)?;
        let cookie_expiry = self
            .expires
            .ok_or_else(|| SessionError::Configuration("SESSION_EXPIRES is required".into()))?;

        if store == StoreType::File && self.data_dir.is_none() {
            return Err(SessionError::Configuration(
                "SESSION_DATA_DIR is required when SESSION_TYPE is 'file'".into(),
            ));
        }
        if matches!(cookie_expiry, CookieExpiry::After(lifetime) if lifetime.as_secs() == 0) {
            return Err(SessionError::Configuration(
                "SESSION_EXPIRES must be true, false or a positive number of seconds".into(),
            ));
        }
        if self.timeout == Some(0) {
            return Err(SessionError::Configuration(
                "SESSION_TIMEOUT must be greater than zero".into(),
            ));
        }

        let defaults = CookieOptions::default();
        let cookie = CookieOptions {
            name: self.cookie_name.clone().unwrap_or(defaults.name),
            path: self.cookie_path.clone().unwrap_or(defaults.path),
            domain: self.cookie_domain.clone(),
            secure: self.cookie_secure,
            http_only: self.cookie_http_only.unwrap_or(defaults.http_only),
        };
        if cookie.name.is_empty() {
            return Err(SessionError::Configuration(
                "SESSION_COOKIE_NAME must not be empty".into(),
            ));
        }

        Ok(SessionOptions {
            store,
            cookie_expiry,
            data_dir: self.data_dir.clone(),
            idle_timeout: self.timeout.map(Duration::from_secs),
            testing: self.testing,
            cookie,
            save_accessed_time: self.save_accessed_time.unwrap_or(true),
        })
    }

    /// Apply `SESSION_*` environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("SESSION_TYPE") {
            self.session_type = Some(value);
        }
        if let Some(expiry) = env_parsed("SESSION_EXPIRES", CookieExpiry::parse) {
            self.expires = Some(expiry);
        }
        if let Ok(dir) = std::env::var("SESSION_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(timeout) = env_parsed("SESSION_TIMEOUT", |v| v.parse().ok()) {
            self.timeout = Some(timeout);
        }
        if let Some(testing) = env_parsed("SESSION_TESTING", parse_flag) {
            self.testing = testing;
        }
        if let Ok(name) = std::env::var("SESSION_COOKIE_NAME") {
            self.cookie_name = Some(name);
        }
        if let Ok(path) = std::env::var("SESSION_COOKIE_PATH") {
            self.cookie_path = Some(path);
        }
        if let Ok(domain) = std::env::var("SESSION_COOKIE_DOMAIN") {
            self.cookie_domain = Some(domain);
        }
        if let Some(secure) = env_parsed("SESSION_COOKIE_SECURE", parse_flag) {
            self.cookie_secure = secure;
        }
        if let Some(http_only) = env_parsed("SESSION_COOKIE_HTTPONLY", parse_flag) {
            self.cookie_http_only = Some(http_only);
        }
        if let Some(save) = env_parsed("SESSION_SAVE_ACCESSED_TIME", parse_flag) {
            self.save_accessed_time = Some(save);
        }
    }
}

fn env_parsed<T>(name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let value = std::env::var(name).ok()?;
    let parsed = parse(&value);
    if parsed.is_none() {
        tracing::warn!(variable = name, value = %value, "ignoring unparsable environment variable");
    }
    parsed
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`/`yes`/`no`).
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SESSION_KEEPER_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("SESSION_KEEPER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(level) = std::env::var("SESSION_KEEPER_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }

        self.session.apply_env();
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref store) = args.store {
            self.session.session_type = Some(store.clone());
        }
        if let Some(expires) = args.expires {
            self.session.expires = Some(expires);
        }
        if let Some(ref dir) = args.data_dir {
            self.session.data_dir = Some(dir.clone());
        }
        if let Some(timeout) = args.timeout {
            self.session.timeout = Some(timeout);
        }
        if args.testing {
            self.session.testing = true;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Config::default();

        // Load from config file if specified
        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Address the demo server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration file errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
