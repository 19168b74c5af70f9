//! Command-line interface for the session-keeper demo server.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::config::CookieExpiry;

/// Command-line arguments.
///
/// Unset options leave the configuration file and environment untouched.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Session store type (`SESSION_TYPE`).
    pub store: Option<String>,
    /// Cookie expiry policy (`SESSION_EXPIRES`).
    pub expires: Option<CookieExpiry>,
    /// File store directory (`SESSION_DATA_DIR`).
    pub data_dir: Option<PathBuf>,
    /// Idle timeout in seconds (`SESSION_TIMEOUT`).
    pub timeout: Option<u64>,
    /// Enable testing mode (`SESSION_TESTING`).
    pub testing: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('s') | Long("store") => {
                result.store = Some(parser.value()?.parse()?);
            }
            Short('e') | Long("expires") => {
                let value: String = parser.value()?.parse()?;
                result.expires = Some(
                    CookieExpiry::parse(&value)
                        .ok_or(ArgsError::InvalidValue("expires", value))?,
                );
            }
            Short('d') | Long("data-dir") => {
                result.data_dir = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                result.timeout = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("timeout", value))?,
                );
            }
            Long("testing") => {
                result.testing = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"session-keeper {version}
Server-side cookie sessions demo server

USAGE:
    session-keeper [OPTIONS]

OPTIONS:
    -H, --host <ADDR>       Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>       Port to listen on [default: 3000]
    -c, --config <FILE>     Path to configuration file (JSON)
    -s, --store <TYPE>      Session store: file, memory
    -e, --expires <POLICY>  Cookie expiry: true (browser session), false, or seconds
    -d, --data-dir <DIR>    Directory for the file store
    -t, --timeout <SECS>    Idle timeout in seconds
        --testing           Allow out-of-band session access
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    SESSION_TYPE, SESSION_EXPIRES, SESSION_DATA_DIR, SESSION_TIMEOUT,
    SESSION_TESTING, SESSION_COOKIE_NAME, SESSION_COOKIE_PATH,
    SESSION_COOKIE_DOMAIN, SESSION_COOKIE_SECURE, SESSION_COOKIE_HTTPONLY,
    SESSION_SAVE_ACCESSED_TIME
                            Session options (override config file)
    SESSION_KEEPER_HOST     Host address (overrides config)
    SESSION_KEEPER_PORT     Port number (overrides config)
    SESSION_KEEPER_LOG_LEVEL
                            Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # In-memory sessions that end with the browser session
    session-keeper -s memory -e true

    # File-backed sessions, one hour cookies, 15 minute idle timeout
    session-keeper -s file -d ./sessions -e 3600 -t 900

    # Start with config file
    session-keeper -c /etc/session-keeper/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("session-keeper {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
