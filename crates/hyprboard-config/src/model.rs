//! Configuration data model

use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub global: GlobalConfig,
}

/// Global settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
    /// Where remembered layouts live: `*.db`, `*.json` or `-` for memory only
    pub state_file: PathBuf,
    /// XKB rules catalog used to translate pretty layout names
    pub xkb_rules: PathBuf,
    /// How often a buffering store writes itself out
    pub flush_interval: Duration,
    /// Upper bound on a single control socket exchange, `None` disables it
    pub request_timeout: Option<Duration>,
}

/// Default location of the XKB rules catalog on most distributions
pub const DEFAULT_XKB_RULES: &str = "/usr/share/X11/xkb/rules/evdev.xml";

/// Default flush interval for the JSON store
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Default deadline for control socket requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            state_file: default_state_file(),
            xkb_rules: PathBuf::from(DEFAULT_XKB_RULES),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

/// `$XDG_DATA_HOME/hyprboard/data.db`, or `~/.local/share/hyprboard/data.db`
pub fn default_state_file() -> PathBuf {
    let data_home = std::env::var("XDG_DATA_HOME")
        .ok()
        .filter(|dir| !dir.is_empty())
        .unwrap_or_else(|| "~/.local/share".to_string());

    PathBuf::from(shellexpand::tilde(&data_home).into_owned())
        .join("hyprboard")
        .join("data.db")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}
