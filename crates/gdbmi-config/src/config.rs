use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How records are printed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Wire form, one record per line.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Log verbosity level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Every line sent and received.
    Debug,
    /// Process lifecycle (default).
    #[default]
    Info,
    /// Rejected lines and stderr output.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

/// Parses a level name, ignoring case.
impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// How to start the debugger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebuggerConfig {
    /// Debugger executable.
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments; must select an MI interpreter.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Working directory for the debugger.
    pub cwd: Option<PathBuf>,
    /// Seconds to wait after `-gdb-exit` before killing (1 to 300).
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_program() -> String {
    "gdb".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "--interpreter=mi3".to_string(),
        "--quiet".to_string(),
        "--nx".to_string(),
    ]
}

fn default_shutdown_timeout() -> u64 {
    5
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            cwd: None,
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

/// Session tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Buffered out-of-band events per subscriber (1 to 65536).
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}

/// Output settings.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Logging configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log verbosity level.
    #[serde(default)]
    pub level: LogLevel,
    /// Log file; defaults to the platform data directory.
    pub file: Option<PathBuf>,
}

/// Top-level configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debugger: DebuggerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub log: LogConfig,
}
