pub mod config;
pub mod error;
pub mod load;
pub mod logging;
pub mod merge;
pub mod paths;
pub mod validate;

pub use config::{Config, DebuggerConfig, LogConfig, LogLevel, OutputConfig, OutputFormat, SessionConfig};
pub use error::ConfigError;
pub use load::{load_config, load_from_str, validated};
