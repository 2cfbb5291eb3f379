//! Default locations.
use std::path::PathBuf;

const APP_DIR: &str = "gdbmi";

/// Directory name searched for per-project config.
pub const PROJECT_DIR: &str = ".gdbmi";

/// Global config directory, e.g. `~/.config/gdbmi`.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Default log file, e.g. `~/.local/share/gdbmi/gdbmi.log`.
pub fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("gdbmi.log")
}
