use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;
use crate::merge::merge_layer;
use crate::paths::PROJECT_DIR;
use crate::validate::validate;

/// Content written into a newly-created global config file.
const DEFAULT_CONFIG_CONTENT: &str = r#"# gdbmi configuration
# Uncomment and edit settings below to override defaults.

# [debugger]
# program = "gdb"
# args = ["--interpreter=mi3", "--quiet", "--nx"]
# cwd = "/path/to/project"
# shutdown_timeout_secs = 5

# [session]
# event_capacity = 256

# [output]
# format = "text"

# [log]
# level = "info"
# file = "/path/to/gdbmi.log"
"#;

/// Load, merge and validate configuration.
///
/// Layers, lowest first: built-in defaults, `config_dir/config.toml`
/// (created with commented defaults when missing), then the nearest
/// `.gdbmi/config.toml` at or above `project_dir`.
pub fn load_config(config_dir: &Path, project_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let global_path = config_dir.join("config.toml");
    if !global_path.exists() {
        fs::create_dir_all(config_dir)?;
        fs::write(&global_path, DEFAULT_CONFIG_CONTENT)
            .map_err(|e| ConfigError::CreateDefault(e.to_string()))?;
        tracing::info!(path = %global_path.display(), "created default config");
    }

    let mut config = merge_layer(&Config::default(), &fs::read_to_string(&global_path)?)?;

    if let Some(project_path) = project_dir.and_then(find_project_config) {
        tracing::debug!(path = %project_path.display(), "applying project config");
        config = merge_layer(&config, &fs::read_to_string(&project_path)?)?;
    }

    validated(config)
}

/// Parse a TOML string directly into a validated [`Config`].
pub fn load_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validated(config)
}

/// Validate a config assembled in code, e.g. after command-line overrides.
///
/// Reports the first violation; the rest are logged.
pub fn validated(config: Config) -> Result<Config, ConfigError> {
    match validate(&config) {
        Ok(()) => Ok(config),
        Err(errors) => {
            let mut errors = errors.into_iter();
            let first = errors.next().unwrap_or_else(|| {
                ConfigError::Validation {
                    field: "unknown".to_string(),
                    message: "validation failed".to_string(),
                }
            });
            for extra in errors {
                tracing::warn!(error = %extra, "additional config violation");
            }
            Err(first)
        }
    }
}

/// Walk from `start` upward looking for `.gdbmi/config.toml`.
fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_DIR).join("config.toml"))
        .find(|candidate| candidate.is_file())
}
