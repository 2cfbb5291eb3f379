use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the default config file.
    #[error("failed to create default config: {0}")]
    CreateDefault(String),

    /// TOML parsing failed.
    #[error("TOML parse error: {0}")]
    Parse(String),

    /// A config value failed validation.
    #[error("validation error: {field}: {message}")]
    Validation {
        /// The dotted field path (e.g. `debugger.program`).
        field: String,
        /// Human-readable description of the violation.
        message: String,
    },

    /// An I/O error occurred while reading or writing config files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
