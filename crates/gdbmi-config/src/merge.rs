use crate::config::Config;
use crate::error::ConfigError;

/// Apply a TOML layer on top of `base`.
///
/// Keys present in `layer` win; tables merge key by key, arrays and scalars
/// are replaced whole.
pub fn merge_layer(base: &Config, layer: &str) -> Result<Config, ConfigError> {
    let overlay: toml::Table = layer.parse().map_err(parse_error)?;
    let rendered = toml::to_string(base).map_err(|e| ConfigError::Parse(e.to_string()))?;
    let mut merged: toml::Table = rendered.parse().map_err(parse_error)?;
    merge_tables(&mut merged, overlay);
    toml::Value::Table(merged).try_into().map_err(parse_error)
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(layer) => {
                if let Some(toml::Value::Table(inner)) = base.get_mut(&key) {
                    merge_tables(inner, layer);
                    continue;
                }
                base.insert(key, toml::Value::Table(layer));
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

fn parse_error(err: toml::de::Error) -> ConfigError {
    ConfigError::Parse(err.to_string())
}
