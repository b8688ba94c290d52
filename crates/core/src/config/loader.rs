use std::path::Path;

use figment::providers::{Env, Format, Toml};
use figment::Figment;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "QUESTLOG_";

/// Read `path` and layer `QUESTLOG_*` environment variables on top.
///
/// Nested keys are separated by a double underscore, e.g.
/// `QUESTLOG_PROVIDER__CLIENT_SECRET` overrides `provider.client_secret`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse a TOML document without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
