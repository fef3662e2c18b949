//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::{Environment, ProxyConfig};
use crate::config::validation::ValidationError;

/// Environment variable carrying the proxy's external host.
pub const HOST_VAR: &str = "HOST";
/// Environment variable selecting production or development.
pub const ENV_VAR: &str = "ENV";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read a TOML config file, or start from defaults when no path is given.
pub fn read_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(ProxyConfig::default());
    };

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Apply `HOST` and `ENV` on top of file values.
///
/// `lookup` abstracts `std::env::var` so overrides can be exercised without
/// touching the process environment.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(HOST_VAR) {
        config.proxy.host = host.trim().to_string();
    }
    if let Some(env) = lookup(ENV_VAR) {
        config.proxy.environment = Environment::from_env_value(&env);
    }
}
