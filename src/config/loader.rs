//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ProvisionConfig;
use crate::config::secret::Secret;
use crate::config::validation::{validate_config, ValidationError};

pub const GRAFANA_URL_ENV: &str = "GRAFANA_URL";
pub const GRAFANA_ADMIN_USER_ENV: &str = "GRAFANA_ADMIN_USER";
pub const GRAFANA_ADMIN_PASSWORD_ENV: &str = "GRAFANA_ADMIN_PASSWORD";
pub const POSTGRES_HOST_ENV: &str = "POSTGRES_HOST";
pub const POSTGRES_PORT_ENV: &str = "POSTGRES_PORT";
pub const POSTGRES_DB_ENV: &str = "POSTGRES_DB";
pub const POSTGRES_USER_ENV: &str = "POSTGRES_USER";
pub const POSTGRES_PASSWORD_ENV: &str = "POSTGRES_PASSWORD";
pub const POSTGRES_SSLMODE_ENV: &str = "POSTGRES_SSLMODE";
pub const DASHBOARD_TEMPLATE_ENV: &str = "DASHBOARD_TEMPLATE";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, reason } => write!(f, "Invalid {}: {}", var, reason),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, overlay the process
/// environment, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<ProvisionConfig, ConfigError> {
    load_config_with(path, |_| {})
}

/// Like [`load_config`], with `adjust` applied after the environment overlay
/// and before validation (command-line overrides).
pub fn load_config_with<A>(path: Option<&Path>, adjust: A) -> Result<ProvisionConfig, ConfigError>
where
    A: FnOnce(&mut ProvisionConfig),
{
    load(path, |key| std::env::var(key).ok(), adjust)
}

fn load<F, A>(path: Option<&Path>, lookup: F, adjust: A) -> Result<ProvisionConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    A: FnOnce(&mut ProvisionConfig),
{
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => ProvisionConfig::default(),
    };

    apply_env(&mut config, lookup)?;
    adjust(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML config file without validating it.
pub fn read_config_file(path: &Path) -> Result<ProvisionConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Overlay environment variables onto `config`.
///
/// Only variables that are set (and non-empty) override file values.
pub fn apply_env<F>(config: &mut ProvisionConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(url) = get(GRAFANA_URL_ENV) {
        config.grafana.url = url;
    }
    if let Some(user) = get(GRAFANA_ADMIN_USER_ENV) {
        config.grafana.admin_user = user;
    }
    if let Some(password) = get(GRAFANA_ADMIN_PASSWORD_ENV) {
        config.grafana.admin_password = Secret::new(password);
    }

    if let Some(host) = get(POSTGRES_HOST_ENV) {
        config.datasource.host = host;
    }
    if let Some(port) = get(POSTGRES_PORT_ENV) {
        config.datasource.port = port.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::Env {
                var: POSTGRES_PORT_ENV,
                reason: format!("'{}' is not a valid port: {}", port, e),
            }
        })?;
    }
    if let Some(database) = get(POSTGRES_DB_ENV) {
        config.datasource.database = database;
    }
    if let Some(user) = get(POSTGRES_USER_ENV) {
        config.datasource.user = user;
    }
    if let Some(password) = get(POSTGRES_PASSWORD_ENV) {
        config.datasource.password = Secret::new(password);
    }
    if let Some(ssl_mode) = get(POSTGRES_SSLMODE_ENV) {
        config.datasource.ssl_mode = ssl_mode;
    }

    if let Some(template) = get(DASHBOARD_TEMPLATE_ENV) {
        config.dashboard.template_path = template;
    }

    Ok(())
}
