//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the management API URL is usable as a base
//! - Check required credentials and names are present
//! - Validate value ranges (timeouts > 0, port valid, known TLS modes)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProvisionConfig → Result<(), Vec<ValidationError>>
//! - Runs before any network call is made

use crate::config::schema::ProvisionConfig;

/// TLS modes understood by the postgres datasource plugin.
pub const SSL_MODES: &[&str] = &["disable", "require", "verify-ca", "verify-full"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ProvisionConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.grafana.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "grafana.url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("grafana.url", e.to_string())),
    }

    let required = [
        ("grafana.admin_user", config.grafana.admin_user.as_str()),
        ("grafana.admin_password", config.grafana.admin_password.expose()),
        ("service_account.name", config.service_account.name.as_str()),
        ("service_account.token_name", config.service_account.token_name.as_str()),
        ("datasource.name", config.datasource.name.as_str()),
        ("datasource.kind", config.datasource.kind.as_str()),
        ("datasource.host", config.datasource.host.as_str()),
        ("datasource.database", config.datasource.database.as_str()),
        ("datasource.user", config.datasource.user.as_str()),
        ("dashboard.template_path", config.dashboard.template_path.as_str()),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    if config.datasource.port == 0 {
        errors.push(ValidationError::new("datasource.port", "must be non-zero"));
    }

    if !SSL_MODES.contains(&config.datasource.ssl_mode.as_str()) {
        errors.push(ValidationError::new(
            "datasource.ssl_mode",
            format!(
                "'{}' is not one of {}",
                config.datasource.ssl_mode,
                SSL_MODES.join(", ")
            ),
        ));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.retries.enabled && config.retries.max_attempts == 0 {
        errors.push(ValidationError::new(
            "retries.max_attempts",
            "must be at least 1 when retries are enabled",
        ));
    }

    if config.service_account.token_seconds_to_live == Some(0) {
        errors.push(ValidationError::new(
            "service_account.token_seconds_to_live",
            "must be greater than 0 when set",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
