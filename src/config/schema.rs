//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a
//! provisioning run. All types derive Serde traits for deserialization from
//! config files; the environment overlay in `loader.rs` writes into the same
//! structs.

use serde::{Deserialize, Serialize};

use crate::config::secret::Secret;

/// Root configuration for a provisioning run.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Management API location and admin credentials.
    pub grafana: GrafanaConfig,

    /// Service identity and token naming.
    pub service_account: ServiceAccountConfig,

    /// Desired datasource connection.
    pub datasource: DatasourceConfig,

    /// Dashboard template and install options.
    pub dashboard: DashboardConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Management API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GrafanaConfig {
    /// Base URL of the management API (e.g., "http://localhost:3000").
    pub url: String,

    /// Admin user for identity-management calls (basic auth).
    pub admin_user: String,

    /// Admin password for identity-management calls.
    pub admin_password: Secret,
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            admin_user: "admin".to_string(),
            admin_password: Secret::default(),
        }
    }
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceAccountConfig {
    /// Unique name the identity is looked up by.
    pub name: String,

    /// Base name for minted tokens.
    pub token_name: String,

    /// Append a timestamp and random suffix to each minted token name.
    pub unique_token_names: bool,

    /// Role assigned when the identity has to be created (e.g., "Admin").
    pub role: Option<String>,

    /// Lifetime of minted tokens in seconds. `None` means no expiry.
    pub token_seconds_to_live: Option<u64>,
}

impl Default for ServiceAccountConfig {
    fn default() -> Self {
        Self {
            name: "fitness-assistant-service".to_string(),
            token_name: "fitness-token".to_string(),
            unique_token_names: true,
            role: None,
            token_seconds_to_live: None,
        }
    }
}

/// Desired datasource connection to the application database.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasourceConfig {
    /// Unique datasource name.
    pub name: String,

    /// Datasource plugin type (e.g., "postgres").
    pub kind: String,

    /// Database host.
    pub host: String,

    /// Database port.
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Database user.
    pub user: String,

    /// Database password. Sent only in the write-only secure field.
    pub password: Secret,

    /// TLS mode (disable, require, verify-ca, verify-full).
    pub ssl_mode: String,

    /// Server version hint (e.g., 1300 for PostgreSQL 13).
    pub postgres_version: u32,

    /// Access mode ("proxy" routes queries through the server).
    pub access: String,

    /// Mark as the default datasource.
    pub is_default: bool,
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            name: "PostgreSQL".to_string(),
            kind: "postgres".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            user: String::new(),
            password: Secret::default(),
            ssl_mode: "disable".to_string(),
            postgres_version: 1300,
            access: "proxy".to_string(),
            is_default: true,
        }
    }
}

/// Dashboard install configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Path to the dashboard template document (JSON).
    pub template_path: String,

    /// Version message attached to the install.
    pub message: String,

    /// Target folder uid. `None` installs into the general folder.
    pub folder_uid: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            template_path: "dashboards/fitness-assistant.json".to_string(),
            message: "Updated by dashboard-provisioner".to_string(),
            folder_uid: None,
        }
    }
}

/// Timeout configuration for management API calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Per-call deadline (request sent to body read) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries of idempotent calls on transient failures.
    pub enabled: bool,

    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
