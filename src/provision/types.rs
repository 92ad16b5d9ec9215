//! Provisioning data model and error definitions.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{DatasourceConfig, Secret};

/// Longest remote response body carried into an error message.
const MAX_DETAIL_CHARS: usize = 512;

/// Opaque identifier assigned by the management API.
///
/// Remote ids arrive as JSON numbers on some endpoints and strings on
/// others; both are accepted and rendered verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Numeric(i64),
    Text(String),
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceId::Numeric(id) => write!(f, "{}", id),
            ResourceId::Text(id) => f.write_str(id),
        }
    }
}

/// Remote object kinds the provisioner manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ServiceAccount,
    Datasource,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceKind::ServiceAccount => "service account",
            ResourceKind::Datasource => "datasource",
        })
    }
}

/// Orchestrator steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Credentials,
    Datasource,
    Dashboard,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Step::Credentials => "credentials",
            Step::Datasource => "datasource",
            Step::Dashboard => "dashboard",
        })
    }
}

/// A named non-human principal, looked up by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub name: String,
    pub id: ResourceId,
}

/// A minted bearer token. The secret is only ever returned at creation.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub name: String,
    pub secret: Secret,
}

/// Desired datasource configuration, fully specified by config.
#[derive(Debug, Clone)]
pub struct DatasourceSpec {
    pub name: String,
    pub kind: String,
    pub url: String,
    pub access: String,
    pub user: String,
    pub database: String,
    pub password: Secret,
    pub is_default: bool,
    pub json_data: Map<String, Value>,
}

impl DatasourceSpec {
    pub fn from_config(config: &DatasourceConfig) -> Self {
        let mut json_data = Map::new();
        json_data.insert("sslmode".to_string(), json!(config.ssl_mode));
        json_data.insert("postgresVersion".to_string(), json!(config.postgres_version));
        json_data.insert("database".to_string(), json!(config.database));

        Self {
            name: config.name.clone(),
            kind: config.kind.clone(),
            url: format!("{}:{}", config.host, config.port),
            access: config.access.clone(),
            user: config.user.clone(),
            database: config.database.clone(),
            password: config.password.clone(),
            is_default: config.is_default,
            json_data,
        }
    }
}

/// Resolved datasource. Dashboards must reference `uid`, not `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasourceRef {
    pub id: Option<ResourceId>,
    pub uid: String,
}

/// Installed dashboard as reported by the management API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRef {
    pub uid: String,
    pub id: Option<ResourceId>,
    pub url: Option<String>,
}

/// Errors that can occur during a provisioning run.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Admin or bearer credentials were rejected.
    #[error("Authentication rejected ({status}): {detail}")]
    AuthFailure { status: u16, detail: String },

    /// Existing remote objects could not be enumerated.
    #[error("Failed to look up {kind} ({status}): {detail}")]
    LookupFailure { kind: ResourceKind, status: u16, detail: String },

    /// Token creation failed after the identity was established.
    #[error("Failed to mint token ({status}): {detail}")]
    TokenMintFailure { status: u16, detail: String },

    /// A create or update call was rejected.
    #[error("Failed to reconcile {kind} '{name}' ({status}): {detail}")]
    ReconcileFailure { kind: ResourceKind, name: String, status: u16, detail: String },

    /// The dashboard template file does not exist.
    #[error("Dashboard template not found: {}", .path.display())]
    TemplateNotFound { path: PathBuf },

    /// The dashboard template could not be read or parsed.
    #[error("Dashboard template {} is invalid: {source}", .path.display())]
    TemplateInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The dashboard install call was rejected.
    #[error("Failed to install dashboard ({status}): {detail}")]
    InstallFailure { status: u16, detail: String },

    /// A success response did not have the expected shape.
    #[error("Unexpected response from {operation}: {detail}")]
    UnexpectedResponse { operation: String, detail: String },

    /// The request could not be delivered or the response not read.
    #[error("Request to {operation} failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The per-call deadline elapsed.
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },

    /// Client construction or endpoint building failed.
    #[error("Client error: {0}")]
    Client(String),
}

impl ProvisionError {
    /// Map a rejected response: 401/403 always mean bad credentials,
    /// anything else is classified by `otherwise`.
    pub fn rejected<F>(status: StatusCode, body: &str, otherwise: F) -> Self
    where
        F: FnOnce(u16, String) -> ProvisionError,
    {
        let detail = truncate_detail(body);
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            ProvisionError::AuthFailure { status: status.as_u16(), detail }
        } else {
            otherwise(status.as_u16(), detail)
        }
    }
}

fn truncate_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_DETAIL_CHARS {
        let mut detail: String = trimmed.chars().take(MAX_DETAIL_CHARS).collect();
        detail.push('…');
        detail
    } else {
        trimmed.to_string()
    }
}

/// Result type for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;
