//! Dashboard installation.
//!
//! # Data Flow
//! ```text
//! template file (JSON)
//!     → load_template (TemplateNotFound / TemplateInvalid, no network yet)
//!     → rewrite_datasource_refs (panel.datasource.uid or targets[].datasource.uid)
//!     → strip_remote_identity (drop id, uid, version)
//!     → POST /api/dashboards/db with overwrite = true
//! ```
//!
//! The document is otherwise opaque: only the fields named above are touched.

use reqwest::StatusCode;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;

use crate::api::types::{DashboardInstallRequest, DashboardInstallResponse};
use crate::api::{Credentials, ManagementClient};
use crate::config::DashboardConfig;
use crate::provision::types::{AccessToken, DashboardRef, ProvisionError, ProvisionResult};

/// Server-assigned fields that would pin the install to a stale object.
pub const REMOTE_IDENTITY_FIELDS: [&str; 3] = ["id", "uid", "version"];

pub struct DashboardInstaller<'a> {
    api: &'a ManagementClient,
    config: &'a DashboardConfig,
}

impl<'a> DashboardInstaller<'a> {
    pub fn new(api: &'a ManagementClient, config: &'a DashboardConfig) -> Self {
        Self { api, config }
    }

    pub async fn install_dashboard(
        &self,
        token: &AccessToken,
        template_path: &Path,
        datasource_uid: &str,
    ) -> ProvisionResult<DashboardRef> {
        let mut document = load_template(template_path)?;
        tracing::info!(path = %template_path.display(), "Dashboard template loaded");

        let prepared = prepare_document(&mut document, datasource_uid);
        let request = DashboardInstallRequest {
            dashboard: prepared,
            overwrite: true,
            message: &self.config.message,
            folder_uid: self.config.folder_uid.as_deref(),
        };

        let response = self
            .api
            .post(&["api", "dashboards", "db"], &Credentials::bearer(token), &request, "install dashboard")
            .await?;
        if response.status != StatusCode::OK {
            return Err(ProvisionError::rejected(response.status, &response.body, |status, detail| {
                ProvisionError::InstallFailure { status, detail }
            }));
        }

        let installed: DashboardInstallResponse = response.decode("install dashboard")?;
        tracing::info!(
            uid = %installed.uid,
            url = installed.url.as_deref().unwrap_or(""),
            version = installed.version,
            status = installed.status.as_deref().unwrap_or(""),
            "Dashboard installed"
        );
        Ok(installed.into())
    }
}

/// Rewrite datasource references and drop remote identity fields in place.
///
/// Returns the document for chaining.
pub fn prepare_document<'d>(document: &'d mut Value, datasource_uid: &str) -> &'d Value {
    let rewritten = rewrite_datasource_refs(document, datasource_uid);
    tracing::info!(rewritten, "Updated datasource uid on panels/targets");
    strip_remote_identity(document);
    document
}

/// Read and parse a dashboard template.
pub fn load_template(path: &Path) -> ProvisionResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ProvisionError::TemplateNotFound { path: path.to_path_buf() },
        _ => ProvisionError::TemplateInvalid {
            path: path.to_path_buf(),
            source: serde_json::Error::io(e),
        },
    })?;

    serde_json::from_str(&content).map_err(|source| ProvisionError::TemplateInvalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Point every panel at `datasource_uid`.
///
/// A panel with a `datasource` object has that object's `uid` replaced and
/// its targets are left alone. Otherwise each target with a `datasource`
/// object is rewritten. Panels with neither shape are skipped. Returns the
/// number of references rewritten.
pub fn rewrite_datasource_refs(document: &mut Value, datasource_uid: &str) -> usize {
    let Some(panels) = document.get_mut("panels").and_then(Value::as_array_mut) else {
        return 0;
    };

    let mut rewritten = 0;
    for panel in panels.iter_mut() {
        if let Some(datasource) = panel.get_mut("datasource").and_then(Value::as_object_mut) {
            datasource.insert("uid".to_string(), Value::String(datasource_uid.to_string()));
            rewritten += 1;
        } else if let Some(targets) = panel.get_mut("targets").and_then(Value::as_array_mut) {
            for target in targets.iter_mut() {
                if let Some(datasource) = target.get_mut("datasource").and_then(Value::as_object_mut) {
                    datasource.insert("uid".to_string(), Value::String(datasource_uid.to_string()));
                    rewritten += 1;
                }
            }
        }
    }
    rewritten
}

/// Remove the top-level `id`, `uid` and `version` fields.
pub fn strip_remote_identity(document: &mut Value) {
    if let Some(object) = document.as_object_mut() {
        for field in REMOTE_IDENTITY_FIELDS {
            object.remove(field);
        }
    }
}
