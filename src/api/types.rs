//! Management API wire types.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Secret;
use crate::provision::types::{DashboardRef, DatasourceRef, ResourceId};

/// A service account as listed or created.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub login: Option<String>,
}

/// Service account listing: a bare array, or the search envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ServiceAccountListing {
    Bare(Vec<ServiceAccount>),
    Search {
        #[serde(rename = "serviceAccounts")]
        service_accounts: Vec<ServiceAccount>,
    },
}

impl ServiceAccountListing {
    /// Accounts in listing order.
    pub fn into_accounts(self) -> Vec<ServiceAccount> {
        match self {
            ServiceAccountListing::Bare(accounts) => accounts,
            ServiceAccountListing::Search { service_accounts } => service_accounts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateServiceAccount<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateToken<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_to_live: Option<u64>,
}

/// Token creation response. `key` is returned only here, never again.
#[derive(Debug, Deserialize)]
pub struct CreatedToken {
    #[serde(default)]
    pub id: Option<ResourceId>,
    pub name: String,
    pub key: Secret,
}

/// Datasource returned by the by-name lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct ExistingDatasource {
    pub id: ResourceId,
    #[serde(default)]
    pub uid: Option<String>,
    pub name: String,
}

/// Create/update payload. Both verbs send the same shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourcePayload<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub url: &'a str,
    pub access: &'a str,
    pub user: &'a str,
    pub database: &'a str,
    pub basic_auth: bool,
    pub is_default: bool,
    pub json_data: &'a Map<String, Value>,
    pub secure_json_data: SecureJsonData<'a>,
}

/// Write-only fields. Never echoed back by the server.
#[derive(Serialize)]
pub struct SecureJsonData<'a> {
    pub password: &'a str,
}

impl std::fmt::Debug for SecureJsonData<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureJsonData").field("password", &"[REDACTED]").finish()
    }
}

/// Create/update response.
///
/// Creates answer `{"datasource": {"uid": ..}, "id": ..}` while some update
/// paths answer with a flat `{"uid": ..}`. The nested shape is tried first; a
/// missing or empty nested uid falls through to the flat shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DatasourceEnvelope {
    Nested {
        datasource: DatasourceBody,
        #[serde(default)]
        id: Option<ResourceId>,
    },
    Flat(DatasourceBody),
}

#[derive(Debug, Deserialize)]
pub struct DatasourceBody {
    #[serde(deserialize_with = "non_empty")]
    pub uid: String,
    #[serde(default)]
    pub id: Option<ResourceId>,
}

impl DatasourceEnvelope {
    pub fn into_ref(self) -> DatasourceRef {
        match self {
            DatasourceEnvelope::Nested { datasource, id } => DatasourceRef {
                id: datasource.id.or(id),
                uid: datasource.uid,
            },
            DatasourceEnvelope::Flat(body) => DatasourceRef {
                id: body.id,
                uid: body.uid,
            },
        }
    }
}

fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = String::deserialize(deserializer)?;
    if value.is_empty() {
        Err(de::Error::custom("empty uid"))
    } else {
        Ok(value)
    }
}

/// Dashboard install request. `overwrite` is always set.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardInstallRequest<'a> {
    pub dashboard: &'a Value,
    pub overwrite: bool,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_uid: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardInstallResponse {
    pub uid: String,
    #[serde(default)]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
}

impl From<DashboardInstallResponse> for DashboardRef {
    fn from(response: DashboardInstallResponse) -> Self {
        DashboardRef {
            uid: response.uid,
            id: response.id,
            url: response.url,
        }
    }
}
