//! Datasource reconciliation.
//!
//! # Responsibilities
//! - Look the datasource up by name
//! - Overwrite it (PUT by id) when it exists, create it (POST) when not
//! - Return the stable `uid` dashboards must reference
//!
//! # Security Constraints
//! - The database password travels only in `secureJsonData`, which the
//!   server never echoes back
//! - The payload is logged as a summary, never in full

use reqwest::StatusCode;

use crate::api::types::{DatasourceEnvelope, DatasourcePayload, ExistingDatasource, SecureJsonData};
use crate::api::{ApiResponse, Credentials, ManagementClient};
use crate::provision::types::{
    AccessToken, DatasourceRef, DatasourceSpec, ProvisionError, ProvisionResult, ResourceKind,
};
use crate::provision::upsert::{upsert_by_name, NamedResource};

/// Ensures the datasource matches its spec.
pub struct DatasourceReconciler<'a> {
    api: &'a ManagementClient,
}

impl<'a> DatasourceReconciler<'a> {
    pub fn new(api: &'a ManagementClient) -> Self {
        Self { api }
    }

    pub async fn reconcile_datasource(
        &self,
        token: &AccessToken,
        spec: &DatasourceSpec,
    ) -> ProvisionResult<DatasourceRef> {
        let auth = Credentials::bearer(token);
        tracing::info!(
            name = %spec.name,
            kind = %spec.kind,
            url = %spec.url,
            database = %spec.database,
            user = %spec.user,
            is_default = spec.is_default,
            "Reconciling datasource"
        );

        let resource = DatasourceResource {
            api: self.api,
            auth: &auth,
            spec,
        };
        let resolved = upsert_by_name(&resource).await?;
        let action = if resolved.was_created() { "created" } else { "updated" };
        let reference = resolved.into_inner();

        tracing::info!(name = %spec.name, uid = %reference.uid, action, "Datasource reconciled");
        Ok(reference)
    }
}

struct DatasourceResource<'a> {
    api: &'a ManagementClient,
    auth: &'a Credentials,
    spec: &'a DatasourceSpec,
}

impl DatasourceResource<'_> {
    fn payload(&self) -> DatasourcePayload<'_> {
        DatasourcePayload {
            name: &self.spec.name,
            kind: &self.spec.kind,
            url: &self.spec.url,
            access: &self.spec.access,
            user: &self.spec.user,
            database: &self.spec.database,
            basic_auth: false,
            is_default: self.spec.is_default,
            json_data: &self.spec.json_data,
            secure_json_data: SecureJsonData {
                password: self.spec.password.expose(),
            },
        }
    }

    fn resolve(&self, response: ApiResponse, operation: &str) -> ProvisionResult<DatasourceRef> {
        if !response.is_success() {
            return Err(ProvisionError::rejected(response.status, &response.body, |status, detail| {
                ProvisionError::ReconcileFailure {
                    kind: ResourceKind::Datasource,
                    name: self.spec.name.clone(),
                    status,
                    detail,
                }
            }));
        }

        let envelope: DatasourceEnvelope = response.decode(operation)?;
        Ok(envelope.into_ref())
    }
}

impl NamedResource for DatasourceResource<'_> {
    type Existing = ExistingDatasource;
    type Resolved = DatasourceRef;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Datasource
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn find(&self) -> ProvisionResult<Option<ExistingDatasource>> {
        let response = self
            .api
            .get(&["api", "datasources", "name", &self.spec.name], self.auth, "get datasource by name")
            .await?;

        match response.status {
            StatusCode::OK => response.decode("get datasource by name").map(Some),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(ProvisionError::rejected(response.status, &response.body, |status, detail| {
                ProvisionError::LookupFailure { kind: ResourceKind::Datasource, status, detail }
            })),
        }
    }

    async fn reconcile_existing(&self, existing: ExistingDatasource) -> ProvisionResult<DatasourceRef> {
        let id = existing.id.to_string();
        tracing::info!(id = %existing.id, name = %existing.name, "Updating existing datasource");

        let response = self
            .api
            .put(&["api", "datasources", &id], self.auth, &self.payload(), "update datasource")
            .await?;
        let mut reference = self.resolve(response, "update datasource")?;
        if reference.id.is_none() {
            reference.id = Some(existing.id);
        }
        Ok(reference)
    }

    async fn create(&self) -> ProvisionResult<DatasourceRef> {
        let response = self
            .api
            .post(&["api", "datasources"], self.auth, &self.payload(), "create datasource")
            .await?;
        self.resolve(response, "create datasource")
    }
}
