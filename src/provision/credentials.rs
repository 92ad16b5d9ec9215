//! Credential resolution.
//!
//! # Responsibilities
//! - Find the service identity by name, creating it when absent
//! - Mint a fresh bearer token scoped to that identity
//!
//! # Design Decisions
//! - First name match in listing order wins; duplicates are not flagged
//! - A token is minted on every run. The secret is only returned at
//!   creation, so an earlier token can never be reused. Old tokens are not
//!   revoked and accumulate on the server
//! - All calls here use admin basic auth

use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::types::{CreateServiceAccount, CreateToken, CreatedToken, ServiceAccount, ServiceAccountListing};
use crate::api::{Credentials, ManagementClient};
use crate::config::ServiceAccountConfig;
use crate::provision::types::{
    AccessToken, ProvisionError, ProvisionResult, ResourceKind, ServiceIdentity,
};
use crate::provision::upsert::{upsert_by_name, NamedResource};

/// Resolves the service identity and mints its token.
pub struct CredentialResolver<'a> {
    api: &'a ManagementClient,
    config: &'a ServiceAccountConfig,
    admin: Credentials,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(api: &'a ManagementClient, config: &'a ServiceAccountConfig, admin: Credentials) -> Self {
        Self { api, config, admin }
    }

    /// Look up (or create) the identity named `desired_name` and mint a
    /// token for it.
    pub async fn resolve_identity_and_token(&self, desired_name: &str) -> ProvisionResult<AccessToken> {
        let identity = self.resolve_identity(desired_name).await?;
        self.mint_token(&identity).await
    }

    /// Identity half of [`Self::resolve_identity_and_token`].
    pub async fn resolve_identity(&self, desired_name: &str) -> ProvisionResult<ServiceIdentity> {
        let resource = ServiceAccountResource {
            api: self.api,
            admin: &self.admin,
            name: desired_name,
            role: self.config.role.as_deref(),
        };
        let identity = upsert_by_name(&resource).await?;
        if identity.was_created() {
            tracing::info!(id = %identity.get().id, name = desired_name, "Created service account");
        } else {
            tracing::info!(id = %identity.get().id, name = desired_name, "Reusing existing service account");
        }
        Ok(identity.into_inner())
    }

    /// Mint a new token for `identity`. Always creates; never reuses.
    pub async fn mint_token(&self, identity: &ServiceIdentity) -> ProvisionResult<AccessToken> {
        let name = self.token_name();
        let id = identity.id.to_string();
        let request = CreateToken {
            name: &name,
            seconds_to_live: self.config.token_seconds_to_live,
        };

        let response = self
            .api
            .post(&["api", "serviceaccounts", &id, "tokens"], &self.admin, &request, "create service account token")
            .await?;
        if !response.is_success() {
            return Err(ProvisionError::rejected(response.status, &response.body, |status, detail| {
                ProvisionError::TokenMintFailure { status, detail }
            }));
        }

        let created: CreatedToken = response.decode("create service account token")?;
        tracing::info!(
            token_name = %created.name,
            token_id = %created.id.as_ref().map(ToString::to_string).unwrap_or_default(),
            service_account_id = %identity.id,
            "Minted service account token"
        );
        tracing::warn!(
            service_account = %identity.name,
            "Earlier tokens for this service account are not revoked; prune them periodically"
        );

        Ok(AccessToken {
            name: created.name,
            secret: created.key,
        })
    }

    fn token_name(&self) -> String {
        if self.config.unique_token_names {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            let nonce: u32 = rand::thread_rng().gen_range(0..0x100_0000);
            format!("{}-{}-{:06x}", self.config.token_name, now, nonce)
        } else {
            self.config.token_name.clone()
        }
    }
}

struct ServiceAccountResource<'a> {
    api: &'a ManagementClient,
    admin: &'a Credentials,
    name: &'a str,
    role: Option<&'a str>,
}

impl NamedResource for ServiceAccountResource<'_> {
    type Existing = ServiceIdentity;
    type Resolved = ServiceIdentity;

    fn kind(&self) -> ResourceKind {
        ResourceKind::ServiceAccount
    }

    fn name(&self) -> &str {
        self.name
    }

    async fn find(&self) -> ProvisionResult<Option<ServiceIdentity>> {
        let response = self
            .api
            .get(&["api", "serviceaccounts"], self.admin, "list service accounts")
            .await?;
        if !response.is_success() {
            return Err(ProvisionError::rejected(response.status, &response.body, |status, detail| {
                ProvisionError::LookupFailure { kind: ResourceKind::ServiceAccount, status, detail }
            }));
        }

        let listing: ServiceAccountListing = response.decode("list service accounts")?;
        Ok(first_named(listing.into_accounts(), self.name))
    }

    async fn reconcile_existing(&self, existing: ServiceIdentity) -> ProvisionResult<ServiceIdentity> {
        Ok(existing)
    }

    async fn create(&self) -> ProvisionResult<ServiceIdentity> {
        let request = CreateServiceAccount {
            name: self.name,
            role: self.role,
        };
        let response = self
            .api
            .post(&["api", "serviceaccounts"], self.admin, &request, "create service account")
            .await?;
        if !response.is_success() {
            return Err(ProvisionError::rejected(response.status, &response.body, |status, detail| {
                ProvisionError::ReconcileFailure {
                    kind: ResourceKind::ServiceAccount,
                    name: self.name.to_string(),
                    status,
                    detail,
                }
            }));
        }

        let created: ServiceAccount = response.decode("create service account")?;
        Ok(ServiceIdentity {
            name: created.name,
            id: created.id,
        })
    }
}

/// First account in listing order whose name matches exactly.
fn first_named(accounts: Vec<ServiceAccount>, name: &str) -> Option<ServiceIdentity> {
    accounts
        .into_iter()
        .find(|account| account.name == name)
        .map(|account| ServiceIdentity {
            name: account.name,
            id: account.id,
        })
}
