//! Get-or-create-by-name.
//!
//! Both the service identity and the datasource are keyed by a unique name:
//! look the name up, then either act on the existing object or create a new
//! one. [`NamedResource`] captures the three remote calls; [`upsert_by_name`]
//! owns the branching so each resource only describes its endpoints.
//!
//! Two concurrent runs can both observe "missing" and both create. Runs are
//! expected to be serialized by the caller.

use crate::provision::types::{ProvisionResult, ResourceKind};

/// A remote object addressed by a unique name.
#[allow(async_fn_in_trait)]
pub trait NamedResource {
    /// What the lookup yields when the object exists.
    type Existing;
    /// What the caller gets back either way.
    type Resolved;

    fn kind(&self) -> ResourceKind;

    fn name(&self) -> &str;

    /// `Ok(None)` means the object does not exist; errors abort the upsert.
    async fn find(&self) -> ProvisionResult<Option<Self::Existing>>;

    /// Called with the existing object (reuse it, or overwrite it).
    async fn reconcile_existing(&self, existing: Self::Existing) -> ProvisionResult<Self::Resolved>;

    async fn create(&self) -> ProvisionResult<Self::Resolved>;
}

/// Which branch an upsert took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upserted<T> {
    Existing(T),
    Created(T),
}

impl<T> Upserted<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Upserted::Existing(value) | Upserted::Created(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Upserted::Existing(value) | Upserted::Created(value) => value,
        }
    }
}

pub async fn upsert_by_name<R: NamedResource>(resource: &R) -> ProvisionResult<Upserted<R::Resolved>> {
    match resource.find().await? {
        Some(existing) => {
            tracing::info!(kind = %resource.kind(), name = resource.name(), "Found existing");
            resource.reconcile_existing(existing).await.map(Upserted::Existing)
        }
        None => {
            tracing::info!(kind = %resource.kind(), name = resource.name(), "Not found, creating");
            resource.create().await.map(Upserted::Created)
        }
    }
}
