//! Provisioning subsystem.
//!
//! # Data Flow
//! ```text
//! ProvisionConfig
//!     → orchestrator.rs (Start → IdentityResolved → DatasourceResolved → Installed → Done)
//!         → credentials.rs  (admin basic auth → service account → fresh token)
//!         → datasource.rs   (bearer token → upsert by name → datasource uid)
//!         → dashboard.rs    (bearer token + uid → rewritten template → overwrite install)
//! ```
//!
//! # Design Decisions
//! - Stateless between runs; the management API owns all state
//! - `upsert.rs` holds the single get-or-create-by-name primitive shared by
//!   the service account and the datasource
//! - Every failure is terminal for the run and names the step that failed
//! - Concurrent runs are not safe: both may see "missing" and create twice

pub mod credentials;
pub mod dashboard;
pub mod datasource;
pub mod orchestrator;
pub mod types;
pub mod upsert;

pub use credentials::CredentialResolver;
pub use dashboard::DashboardInstaller;
pub use datasource::DatasourceReconciler;
pub use orchestrator::{ProvisionReport, ProvisionState, Provisioner};
pub use types::{
    AccessToken, DashboardRef, DatasourceRef, DatasourceSpec, ProvisionError, ProvisionResult,
    ResourceId, ResourceKind, ServiceIdentity, Step,
};
