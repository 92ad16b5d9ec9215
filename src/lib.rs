//! Dashboard provisioning library.
//!
//! Converges a dashboard server to a known state: a service account with a
//! fresh token, a datasource pointing at the application database, and a
//! dashboard wired to that datasource. Safe to re-run.

pub mod api;
pub mod config;
pub mod observability;
pub mod provision;
pub mod resilience;

pub use config::ProvisionConfig;
pub use provision::{ProvisionError, ProvisionReport, Provisioner};
