//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment overlay (loader.rs, GRAFANA_* / POSTGRES_*)
//!     → validation.rs (semantic checks)
//!     → ProvisionConfig (validated, immutable)
//!     → borrowed by each provisioning component at construction
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; nothing reads the environment mid-run
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Credentials are wrapped in `Secret` so they never reach logs

pub mod loader;
pub mod schema;
pub mod secret;
pub mod validation;

pub use loader::{load_config, load_config_with, ConfigError};
pub use schema::{
    DashboardConfig, DatasourceConfig, GrafanaConfig, ObservabilityConfig, ProvisionConfig,
    RetryConfig, ServiceAccountConfig, TimeoutConfig,
};
pub use secret::Secret;
